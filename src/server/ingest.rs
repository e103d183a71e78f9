//! UDP ingest workers
//!
//! Each worker owns its own socket bound to the shared ingest address via
//! `SO_REUSEPORT`, so the kernel spreads datagrams across workers. Workers
//! are stateless beyond parsing: a valid fragment is handed straight to the
//! relay store, anything else is dropped.

use std::net::SocketAddr;
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use crate::protocol::FragmentHeader;
use crate::relay::RelayStore;

/// Bind one ingest socket with the shared-port and buffer options applied
pub(crate) fn bind_ingest_socket(
    addr: SocketAddr,
    recv_buffer_size: usize,
) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    if recv_buffer_size > 0 {
        socket.set_recv_buffer_size(recv_buffer_size)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;

    UdpSocket::from_std(socket.into())
}

/// Receive datagrams until the task is aborted
///
/// Malformed datagrams are dropped silently with no state change; the
/// transport offers no delivery guarantees, so losing them is routine.
/// Receive errors are logged and the loop continues.
pub(crate) async fn run_worker(
    worker_id: usize,
    socket: UdpSocket,
    store: Arc<RelayStore>,
    max_packet_size: usize,
) {
    let mut buf = vec![0u8; max_packet_size];

    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, _peer)) => {
                let Some((header, payload)) = FragmentHeader::parse(&buf[..len]) else {
                    tracing::trace!(worker_id, len, "dropped malformed datagram");
                    continue;
                };

                store
                    .ingest(
                        &header.source,
                        header.frame_id,
                        header.fragment_index,
                        header.total_fragments,
                        header.frame_len,
                        payload,
                    )
                    .await;
            }
            Err(e) => {
                tracing::warn!(worker_id, error = %e, "UDP receive error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::relay::SourceId;

    use super::*;

    #[tokio::test]
    async fn test_datagrams_flow_to_subscriber() {
        let store = Arc::new(RelayStore::new());
        let source = SourceId::new("CAM_001");
        let mut rx = store.subscribe(&source).await;

        let socket = bind_ingest_socket("127.0.0.1:0".parse().unwrap(), 0).unwrap();
        let addr = socket.local_addr().unwrap();
        let worker = tokio::spawn(run_worker(0, socket, Arc::clone(&store), 2048));

        let tx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let halves: [(u16, &[u8]); 2] = [(0, b"hello "), (1, b"world")];
        for (index, payload) in halves {
            let header = FragmentHeader {
                frame_id: 42,
                fragment_index: index,
                total_fragments: 2,
                frame_len: 11,
                source: source.clone(),
            };
            tx.send_to(&header.encode(payload), addr).await.unwrap();
        }

        let frame = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("frame not assembled in time")
            .unwrap();
        assert_eq!(frame.frame_id, 42);
        assert_eq!(frame.data.as_ref(), b"hello world");

        worker.abort();
    }

    #[tokio::test]
    async fn test_malformed_datagram_ignored() {
        let store = Arc::new(RelayStore::new());

        let socket = bind_ingest_socket("127.0.0.1:0".parse().unwrap(), 0).unwrap();
        let addr = socket.local_addr().unwrap();
        let worker = tokio::spawn(run_worker(0, socket, Arc::clone(&store), 2048));

        let tx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        tx.send_to(b"short", addr).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.source_count().await, 0);

        worker.abort();
    }

    #[tokio::test]
    async fn test_reuseport_allows_parallel_binds() {
        let first = bind_ingest_socket("127.0.0.1:0".parse().unwrap(), 0).unwrap();
        let addr = first.local_addr().unwrap();

        // A second worker can share the same receive port
        #[cfg(unix)]
        bind_ingest_socket(addr, 0).unwrap();
    }
}
