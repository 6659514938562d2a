use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error, info};
use tokio::net::UdpSocket;

use super::connection::ConnectionTable;
use super::handlers::handle_packet;
use super::response::Response;
use super::MAX_PACKET_SIZE;
use crate::tracker::Tracker;

/// The UDP tracker transport: one socket, one task per datagram.
pub struct UdpServer {
    socket: Arc<UdpSocket>,
    tracker: Arc<Tracker>,
    connections: Arc<ConnectionTable>,
}

impl UdpServer {
    /// # Errors
    ///
    /// Will return an `Err` if unable to bind to the supplied `bind_address`.
    pub async fn new(tracker: Arc<Tracker>, bind_address: &str) -> tokio::io::Result<UdpServer> {
        let socket = UdpSocket::bind(bind_address).await?;

        Ok(UdpServer {
            socket: Arc::new(socket),
            tracker,
            connections: Arc::new(ConnectionTable::default()),
        })
    }

    /// # Panics
    ///
    /// Will panic if unable to resolve the `local_addr` of the bound socket.
    pub async fn start(&self) {
        loop {
            let mut data = [0; MAX_PACKET_SIZE];

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Stopping UDP server: {}..", self.socket.local_addr().unwrap());
                    break;
                }
                Ok((valid_bytes, remote_addr)) = self.socket.recv_from(&mut data) => {
                    let payload = data[..valid_bytes].to_vec();

                    debug!("udp: received {} bytes from {}", payload.len(), remote_addr);

                    self.tracker.stats.accept_udp();

                    let socket = self.socket.clone();
                    let tracker = self.tracker.clone();
                    let connections = self.connections.clone();

                    tokio::spawn(async move {
                        let response = handle_packet(remote_addr, &payload, &tracker, &connections).await;
                        UdpServer::send_response(&socket, remote_addr, response).await;
                    });
                }
            }
        }
    }

    async fn send_response(socket: &UdpSocket, remote_addr: SocketAddr, response: Response) {
        let buffer = vec![0u8; MAX_PACKET_SIZE];
        let mut cursor = Cursor::new(buffer);

        match response.write_to_bytes(&mut cursor) {
            Ok(()) => {
                let position = cursor.position() as usize;
                let inner = cursor.get_ref();

                debug!("udp: sending {} bytes to {}", position, remote_addr);

                // Delivery is best effort; the client retries on loss.
                drop(socket.send_to(&inner[..position], remote_addr).await);
            }
            Err(_) => {
                error!("udp: could not write response to bytes");
            }
        }
    }
}
