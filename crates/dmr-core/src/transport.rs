//! Thin polymorphic interface over a UDP-like datagram socket, so the
//! dispatcher can run against a real `tokio::net::UdpSocket` or an
//! in-memory fake in tests.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::UdpSocket;

#[async_trait]
pub trait DatagramTransport: Send + Sync {
    async fn send_dg(&self, bytes: &[u8], addr: SocketAddr) -> io::Result<()>;
    async fn recv_dg(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
}

pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        Ok(Self { socket: UdpSocket::bind(addr).await? })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[async_trait]
impl DatagramTransport for UdpTransport {
    async fn send_dg(&self, bytes: &[u8], addr: SocketAddr) -> io::Result<()> {
        self.socket.send_to(bytes, addr).await?;
        Ok(())
    }

    async fn recv_dg(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use tokio::sync::Mutex;

    /// In-memory transport: `recv_dg` yields datagrams pushed with
    /// [`FakeTransport::deliver`]; `send_dg` appends to `sent`.
    #[derive(Default)]
    pub struct FakeTransport {
        pub sent: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
        inbound: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn deliver(&self, bytes: Vec<u8>, from: SocketAddr) {
            self.inbound.lock().await.push((bytes, from));
        }
    }

    #[async_trait]
    impl DatagramTransport for FakeTransport {
        async fn send_dg(&self, bytes: &[u8], addr: SocketAddr) -> io::Result<()> {
            self.sent.lock().await.push((bytes.to_vec(), addr));
            Ok(())
        }

        async fn recv_dg(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
            loop {
                if let Some((bytes, from)) = self.inbound.lock().await.pop() {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    return Ok((n, from));
                }
                tokio::task::yield_now().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeTransport;
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[tokio::test]
    async fn udp_transport_round_trips_a_datagram() {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let b = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let b_addr = b.local_addr().unwrap();

        a.send_dg(b"hello", b_addr).await.unwrap();

        let mut buf = [0u8; 16];
        let (n, from) = b.recv_dg(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello");
        assert_eq!(from, a.local_addr().unwrap());
    }

    #[tokio::test]
    async fn fake_transport_delivers_and_records() {
        let fake = FakeTransport::new();
        let from = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 1234);
        fake.deliver(b"RPTL".to_vec(), from).await;

        let mut buf = [0u8; 16];
        let (n, got_from) = fake.recv_dg(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"RPTL");
        assert_eq!(got_from, from);

        fake.send_dg(b"RPTACK", from).await.unwrap();
        assert_eq!(fake.sent.lock().await.len(), 1);
    }
}
