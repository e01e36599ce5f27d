use std::fmt;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::LumenCodec;
use crate::error::LumenError;
use crate::message::{Message, MessageKind};
use crate::packet::Packet;
use crate::transport::{CHANNEL_CAPACITY, Outbox, Transport, outbox};

/// A framed TCP connection to the peer surface.
///
/// Background reader and writer tasks own the socket; this handle only
/// holds the channel ends, so dropping it shuts both tasks down.
#[derive(Debug)]
pub struct Connection {
    // Channel to send packets to background writer task
    tx: Outbox<Packet>,
    // Channel to receive packets from background reader task
    rx: mpsc::Receiver<Packet>,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        let _ = stream.set_nodelay(true);
        let (mut net_writer, mut net_reader) = Framed::new(stream, LumenCodec).split();

        // User -> Network
        let (user_tx, mut network_rx) = outbox::<Packet>(CHANNEL_CAPACITY);

        // Network -> User
        let (network_tx, user_rx) = mpsc::channel(CHANNEL_CAPACITY);

        // Writer task: User -> Network
        tokio::spawn(async move {
            while let Some(packet) = network_rx.recv().await {
                if let Err(e) = net_writer.send(packet).await {
                    warn!("network write error: {e}");
                    break;
                }
            }
        });

        // Reader task: Network -> User
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Handle dropped: release the socket half so the peer sees EOF.
                    _ = network_tx.closed() => break,
                    next = net_reader.next() => match next {
                        Some(Ok(packet)) => {
                            if network_tx.send(packet).await.is_err() {
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            warn!("network read error: {e}");
                            break; // Stop on codec/network errors
                        }
                        None => break,
                    },
                }
            }
            debug!("reader task finished");
        });

        Self {
            tx: user_tx,
            rx: user_rx,
        }
    }

    pub async fn connect(conn_info: &ConnectionInfo) -> Result<Self, std::io::Error> {
        let stream = TcpStream::connect(conn_info.to_socket_string()).await?;
        Ok(Self::new(stream))
    }

    /// Queue a raw packet without waiting.
    pub fn send_packet(&self, packet: Packet) -> Result<(), LumenError> {
        let kind = packet.kind();
        self.tx.offer(packet, kind == MessageKind::Update, kind.as_str())
    }

    /// Next raw packet from the peer.
    pub async fn recv_packet(&mut self) -> Option<Packet> {
        self.rx.recv().await
    }
}

#[async_trait]
impl Transport for Connection {
    fn send(&self, message: Message) -> Result<(), LumenError> {
        self.send_packet(Packet::from_message(&message)?)
    }

    async fn recv(&mut self) -> Option<Message> {
        loop {
            let packet = self.rx.recv().await?;
            match packet.message() {
                Ok(message) => return Some(message),
                // One bad payload does not poison the stream.
                Err(e) => warn!(kind = %packet.kind(), "dropping undecodable message: {e}"),
            }
        }
    }

    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

// ── ConnectionInfo ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    ip: String,
    port: u16,
}

impl ConnectionInfo {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self { ip: ip.into(), port }
    }

    /// Parse `host:port`.
    pub fn parse(addr: &str) -> Result<Self, LumenError> {
        let (ip, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| LumenError::Other(format!("address '{addr}' has no port")))?;
        let port = port
            .parse()
            .map_err(|_| LumenError::Other(format!("invalid port in '{addr}'")))?;
        Ok(Self::new(ip, port))
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn to_socket_string(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_address() {
        let info = ConnectionInfo::parse("127.0.0.1:7440").unwrap();
        assert_eq!(info.ip(), "127.0.0.1");
        assert_eq!(info.port(), 7440);
        assert_eq!(info.to_string(), "127.0.0.1:7440");
        assert!(ConnectionInfo::parse("localhost").is_err());
        assert!(ConnectionInfo::parse("localhost:http").is_err());
    }
}
