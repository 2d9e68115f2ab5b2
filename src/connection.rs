// JDWP connection management
//
// Handshake, dispatcher startup, and the per-command timeout

use crate::dispatcher::{spawn_dispatcher, DispatcherHandle};
use crate::events::EventNotice;
use crate::protocol::{CommandPacket, JdwpError, JdwpResult, ReplyPacket};
use crate::transport::{self, DEFAULT_MAX_PACKET_SIZE};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Tunables for a connection. The defaults match what Android VMs tolerate
/// in practice.
#[derive(Debug, Clone)]
pub struct JdwpConfig {
    /// Deadline for each command's reply.
    pub command_timeout: Duration,
    /// Upper bound on a single inbound packet.
    pub max_packet_size: usize,
}

impl Default for JdwpConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(5),
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        }
    }
}

/// An attached JDWP connection: packet ID allocation, request/reply
/// correlation, and event subscription over one byte stream.
#[derive(Debug)]
pub struct JdwpConnection {
    dispatcher: DispatcherHandle,
    next_id: AtomicU32,
    config: JdwpConfig,
}

impl JdwpConnection {
    /// Connect to a VM over TCP. For Android, forward the PID first:
    /// `adb forward tcp:<port> jdwp:<pid>`, then connect to `127.0.0.1:<port>`.
    pub async fn connect(host: &str, port: u16) -> JdwpResult<Self> {
        Self::connect_with(host, port, JdwpConfig::default()).await
    }

    pub async fn connect_with(host: &str, port: u16, config: JdwpConfig) -> JdwpResult<Self> {
        info!("connecting to JDWP at {host}:{port}");
        let stream = TcpStream::connect((host, port)).await?;
        Self::attach(stream, config).await
    }

    /// Attach over any ordered, reliable byte stream (a bridge socket, a
    /// test duplex). Performs the handshake and starts the dispatcher.
    pub async fn attach<S>(mut stream: S, config: JdwpConfig) -> JdwpResult<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let leftover = transport::handshake(&mut stream).await?;

        let (reader, writer) = tokio::io::split(stream);
        let dispatcher = spawn_dispatcher(reader, writer, leftover, config.max_packet_size);

        Ok(Self {
            dispatcher,
            next_id: AtomicU32::new(1),
            config,
        })
    }

    /// Send a command and wait for its reply, bounded by the configured
    /// timeout. A reply arriving after the timeout is logged and dropped by
    /// the dispatcher; the packet ID is never reused either way.
    pub async fn send_command(&self, packet: CommandPacket) -> JdwpResult<ReplyPacket> {
        let packet_id = packet.id;

        match tokio::time::timeout(
            self.config.command_timeout,
            self.dispatcher.send_command(packet),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!("command id={packet_id} timed out");
                Err(JdwpError::Timeout)
            }
        }
    }

    /// Generate the next packet ID. Monotonic from 1, so an ID is never in
    /// flight twice within a session.
    pub fn next_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Receive events for a specific request ID, or everything unclaimed
    /// via [`crate::dispatcher::WILDCARD_SUBSCRIPTION`].
    pub fn subscribe(&self, request_id: i32) -> mpsc::UnboundedReceiver<EventNotice> {
        self.dispatcher.subscribe(request_id)
    }

    pub fn unsubscribe(&self, request_id: i32) {
        self.dispatcher.unsubscribe(request_id)
    }

    pub fn is_connected(&self) -> bool {
        self.dispatcher.is_connected()
    }

    /// Tear the connection down; pending waiters fail with `Disconnected`.
    /// Safe to call more than once.
    pub fn close(&self) {
        self.dispatcher.shutdown();
    }

    pub fn config(&self) -> &JdwpConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_id_is_monotonic() {
        let counter = AtomicU32::new(1);

        assert_eq!(counter.fetch_add(1, Ordering::SeqCst), 1);
        assert_eq!(counter.fetch_add(1, Ordering::SeqCst), 2);
        assert_eq!(counter.fetch_add(1, Ordering::SeqCst), 3);
    }

    #[test]
    fn test_default_config() {
        let config = JdwpConfig::default();
        assert_eq!(config.command_timeout, Duration::from_secs(5));
        assert_eq!(config.max_packet_size, DEFAULT_MAX_PACKET_SIZE);
    }
}
