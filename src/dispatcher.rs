// JDWP dispatcher
//
// One task owns the stream: it serializes outbound command packets, matches
// reply packets to pending waiters by packet ID, and routes Composite event
// records to their subscribers.

use crate::commands::{command_sets, event_set_commands};
use crate::events::{parse_event_packet, EventKind, EventNotice};
use crate::protocol::{CommandPacket, JdwpError, JdwpResult, ReplyPacket, HEADER_SIZE, REPLY_FLAG};
use crate::transport::FrameDecoder;
use bytes::BytesMut;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, error, info, warn};

/// Subscription key that receives every event with no specific subscriber.
pub const WILDCARD_SUBSCRIPTION: i32 = 0;

/// Request to send a command and get the matching reply
pub struct CommandRequest {
    pub packet: CommandPacket,
    pub reply_tx: oneshot::Sender<JdwpResult<ReplyPacket>>,
}

type PendingReplies = HashMap<u32, oneshot::Sender<JdwpResult<ReplyPacket>>>;
type Subscriptions = Arc<Mutex<HashMap<i32, mpsc::UnboundedSender<EventNotice>>>>;

/// Handle to the dispatcher task for sending commands and subscribing to
/// events. Cloneable; all clones share the one writer and pending table.
#[derive(Clone, Debug)]
pub struct DispatcherHandle {
    command_tx: mpsc::Sender<CommandRequest>,
    subscriptions: Subscriptions,
    shutdown: Arc<Notify>,
}

impl DispatcherHandle {
    /// Send a command and wait for its reply. No deadline here; callers
    /// apply their own timeout.
    pub async fn send_command(&self, packet: CommandPacket) -> JdwpResult<ReplyPacket> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(CommandRequest { packet, reply_tx })
            .await
            .map_err(|_| JdwpError::Disconnected)?;

        reply_rx.await.map_err(|_| JdwpError::Disconnected)?
    }

    /// Register for events tagged with `request_id`
    /// ([`WILDCARD_SUBSCRIPTION`] catches everything unclaimed). An event
    /// reaches its specific subscriber or the wildcard, never both.
    pub fn subscribe(&self, request_id: i32) -> mpsc::UnboundedReceiver<EventNotice> {
        let (tx, rx) = mpsc::unbounded_channel();
        let previous = self
            .subscriptions
            .lock()
            .unwrap()
            .insert(request_id, tx);
        if previous.is_some() {
            warn!("replacing existing subscriber for request id {request_id}");
        }
        rx
    }

    pub fn unsubscribe(&self, request_id: i32) {
        self.subscriptions.lock().unwrap().remove(&request_id);
    }

    /// False once the dispatcher task has exited.
    pub fn is_connected(&self) -> bool {
        !self.command_tx.is_closed()
    }

    /// Ask the dispatcher task to exit; pending waiters get `Disconnected`.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

/// Spawn the dispatcher task over a split stream. `leftover` carries any
/// bytes the handshake read past its 14, which belong to the first packet.
pub fn spawn_dispatcher<R, W>(
    reader: R,
    writer: W,
    leftover: Vec<u8>,
    max_packet_size: usize,
) -> DispatcherHandle
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(32);
    let subscriptions: Subscriptions = Arc::new(Mutex::new(HashMap::new()));
    let shutdown = Arc::new(Notify::new());

    let mut decoder = FrameDecoder::new(max_packet_size);
    decoder.extend(&leftover);

    tokio::spawn(dispatcher_task(
        reader,
        writer,
        decoder,
        command_rx,
        Arc::clone(&subscriptions),
        Arc::clone(&shutdown),
    ));

    DispatcherHandle {
        command_tx,
        subscriptions,
        shutdown,
    }
}

enum Routed {
    Continue,
    VmDeath,
}

async fn dispatcher_task<R, W>(
    mut reader: R,
    mut writer: W,
    mut decoder: FrameDecoder,
    mut command_rx: mpsc::Receiver<CommandRequest>,
    subscriptions: Subscriptions,
    shutdown: Arc<Notify>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("dispatcher started");

    let mut pending: PendingReplies = HashMap::new();
    let mut chunk = BytesMut::with_capacity(8 * 1024);

    'outer: loop {
        // Drain every complete packet before the next read; this also picks
        // up bytes the handshake pushed back.
        loop {
            match decoder.next_packet() {
                Ok(Some(packet)) => match handle_packet(&packet, &mut pending, &subscriptions) {
                    Ok(Routed::Continue) => {}
                    Ok(Routed::VmDeath) => {
                        info!("VM death event received, closing session");
                        break 'outer;
                    }
                    Err(e) => {
                        error!("inbound packet rejected: {e}");
                        break 'outer;
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    error!("stream desynchronized: {e}");
                    break 'outer;
                }
            }
        }

        tokio::select! {
            _ = shutdown.notified() => {
                debug!("dispatcher shutdown requested");
                break;
            }

            // Outgoing commands; the single writer lives here, so packets go
            // out in submission order.
            cmd = command_rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!("all dispatcher handles dropped");
                    break;
                };
                let packet_id = cmd.packet.id;
                debug!("sending command id={packet_id}");

                let encoded = cmd.packet.encode();
                let written = async {
                    writer.write_all(&encoded).await?;
                    writer.flush().await
                }
                .await;

                match written {
                    Ok(()) => {
                        pending.insert(packet_id, cmd.reply_tx);
                    }
                    Err(e) => {
                        error!("failed to write command id={packet_id}: {e}");
                        cmd.reply_tx.send(Err(JdwpError::Io(e))).ok();
                        break;
                    }
                }
            }

            // Incoming bytes, in whatever chunks the transport produces
            read = reader.read_buf(&mut chunk) => {
                match read {
                    Ok(0) => {
                        info!("stream closed by VM");
                        break;
                    }
                    Ok(_) => {
                        decoder.extend(&chunk);
                        chunk.clear();
                    }
                    Err(e) => {
                        error!("failed to read stream: {e}");
                        break;
                    }
                }
            }
        }
    }

    // Teardown: every pending waiter learns the session is gone, and
    // dropping the subscription senders ends each receiver's stream.
    for (_, reply_tx) in pending.drain() {
        reply_tx.send(Err(JdwpError::Disconnected)).ok();
    }
    subscriptions.lock().unwrap().clear();

    info!("dispatcher shut down");
}

fn handle_packet(
    packet: &[u8],
    pending: &mut PendingReplies,
    subscriptions: &Subscriptions,
) -> JdwpResult<Routed> {
    // the frame decoder guarantees at least a whole header
    let packet_id = u32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]]);
    let flags = packet[8];

    if flags == REPLY_FLAG {
        let Some(reply_tx) = pending.remove(&packet_id) else {
            warn!("reply for unknown or timed-out command id={packet_id}, dropping");
            return Ok(Routed::Continue);
        };

        return match ReplyPacket::decode(packet) {
            Ok(reply) => {
                debug!("received reply id={packet_id}");
                if reply_tx.send(Ok(reply)).is_err() {
                    debug!("waiter for id={packet_id} gone, dropping reply");
                }
                Ok(Routed::Continue)
            }
            Err(e) => {
                // a reply we cannot decode means the stream is not parseable
                let detail = e.to_string();
                reply_tx
                    .send(Err(JdwpError::malformed(detail.clone())))
                    .ok();
                Err(JdwpError::malformed(detail))
            }
        };
    }

    let command_set = packet[9];
    let command = packet[10];
    if command_set != command_sets::EVENT || command != event_set_commands::COMPOSITE {
        warn!("unexpected command {command_set}.{command} from VM, dropping");
        return Ok(Routed::Continue);
    }

    let event_set = parse_event_packet(&packet[HEADER_SIZE..])?;
    debug!(
        "received {} events, suspend_policy={}",
        event_set.events.len(),
        event_set.suspend_policy
    );

    let mut vm_death = false;
    let subscribers = subscriptions.lock().unwrap();
    for event in event_set.events {
        if matches!(event.kind, EventKind::VmDeath) {
            vm_death = true;
        }
        deliver(
            &subscribers,
            EventNotice {
                suspend_policy: event_set.suspend_policy,
                event,
            },
        );
    }

    Ok(if vm_death {
        Routed::VmDeath
    } else {
        Routed::Continue
    })
}

/// Deliver to the specific subscriber, falling back to the wildcard; events
/// reach at most one of them. Unbounded sends keep this path non-blocking.
fn deliver(
    subscribers: &HashMap<i32, mpsc::UnboundedSender<EventNotice>>,
    notice: EventNotice,
) {
    let request_id = notice.event.request_id;

    let notice = match subscribers.get(&request_id) {
        Some(tx) => match tx.send(notice) {
            Ok(()) => return,
            // subscriber receiver dropped without unsubscribing
            Err(rejected) => rejected.0,
        },
        None => notice,
    };

    if request_id != WILDCARD_SUBSCRIPTION {
        if let Some(tx) = subscribers.get(&WILDCARD_SUBSCRIPTION) {
            if tx.send(notice).is_ok() {
                return;
            }
        }
    }

    debug!("no subscriber for event request id {request_id}, dropping");
}
