// Scripted mock VM for integration tests.
#![allow(dead_code)] // each test binary uses its own subset of these helpers
//
// Each test drives the client over one half of a tokio duplex pipe while a
// spawned task plays the VM on the other half: it answers the handshake,
// decodes command packets, and replies according to a per-test script.

use bytes::BufMut;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

pub const HANDSHAKE: &[u8] = b"JDWP-Handshake";

/// Commands the VM saw, as (command_set, command, payload).
pub type CommandLog = Arc<Mutex<Vec<(u8, u8, Vec<u8>)>>>;

/// What the script wants done with one received command.
pub enum VmResponse {
    /// Success reply with this payload.
    Reply(Vec<u8>),
    /// Error reply with this code and no payload.
    Error(u16),
    /// Success reply, then push these raw bytes (e.g. an event packet).
    ReplyThen(Vec<u8>, Vec<u8>),
    /// Success reply after a pause (for timeout tests).
    DelayedReply(u64, Vec<u8>),
    /// No reply at all.
    Ignore,
    /// Push these raw bytes without replying, then close the stream.
    Hangup(Vec<u8>),
}

pub async fn vm_handshake(stream: &mut DuplexStream) {
    let mut buf = [0u8; 14];
    stream.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, HANDSHAKE, "client must open with the handshake");
    stream.write_all(HANDSHAKE).await.unwrap();
}

pub async fn read_command(stream: &mut DuplexStream) -> Option<(u32, u8, u8, Vec<u8>)> {
    let mut header = [0u8; 11];
    stream.read_exact(&mut header).await.ok()?;

    let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let id = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    assert_eq!(header[8], 0x00, "VM only receives command packets");

    let mut data = vec![0u8; length - 11];
    if !data.is_empty() {
        stream.read_exact(&mut data).await.ok()?;
    }

    Some((id, header[9], header[10], data))
}

pub fn reply_packet(id: u32, error_code: u16, payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::new();
    packet.put_u32((11 + payload.len()) as u32);
    packet.put_u32(id);
    packet.put_u8(0x80);
    packet.put_u16(error_code);
    packet.extend_from_slice(payload);
    packet
}

pub fn composite_packet(suspend_policy: u8, records: &[Vec<u8>]) -> Vec<u8> {
    let mut payload = vec![suspend_policy];
    payload.put_u32(records.len() as u32);
    for record in records {
        payload.extend_from_slice(record);
    }

    let mut packet = Vec::new();
    packet.put_u32((11 + payload.len()) as u32);
    packet.put_u32(0x0EE0);
    packet.put_u8(0x00);
    packet.put_u8(64);
    packet.put_u8(100);
    packet.extend_from_slice(&payload);
    packet
}

pub fn breakpoint_record(request_id: i32, thread: u64, class_id: u64, method_id: u64) -> Vec<u8> {
    let mut record = vec![2u8]; // BREAKPOINT
    record.put_i32(request_id);
    record.put_u64(thread);
    record.put_u8(1); // type tag CLASS
    record.put_u64(class_id);
    record.put_u64(method_id);
    record.put_u64(0);
    record
}

pub fn vm_death_record() -> Vec<u8> {
    let mut record = vec![99u8]; // VM_DEATH
    record.put_i32(0);
    record
}

// ---- reply payload builders ---------------------------------------------

pub fn put_jdwp_string(buf: &mut Vec<u8>, s: &str) {
    buf.put_u32(s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
}

pub fn parse_jdwp_string(data: &[u8]) -> String {
    let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    String::from_utf8(data[4..4 + len].to_vec()).unwrap()
}

pub fn string_payload(s: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    put_jdwp_string(&mut payload, s);
    payload
}

pub fn id_sizes_payload() -> Vec<u8> {
    let mut payload = Vec::new();
    for _ in 0..5 {
        payload.put_i32(8);
    }
    payload
}

pub fn version_payload() -> Vec<u8> {
    let mut payload = Vec::new();
    put_jdwp_string(&mut payload, "Mock VM JDWP");
    payload.put_i32(1);
    payload.put_i32(8);
    put_jdwp_string(&mut payload, "2.1.0");
    put_jdwp_string(&mut payload, "Dalvik");
    payload
}

pub fn request_id_payload(request_id: i32) -> Vec<u8> {
    request_id.to_be_bytes().to_vec()
}

pub fn classes_payload(ref_type_tag: u8, type_id: u64, status: i32) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.put_i32(1);
    payload.put_u8(ref_type_tag);
    payload.put_u64(type_id);
    payload.put_i32(status);
    payload
}

pub fn no_classes_payload() -> Vec<u8> {
    0i32.to_be_bytes().to_vec()
}

pub fn methods_payload(methods: &[(u64, &str, &str, i32)]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.put_i32(methods.len() as i32);
    for (method_id, name, signature, mod_bits) in methods {
        payload.put_u64(*method_id);
        put_jdwp_string(&mut payload, name);
        put_jdwp_string(&mut payload, signature);
        payload.put_i32(*mod_bits);
    }
    payload
}

pub fn threads_payload(thread_ids: &[u64]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.put_i32(thread_ids.len() as i32);
    for thread_id in thread_ids {
        payload.put_u64(*thread_id);
    }
    payload
}

/// InvokeMethod reply: an object return value and no exception.
pub fn object_invoke_payload(tag: u8, object_id: u64) -> Vec<u8> {
    let mut payload = vec![tag];
    payload.put_u64(object_id);
    payload.put_u8(b'L');
    payload.put_u64(0);
    payload
}

/// InvokeMethod reply: an int return value and no exception.
pub fn int_invoke_payload(value: i32) -> Vec<u8> {
    let mut payload = vec![b'I'];
    payload.put_i32(value);
    payload.put_u8(b'L');
    payload.put_u64(0);
    payload
}

/// InvokeMethod reply: void return and no exception.
pub fn void_invoke_payload() -> Vec<u8> {
    let mut payload = vec![b'V'];
    payload.put_u8(b'L');
    payload.put_u64(0);
    payload
}

pub fn u64_payload(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

pub fn frames_payload(frames: &[(u64, u64, u64, u64)]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.put_i32(frames.len() as i32);
    for (frame_id, class_id, method_id, index) in frames {
        payload.put_u64(*frame_id);
        payload.put_u8(1); // type tag CLASS
        payload.put_u64(*class_id);
        payload.put_u64(*method_id);
        payload.put_u64(*index);
    }
    payload
}

pub fn variable_table_payload(arg_count: i32, vars: &[(u64, &str, &str, u32, u32)]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.put_i32(arg_count);
    payload.put_i32(vars.len() as i32);
    for (code_index, name, signature, length, slot) in vars {
        payload.put_u64(*code_index);
        put_jdwp_string(&mut payload, name);
        put_jdwp_string(&mut payload, signature);
        payload.put_u32(*length);
        payload.put_u32(*slot);
    }
    payload
}

/// StackFrame.GetValues reply carrying one tagged value.
pub fn single_value_payload(tag: u8, raw: &[u8]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.put_i32(1);
    payload.put_u8(tag);
    payload.extend_from_slice(raw);
    payload
}

/// ArrayReference.GetValues reply: an untagged int region.
pub fn int_region_payload(values: &[i32]) -> Vec<u8> {
    let mut payload = vec![b'I'];
    payload.put_i32(values.len() as i32);
    for value in values {
        payload.put_i32(*value);
    }
    payload
}

pub fn fields_payload(fields: &[(u64, &str, &str, i32)]) -> Vec<u8> {
    // same wire shape as a method list
    methods_payload(fields)
}

// ---- the VM task ---------------------------------------------------------

/// Replies a well-behaved VM gives during session attach and teardown.
/// EventRequest.Set is only answered for thread lifecycle kinds so that
/// test scripts can intercept breakpoint/step requests themselves.
pub fn attach_defaults(set: u8, cmd: u8, data: &[u8]) -> Option<VmResponse> {
    match (set, cmd) {
        (1, 7) => Some(VmResponse::Reply(id_sizes_payload())),
        (15, 1) if matches!(data.first().copied(), Some(6 | 7)) => {
            Some(VmResponse::Reply(request_id_payload(0x0700 + i32::from(data[0]))))
        }
        (1, 4) => Some(VmResponse::Reply(threads_payload(&[0x1000]))),
        (11, 1) => Some(VmResponse::Reply(string_payload("main"))),
        (11, 2) | (11, 3) => Some(VmResponse::Reply(Vec::new())),
        (1, 9) => Some(VmResponse::Reply(Vec::new())),
        (15, 2) | (15, 3) => Some(VmResponse::Reply(Vec::new())),
        (1, 6) => Some(VmResponse::Reply(Vec::new())),
        _ => None,
    }
}

/// Spawn the VM side of a duplex pipe. The script maps each received
/// command to a response; every command is also appended to the returned
/// log.
pub fn spawn_vm<F>(mut stream: DuplexStream, mut script: F) -> (JoinHandle<()>, CommandLog)
where
    F: FnMut(u8, u8, &[u8]) -> VmResponse + Send + 'static,
{
    let log: CommandLog = Arc::new(Mutex::new(Vec::new()));
    let task_log = Arc::clone(&log);

    let task = tokio::spawn(async move {
        vm_handshake(&mut stream).await;

        while let Some((id, set, cmd, data)) = read_command(&mut stream).await {
            task_log.lock().unwrap().push((set, cmd, data.clone()));

            match script(set, cmd, &data) {
                VmResponse::Reply(payload) => {
                    stream.write_all(&reply_packet(id, 0, &payload)).await.unwrap();
                }
                VmResponse::Error(code) => {
                    stream.write_all(&reply_packet(id, code, &[])).await.unwrap();
                }
                VmResponse::ReplyThen(payload, extra) => {
                    stream.write_all(&reply_packet(id, 0, &payload)).await.unwrap();
                    stream.write_all(&extra).await.unwrap();
                }
                VmResponse::DelayedReply(delay_ms, payload) => {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    stream.write_all(&reply_packet(id, 0, &payload)).await.unwrap();
                }
                VmResponse::Ignore => {}
                VmResponse::Hangup(extra) => {
                    stream.write_all(&extra).await.unwrap();
                    stream.flush().await.unwrap();
                    break;
                }
            }
        }
    });

    (task, log)
}

pub fn pair() -> (DuplexStream, DuplexStream) {
    tokio::io::duplex(64 * 1024)
}
