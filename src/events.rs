// JDWP event decoding
//
// The VM pushes Composite packets (command set 64, command 100) carrying one
// or more event records. Every kind the VM could ever send must decode with
// its exact wire length: a single mis-sized record desynchronizes the whole
// stream, so an unknown kind is fatal rather than skipped.

use crate::commands::event_kinds;
use crate::protocol::{JdwpError, JdwpResult};
use crate::reader::{
    read_i32, read_location, read_string, read_tagged_object_id, read_u32, read_u64, read_u8,
};
use crate::types::{Location, ReferenceTypeId, TaggedObjectId, ThreadId, Value};
use serde::{Deserialize, Serialize};

/// One decoded Composite packet: the VM-chosen suspend policy plus the
/// contained events in wire order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSet {
    pub suspend_policy: u8,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub request_id: i32,
    pub kind: EventKind,
}

/// A single event delivered to a subscriber, with the suspend policy of the
/// Composite packet it arrived in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventNotice {
    pub suspend_policy: u8,
    pub event: Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    VmStart {
        thread: ThreadId,
    },
    VmDeath,
    VmDisconnected,
    UserDefined,
    SingleStep {
        thread: ThreadId,
        location: Location,
    },
    Breakpoint {
        thread: ThreadId,
        location: Location,
    },
    MethodEntry {
        thread: ThreadId,
        location: Location,
    },
    MethodExit {
        thread: ThreadId,
        location: Location,
    },
    MethodExitWithReturnValue {
        thread: ThreadId,
        location: Location,
        value: Value,
    },
    FramePop {
        thread: ThreadId,
        location: Location,
    },
    Exception {
        thread: ThreadId,
        location: Location,
        exception: TaggedObjectId,
        catch_location: Option<Location>,
    },
    ExceptionCatch {
        thread: ThreadId,
        location: Location,
        catch_location: Location,
    },
    ThreadStart {
        thread: ThreadId,
    },
    ThreadDeath {
        thread: ThreadId,
    },
    ClassPrepare {
        thread: ThreadId,
        ref_type_tag: u8,
        type_id: ReferenceTypeId,
        signature: String,
        status: i32,
    },
    ClassLoad {
        thread: ThreadId,
        ref_type_tag: u8,
        type_id: ReferenceTypeId,
        signature: String,
        status: i32,
    },
    ClassUnload {
        signature: String,
    },
    FieldAccess {
        thread: ThreadId,
        ref_type_tag: u8,
        type_id: ReferenceTypeId,
        field_id: u64,
        object: TaggedObjectId,
        location: Location,
    },
    FieldModification {
        thread: ThreadId,
        ref_type_tag: u8,
        type_id: ReferenceTypeId,
        field_id: u64,
        object: TaggedObjectId,
        location: Location,
        value: Value,
    },
    MonitorContendedEnter {
        thread: ThreadId,
        monitor: TaggedObjectId,
        location: Location,
    },
    MonitorContendedEntered {
        thread: ThreadId,
        monitor: TaggedObjectId,
        location: Location,
    },
    MonitorWait {
        thread: ThreadId,
        monitor: TaggedObjectId,
        location: Location,
    },
    MonitorWaited {
        thread: ThreadId,
        monitor: TaggedObjectId,
        location: Location,
    },
}

impl EventKind {
    /// The thread the event occurred on, when the record carries one.
    pub fn thread(&self) -> Option<ThreadId> {
        use EventKind::*;
        match self {
            VmStart { thread }
            | SingleStep { thread, .. }
            | Breakpoint { thread, .. }
            | MethodEntry { thread, .. }
            | MethodExit { thread, .. }
            | MethodExitWithReturnValue { thread, .. }
            | FramePop { thread, .. }
            | Exception { thread, .. }
            | ExceptionCatch { thread, .. }
            | ThreadStart { thread }
            | ThreadDeath { thread }
            | ClassPrepare { thread, .. }
            | ClassLoad { thread, .. }
            | FieldAccess { thread, .. }
            | FieldModification { thread, .. }
            | MonitorContendedEnter { thread, .. }
            | MonitorContendedEntered { thread, .. }
            | MonitorWait { thread, .. }
            | MonitorWaited { thread, .. } => Some(*thread),
            VmDeath | VmDisconnected | UserDefined | ClassUnload { .. } => None,
        }
    }
}

/// Parse the payload of a Composite event packet (the bytes after the
/// 11-byte header): suspendPolicy, eventCount, then the records.
pub fn parse_event_packet(mut data: &[u8]) -> JdwpResult<EventSet> {
    let buf = &mut data;
    let suspend_policy = read_u8(buf)?;
    let count = read_u32(buf)?;

    let mut events = Vec::with_capacity(count as usize);
    for _ in 0..count {
        events.push(read_event(buf)?);
    }

    if !buf.is_empty() {
        return Err(JdwpError::malformed(format!(
            "{} trailing bytes after {} event records",
            buf.len(),
            count
        )));
    }

    Ok(EventSet {
        suspend_policy,
        events,
    })
}

/// Exception catch locations use class/method ID zero for "uncaught".
fn optional_location(location: Location) -> Option<Location> {
    if location.class_id == 0 && location.method_id == 0 {
        None
    } else {
        Some(location)
    }
}

fn read_class_event(
    buf: &mut &[u8],
) -> JdwpResult<(ThreadId, u8, ReferenceTypeId, String, i32)> {
    let thread = read_u64(buf)?;
    let ref_type_tag = read_u8(buf)?;
    let type_id = read_u64(buf)?;
    let signature = read_string(buf)?;
    let status = read_i32(buf)?;
    Ok((thread, ref_type_tag, type_id, signature, status))
}

fn read_event(buf: &mut &[u8]) -> JdwpResult<Event> {
    let event_kind = read_u8(buf)?;
    let request_id = read_i32(buf)?;

    let kind = match event_kind {
        event_kinds::VM_START => EventKind::VmStart {
            thread: read_u64(buf)?,
        },
        event_kinds::VM_DEATH => EventKind::VmDeath,
        // kind 100 never appears on the wire (the transport synthesizes
        // disconnects), but decoding it costs nothing
        event_kinds::VM_DISCONNECTED => EventKind::VmDisconnected,
        event_kinds::USER_DEFINED => EventKind::UserDefined,
        event_kinds::SINGLE_STEP => EventKind::SingleStep {
            thread: read_u64(buf)?,
            location: read_location(buf)?,
        },
        event_kinds::BREAKPOINT => EventKind::Breakpoint {
            thread: read_u64(buf)?,
            location: read_location(buf)?,
        },
        event_kinds::METHOD_ENTRY => EventKind::MethodEntry {
            thread: read_u64(buf)?,
            location: read_location(buf)?,
        },
        event_kinds::METHOD_EXIT => EventKind::MethodExit {
            thread: read_u64(buf)?,
            location: read_location(buf)?,
        },
        event_kinds::METHOD_EXIT_WITH_RETURN_VALUE => EventKind::MethodExitWithReturnValue {
            thread: read_u64(buf)?,
            location: read_location(buf)?,
            value: Value::read(buf)?,
        },
        event_kinds::FRAME_POP => EventKind::FramePop {
            thread: read_u64(buf)?,
            location: read_location(buf)?,
        },
        event_kinds::EXCEPTION => EventKind::Exception {
            thread: read_u64(buf)?,
            location: read_location(buf)?,
            exception: read_tagged_object_id(buf)?,
            catch_location: optional_location(read_location(buf)?),
        },
        event_kinds::EXCEPTION_CATCH => EventKind::ExceptionCatch {
            thread: read_u64(buf)?,
            location: read_location(buf)?,
            catch_location: read_location(buf)?,
        },
        event_kinds::THREAD_START => EventKind::ThreadStart {
            thread: read_u64(buf)?,
        },
        event_kinds::THREAD_DEATH => EventKind::ThreadDeath {
            thread: read_u64(buf)?,
        },
        event_kinds::CLASS_PREPARE => {
            let (thread, ref_type_tag, type_id, signature, status) = read_class_event(buf)?;
            EventKind::ClassPrepare {
                thread,
                ref_type_tag,
                type_id,
                signature,
                status,
            }
        }
        event_kinds::CLASS_LOAD => {
            let (thread, ref_type_tag, type_id, signature, status) = read_class_event(buf)?;
            EventKind::ClassLoad {
                thread,
                ref_type_tag,
                type_id,
                signature,
                status,
            }
        }
        event_kinds::CLASS_UNLOAD => EventKind::ClassUnload {
            signature: read_string(buf)?,
        },
        event_kinds::FIELD_ACCESS => EventKind::FieldAccess {
            thread: read_u64(buf)?,
            ref_type_tag: read_u8(buf)?,
            type_id: read_u64(buf)?,
            field_id: read_u64(buf)?,
            object: read_tagged_object_id(buf)?,
            location: read_location(buf)?,
        },
        event_kinds::FIELD_MODIFICATION => EventKind::FieldModification {
            thread: read_u64(buf)?,
            ref_type_tag: read_u8(buf)?,
            type_id: read_u64(buf)?,
            field_id: read_u64(buf)?,
            object: read_tagged_object_id(buf)?,
            location: read_location(buf)?,
            value: Value::read(buf)?,
        },
        event_kinds::MONITOR_CONTENDED_ENTER => EventKind::MonitorContendedEnter {
            thread: read_u64(buf)?,
            monitor: read_tagged_object_id(buf)?,
            location: read_location(buf)?,
        },
        event_kinds::MONITOR_CONTENDED_ENTERED => EventKind::MonitorContendedEntered {
            thread: read_u64(buf)?,
            monitor: read_tagged_object_id(buf)?,
            location: read_location(buf)?,
        },
        event_kinds::MONITOR_WAIT => EventKind::MonitorWait {
            thread: read_u64(buf)?,
            monitor: read_tagged_object_id(buf)?,
            location: read_location(buf)?,
        },
        event_kinds::MONITOR_WAITED => EventKind::MonitorWaited {
            thread: read_u64(buf)?,
            monitor: read_tagged_object_id(buf)?,
            location: read_location(buf)?,
        },
        other => {
            return Err(JdwpError::malformed(format!(
                "unknown event kind {other}; stream cannot be trusted"
            )));
        }
    };

    Ok(Event { request_id, kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{write_location, write_string};
    use crate::types::{tag, type_tag};
    use bytes::BufMut;

    fn location() -> Location {
        Location {
            type_tag: type_tag::CLASS,
            class_id: 0xAA,
            method_id: 0xBB,
            index: 0,
        }
    }

    fn composite(suspend_policy: u8, records: &[Vec<u8>]) -> Vec<u8> {
        let mut data = vec![suspend_policy];
        data.put_u32(records.len() as u32);
        for record in records {
            data.extend_from_slice(record);
        }
        data
    }

    fn breakpoint_record(request_id: i32, thread: ThreadId) -> Vec<u8> {
        let mut record = vec![event_kinds::BREAKPOINT];
        record.put_i32(request_id);
        record.put_u64(thread);
        write_location(&mut record, &location());
        record
    }

    #[test]
    fn test_parse_breakpoint_event() {
        let data = composite(2, &[breakpoint_record(1, 0xCAFE)]);
        let set = parse_event_packet(&data).unwrap();

        assert_eq!(set.suspend_policy, 2);
        assert_eq!(set.events.len(), 1);
        assert_eq!(set.events[0].request_id, 1);
        match &set.events[0].kind {
            EventKind::Breakpoint { thread, location } => {
                assert_eq!(*thread, 0xCAFE);
                assert_eq!(location.class_id, 0xAA);
                assert_eq!(location.method_id, 0xBB);
            }
            other => panic!("expected breakpoint, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_multiple_events_in_wire_order() {
        let mut thread_start = vec![event_kinds::THREAD_START];
        thread_start.put_i32(0);
        thread_start.put_u64(0x11);

        let data = composite(0, &[thread_start, breakpoint_record(3, 0x22)]);
        let set = parse_event_packet(&data).unwrap();

        assert_eq!(set.events.len(), 2);
        assert!(matches!(
            set.events[0].kind,
            EventKind::ThreadStart { thread: 0x11 }
        ));
        assert!(matches!(
            set.events[1].kind,
            EventKind::Breakpoint { thread: 0x22, .. }
        ));
    }

    #[test]
    fn test_parse_class_prepare() {
        let mut record = vec![event_kinds::CLASS_PREPARE];
        record.put_i32(0);
        record.put_u64(0x1);
        record.put_u8(type_tag::CLASS);
        record.put_u64(0xAA);
        write_string(&mut record, "Landroid/app/Activity;");
        record.put_i32(7);

        let set = parse_event_packet(&composite(0, &[record])).unwrap();
        match &set.events[0].kind {
            EventKind::ClassPrepare {
                signature, status, ..
            } => {
                assert_eq!(signature, "Landroid/app/Activity;");
                assert_eq!(*status, 7);
            }
            other => panic!("expected class prepare, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_exception_uncaught() {
        let mut record = vec![event_kinds::EXCEPTION];
        record.put_i32(9);
        record.put_u64(0xCAFE);
        write_location(&mut record, &location());
        record.put_u8(tag::OBJECT);
        record.put_u64(0xE0);
        // all-zero catch location = uncaught
        write_location(
            &mut record,
            &Location {
                type_tag: 0,
                class_id: 0,
                method_id: 0,
                index: 0,
            },
        );

        let set = parse_event_packet(&composite(1, &[record])).unwrap();
        match &set.events[0].kind {
            EventKind::Exception {
                exception,
                catch_location,
                ..
            } => {
                assert_eq!(exception.object_id, 0xE0);
                assert!(catch_location.is_none());
            }
            other => panic!("expected exception, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_method_exit_with_return_value() {
        let mut record = vec![event_kinds::METHOD_EXIT_WITH_RETURN_VALUE];
        record.put_i32(4);
        record.put_u64(0xCAFE);
        write_location(&mut record, &location());
        Value::int(41).write(&mut record);

        let set = parse_event_packet(&composite(1, &[record])).unwrap();
        match &set.events[0].kind {
            EventKind::MethodExitWithReturnValue { value, .. } => {
                assert_eq!(value.expect_int().unwrap(), 41);
            }
            other => panic!("expected method exit, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_field_modification() {
        let mut record = vec![event_kinds::FIELD_MODIFICATION];
        record.put_i32(5);
        record.put_u64(0xCAFE);
        record.put_u8(type_tag::CLASS);
        record.put_u64(0xAA);
        record.put_u64(0xF1);
        record.put_u8(tag::OBJECT);
        record.put_u64(0x0B);
        write_location(&mut record, &location());
        Value::int(-1).write(&mut record);

        let set = parse_event_packet(&composite(1, &[record])).unwrap();
        match &set.events[0].kind {
            EventKind::FieldModification {
                field_id,
                object,
                value,
                ..
            } => {
                assert_eq!(*field_id, 0xF1);
                assert_eq!(object.object_id, 0x0B);
                assert_eq!(value.expect_int().unwrap(), -1);
            }
            other => panic!("expected field modification, got {other:?}"),
        }
    }

    #[test]
    fn test_vm_death_carries_no_thread() {
        let mut record = vec![event_kinds::VM_DEATH];
        record.put_i32(0);

        let set = parse_event_packet(&composite(2, &[record])).unwrap();
        assert!(matches!(set.events[0].kind, EventKind::VmDeath));
        assert_eq!(set.events[0].kind.thread(), None);
    }

    #[test]
    fn test_unknown_kind_is_fatal() {
        let mut record = vec![0x7F];
        record.put_i32(0);

        assert!(matches!(
            parse_event_packet(&composite(0, &[record])),
            Err(JdwpError::MalformedPacket(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_are_fatal() {
        let mut data = composite(2, &[breakpoint_record(1, 0xCAFE)]);
        data.push(0xEE);

        assert!(matches!(
            parse_event_packet(&data),
            Err(JdwpError::MalformedPacket(_))
        ));
    }

    #[test]
    fn test_truncated_record_is_fatal() {
        let record = breakpoint_record(1, 0xCAFE);
        let data = composite(2, &[record[..record.len() - 4].to_vec()]);

        assert!(parse_event_packet(&data).is_err());
    }

    #[test]
    fn test_event_json_shape() {
        // Facade consumers serialize events; the kind is the serde tag.
        let event = Event {
            request_id: 2,
            kind: EventKind::ThreadStart { thread: 0x33 },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"]["type"], "ThreadStart");
        assert_eq!(json["kind"]["thread"], 0x33);
    }
}
