// EventRequest command implementations
//
// Set up event requests (breakpoints, steps, lifecycle notifications, etc.)

use crate::commands::{command_sets, event_commands, event_kinds, modifier_kinds, step_depths,
    step_sizes};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{read_i32, write_location, write_string};
use crate::types::{FieldId, Location, ObjectId, ReferenceTypeId, ThreadId};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// How many threads the VM suspends when a requested event fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SuspendPolicy {
    None = 0,
    EventThread = 1,
    All = 2,
}

/// Granularity of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepSize {
    Min,
    Line,
}

impl StepSize {
    pub fn raw(self) -> i32 {
        match self {
            StepSize::Min => step_sizes::MIN,
            StepSize::Line => step_sizes::LINE,
        }
    }
}

/// Call-depth behavior of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepDepth {
    Into,
    Over,
    Out,
}

impl StepDepth {
    pub fn raw(self) -> i32 {
        match self {
            StepDepth::Into => step_depths::INTO,
            StepDepth::Over => step_depths::OVER,
            StepDepth::Out => step_depths::OUT,
        }
    }
}

// Event request modifiers, encoded in request order after the count
#[derive(Debug, Clone)]
pub enum EventModifier {
    /// Fire after being satisfied `count` times, then expire
    Count(i32),
    ThreadOnly(ThreadId),
    ClassOnly(ReferenceTypeId),
    ClassMatch(String),
    ClassExclude(String),
    LocationOnly(Location),
    ExceptionOnly {
        ref_type: ReferenceTypeId,
        caught: bool,
        uncaught: bool,
    },
    FieldOnly {
        ref_type: ReferenceTypeId,
        field_id: FieldId,
    },
    Step {
        thread: ThreadId,
        size: StepSize,
        depth: StepDepth,
    },
    InstanceOnly(ObjectId),
}

impl EventModifier {
    fn write(&self, buf: &mut Vec<u8>) {
        match self {
            EventModifier::Count(count) => {
                buf.put_u8(modifier_kinds::COUNT);
                buf.put_i32(*count);
            }
            EventModifier::ThreadOnly(thread) => {
                buf.put_u8(modifier_kinds::THREAD_ONLY);
                buf.put_u64(*thread);
            }
            EventModifier::ClassOnly(ref_type) => {
                buf.put_u8(modifier_kinds::CLASS_ONLY);
                buf.put_u64(*ref_type);
            }
            EventModifier::ClassMatch(pattern) => {
                buf.put_u8(modifier_kinds::CLASS_MATCH);
                write_string(buf, pattern);
            }
            EventModifier::ClassExclude(pattern) => {
                buf.put_u8(modifier_kinds::CLASS_EXCLUDE);
                write_string(buf, pattern);
            }
            EventModifier::LocationOnly(location) => {
                buf.put_u8(modifier_kinds::LOCATION_ONLY);
                write_location(buf, location);
            }
            EventModifier::ExceptionOnly {
                ref_type,
                caught,
                uncaught,
            } => {
                buf.put_u8(modifier_kinds::EXCEPTION_ONLY);
                buf.put_u64(*ref_type);
                buf.put_u8(u8::from(*caught));
                buf.put_u8(u8::from(*uncaught));
            }
            EventModifier::FieldOnly { ref_type, field_id } => {
                buf.put_u8(modifier_kinds::FIELD_ONLY);
                buf.put_u64(*ref_type);
                buf.put_u64(*field_id);
            }
            EventModifier::Step {
                thread,
                size,
                depth,
            } => {
                buf.put_u8(modifier_kinds::STEP);
                buf.put_u64(*thread);
                buf.put_i32(size.raw());
                buf.put_i32(depth.raw());
            }
            EventModifier::InstanceOnly(object) => {
                buf.put_u8(modifier_kinds::INSTANCE_ONLY);
                buf.put_u64(*object);
            }
        }
    }
}

impl JdwpConnection {
    /// Register an event request (EventRequest.Set command).
    /// Returns the request ID the VM will tag matching events with.
    pub async fn set_event_request(
        &self,
        event_kind: u8,
        suspend_policy: SuspendPolicy,
        modifiers: &[EventModifier],
    ) -> JdwpResult<i32> {
        let id = self.next_id();
        let mut packet =
            CommandPacket::new(id, command_sets::EVENT_REQUEST, event_commands::SET);

        packet.data.put_u8(event_kind);
        packet.data.put_u8(suspend_policy as u8);
        packet.data.put_i32(modifiers.len() as i32);
        for modifier in modifiers {
            modifier.write(&mut packet.data);
        }

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_i32(&mut data)
    }

    /// Set a breakpoint at an exact code location
    pub async fn set_breakpoint_at(
        &self,
        location: Location,
        suspend_policy: SuspendPolicy,
    ) -> JdwpResult<i32> {
        self.set_event_request(
            event_kinds::BREAKPOINT,
            suspend_policy,
            &[EventModifier::LocationOnly(location)],
        )
        .await
    }

    /// Request a one-shot single step on a suspended thread. The Count
    /// modifier expires the request after it fires once.
    pub async fn set_single_step(
        &self,
        thread_id: ThreadId,
        size: StepSize,
        depth: StepDepth,
    ) -> JdwpResult<i32> {
        self.set_event_request(
            event_kinds::SINGLE_STEP,
            SuspendPolicy::EventThread,
            &[
                EventModifier::Step {
                    thread: thread_id,
                    size,
                    depth,
                },
                EventModifier::Count(1),
            ],
        )
        .await
    }

    /// Drop an event request (EventRequest.Clear command). Events already
    /// in flight may still arrive.
    pub async fn clear_event_request(&self, event_kind: u8, request_id: i32) -> JdwpResult<()> {
        let id = self.next_id();
        let mut packet =
            CommandPacket::new(id, command_sets::EVENT_REQUEST, event_commands::CLEAR);

        packet.data.put_u8(event_kind);
        packet.data.put_i32(request_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        Ok(())
    }

    /// Drop every breakpoint request (EventRequest.ClearAllBreakpoints)
    pub async fn clear_all_breakpoints(&self) -> JdwpResult<()> {
        let id = self.next_id();
        let packet = CommandPacket::new(
            id,
            command_sets::EVENT_REQUEST,
            event_commands::CLEAR_ALL_BREAKPOINTS,
        );

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        Ok(())
    }
}
