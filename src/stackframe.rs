// StackFrame command implementations
//
// Commands for inspecting stack frame variables

use crate::commands::{command_sets, stack_frame_commands};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::read_i32;
use crate::types::{FrameId, ThreadId, Value};
use bytes::BufMut;

/// A slot to retrieve: the variable-table slot number plus the expected
/// value tag (first byte of the variable's signature).
#[derive(Debug, Clone, Copy)]
pub struct VariableSlot {
    pub slot: i32,
    pub sig_tag: u8,
}

impl JdwpConnection {
    /// Get values for variable slots in a frame (StackFrame.GetValues).
    /// The thread must be suspended; values come back in slot order.
    pub async fn frame_get_values(
        &self,
        thread_id: ThreadId,
        frame_id: FrameId,
        slots: &[VariableSlot],
    ) -> JdwpResult<Vec<Value>> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::STACK_FRAME,
            stack_frame_commands::GET_VALUES,
        );

        packet.data.put_u64(thread_id);
        packet.data.put_u64(frame_id);
        packet.data.put_i32(slots.len() as i32);
        for slot in slots {
            packet.data.put_i32(slot.slot);
            packet.data.put_u8(slot.sig_tag);
        }

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();

        let values_count = read_i32(&mut data)?;
        let mut values = Vec::with_capacity(values_count as usize);

        for _ in 0..values_count {
            values.push(Value::read(&mut data)?);
        }

        Ok(values)
    }
}
