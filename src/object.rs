// ObjectReference command implementations
//
// Commands for working with object instances

use crate::classtype::{read_invoke_reply, write_arguments, InvokeReply};
use crate::commands::{command_sets, object_reference_commands};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{read_i32, read_u64, read_u8};
use crate::types::{ClassId, FieldId, MethodId, ObjectId, ReferenceTypeId, ThreadId, Value};
use bytes::BufMut;

impl JdwpConnection {
    /// Get the runtime type of an object (ObjectReference.ReferenceType)
    pub async fn object_reference_type(
        &self,
        object_id: ObjectId,
    ) -> JdwpResult<(u8, ReferenceTypeId)> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::OBJECT_REFERENCE,
            object_reference_commands::REFERENCE_TYPE,
        );

        packet.data.put_u64(object_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();

        let ref_type_tag = read_u8(&mut data)?;
        let reference_type_id = read_u64(&mut data)?;

        Ok((ref_type_tag, reference_type_id))
    }

    /// Get instance field values (ObjectReference.GetValues command).
    /// Values come back tagged, in the order the field IDs were sent.
    pub async fn object_get_values(
        &self,
        object_id: ObjectId,
        field_ids: &[FieldId],
    ) -> JdwpResult<Vec<Value>> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::OBJECT_REFERENCE,
            object_reference_commands::GET_VALUES,
        );

        packet.data.put_u64(object_id);
        packet.data.put_i32(field_ids.len() as i32);
        for field_id in field_ids {
            packet.data.put_u64(*field_id);
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

    /// Invoke an instance method (ObjectReference.InvokeMethod command).
    ///
    /// `thread` must be suspended by an event. `class_id` selects the
    /// declaring type for method resolution.
    pub async fn object_invoke_method(
        &self,
        object_id: ObjectId,
        thread_id: ThreadId,
        class_id: ClassId,
        method_id: MethodId,
        arguments: &[Value],
        options: u32,
    ) -> JdwpResult<InvokeReply> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::OBJECT_REFERENCE,
            object_reference_commands::INVOKE_METHOD,
        );

        packet.data.put_u64(object_id);
        packet.data.put_u64(thread_id);
        packet.data.put_u64(class_id);
        packet.data.put_u64(method_id);
        write_arguments(&mut packet.data, arguments, options);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        read_invoke_reply(reply.data())
    }
}
