// ArrayReference command implementations

use crate::commands::{array_reference_commands, command_sets};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{read_i32, read_u8};
use crate::types::{tag, ArrayId, Value};
use bytes::BufMut;

impl JdwpConnection {
    /// Number of components in an array (ArrayReference.Length command)
    pub async fn array_length(&self, array_id: ArrayId) -> JdwpResult<i32> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::ARRAY_REFERENCE,
            array_reference_commands::LENGTH,
        );

        packet.data.put_u64(array_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_i32(&mut data)
    }

    /// Fetch a range of array components (ArrayReference.GetValues command).
    ///
    /// The reply is an array region: a component tag and count, then the
    /// elements. Primitive regions elide the per-element tag; reference
    /// regions carry one per element.
    pub async fn array_get_values(
        &self,
        array_id: ArrayId,
        first_index: i32,
        length: i32,
    ) -> JdwpResult<Vec<Value>> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::ARRAY_REFERENCE,
            array_reference_commands::GET_VALUES,
        );

        packet.data.put_u64(array_id);
        packet.data.put_i32(first_index);
        packet.data.put_i32(length);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();

        let component_tag = read_u8(&mut data)?;
        let count = read_i32(&mut data)?;
        let mut values = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let value = if tag::is_object(component_tag) {
                Value::read(&mut data)?
            } else {
                Value::read_untagged(component_tag, &mut data)?
            };
            values.push(value);
        }

        Ok(values)
    }
}
