// Method command implementations

use crate::commands::{command_sets, method_commands};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{read_i32, read_string, read_u32, read_u64};
use crate::types::{MethodId, ReferenceTypeId, Variable};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// Local variable table for a method (Method.VariableTable command).
/// The first `arg_count` slots hold the method's arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableTable {
    pub arg_count: i32,
    pub variables: Vec<Variable>,
}

impl JdwpConnection {
    /// Get names, signatures, and slots of a method's local variables
    /// (Method.VariableTable command)
    pub async fn variable_table(
        &self,
        ref_type_id: ReferenceTypeId,
        method_id: MethodId,
    ) -> JdwpResult<VariableTable> {
        let id = self.next_id();
        let mut packet =
            CommandPacket::new(id, command_sets::METHOD, method_commands::VARIABLE_TABLE);

        packet.data.put_u64(ref_type_id);
        packet.data.put_u64(method_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();

        let arg_count = read_i32(&mut data)?;

        let vars_count = read_i32(&mut data)?;
        let mut variables = Vec::with_capacity(vars_count as usize);

        for _ in 0..vars_count {
            let code_index = read_u64(&mut data)?;
            let name = read_string(&mut data)?;
            let signature = read_string(&mut data)?;
            let length = read_u32(&mut data)?;
            let slot = read_u32(&mut data)?;

            variables.push(Variable {
                code_index,
                name,
                signature,
                length,
                slot,
            });
        }

        Ok(VariableTable {
            arg_count,
            variables,
        })
    }
}
