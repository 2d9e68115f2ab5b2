// ClassType command implementations
//
// Static method invocation on a suspended thread

use crate::commands::{class_type_commands, command_sets};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::read_tagged_object_id;
use crate::types::{ClassId, MethodId, TaggedObjectId, ThreadId, Value};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// Result of an InvokeMethod: the return value plus the exception thrown by
/// the invoked method, if any (a null exception ID means none). Exceptions
/// are returned in the reply, never raised as a protocol error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeReply {
    pub value: Value,
    pub exception: TaggedObjectId,
}

impl InvokeReply {
    pub fn threw(&self) -> bool {
        !self.exception.is_null()
    }
}

/// Argument list encoding shared by the invoke commands:
/// argCount (u32) then each value tagged, then the options word.
pub(crate) fn write_arguments(buf: &mut Vec<u8>, arguments: &[Value], options: u32) {
    buf.put_u32(arguments.len() as u32);
    for argument in arguments {
        argument.write(buf);
    }
    buf.put_u32(options);
}

pub(crate) fn read_invoke_reply(mut data: &[u8]) -> JdwpResult<InvokeReply> {
    let value = Value::read(&mut data)?;
    let exception = read_tagged_object_id(&mut data)?;
    Ok(InvokeReply { value, exception })
}

impl JdwpConnection {
    /// Invoke a static method (ClassType.InvokeMethod command).
    ///
    /// `thread` must be suspended by an event; the VM runs the method on it
    /// and re-suspends it before replying.
    pub async fn class_invoke_method(
        &self,
        class_id: ClassId,
        thread_id: ThreadId,
        method_id: MethodId,
        arguments: &[Value],
        options: u32,
    ) -> JdwpResult<InvokeReply> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::CLASS_TYPE,
            class_type_commands::INVOKE_METHOD,
        );

        packet.data.put_u64(class_id);
        packet.data.put_u64(thread_id);
        packet.data.put_u64(method_id);
        write_arguments(&mut packet.data, arguments, options);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        read_invoke_reply(reply.data())
    }
}
