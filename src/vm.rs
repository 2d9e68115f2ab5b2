// VirtualMachine command implementations
//
// These are the fundamental commands for interacting with the VM

use crate::commands::{command_sets, vm_commands};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpError, JdwpResult};
use crate::reader::{read_i32, read_string, read_u64, read_u8, write_string};
use crate::types::{ReferenceTypeId, StringId};
use serde::{Deserialize, Serialize};

/// VM version information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmVersion {
    pub description: String,
    pub jdwp_major: i32,
    pub jdwp_minor: i32,
    pub vm_version: String,
    pub vm_name: String,
}

/// ID sizes used by the VM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmIdSizes {
    pub field_id_size: i32,
    pub method_id_size: i32,
    pub object_id_size: i32,
    pub reference_type_id_size: i32,
    pub frame_id_size: i32,
}

impl VmIdSizes {
    /// Android's debug profile uses 8 bytes for every ID kind; all wire
    /// layouts in this crate assume it.
    pub fn is_android_profile(&self) -> bool {
        self.field_id_size == 8
            && self.method_id_size == 8
            && self.object_id_size == 8
            && self.reference_type_id_size == 8
            && self.frame_id_size == 8
    }
}

/// Class information from ClassesBySignature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInfo {
    pub ref_type_tag: u8, // 1=class, 2=interface, 3=array
    pub type_id: ReferenceTypeId,
    pub signature: String,
    pub status: i32,
}

impl JdwpConnection {
    /// Get VM version information (VirtualMachine.Version command)
    pub async fn version(&self) -> JdwpResult<VmVersion> {
        let id = self.next_id();
        let packet = CommandPacket::new(id, command_sets::VIRTUAL_MACHINE, vm_commands::VERSION);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();

        let description = read_string(&mut data)?;
        let jdwp_major = read_i32(&mut data)?;
        let jdwp_minor = read_i32(&mut data)?;
        let vm_version = read_string(&mut data)?;
        let vm_name = read_string(&mut data)?;

        Ok(VmVersion {
            description,
            jdwp_major,
            jdwp_minor,
            vm_version,
            vm_name,
        })
    }

    /// Get ID sizes (VirtualMachine.IDSizes command)
    pub async fn id_sizes(&self) -> JdwpResult<VmIdSizes> {
        let id = self.next_id();
        let packet = CommandPacket::new(id, command_sets::VIRTUAL_MACHINE, vm_commands::ID_SIZES);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();

        let field_id_size = read_i32(&mut data)?;
        let method_id_size = read_i32(&mut data)?;
        let object_id_size = read_i32(&mut data)?;
        let reference_type_id_size = read_i32(&mut data)?;
        let frame_id_size = read_i32(&mut data)?;

        Ok(VmIdSizes {
            field_id_size,
            method_id_size,
            object_id_size,
            reference_type_id_size,
            frame_id_size,
        })
    }

    /// Probe the negotiated ID sizes and fail fast if the VM does not use
    /// the 8-byte profile this client is built for.
    pub async fn ensure_android_profile(&self) -> JdwpResult<VmIdSizes> {
        let sizes = self.id_sizes().await?;
        if !sizes.is_android_profile() {
            return Err(JdwpError::UnsupportedIdSizes);
        }
        Ok(sizes)
    }

    /// Find loaded classes by JNI signature (VirtualMachine.ClassesBySignature)
    /// Signature format: "Lcom/example/MyClass;" for classes, "[I" for arrays
    pub async fn classes_by_signature(&self, signature: &str) -> JdwpResult<Vec<ClassInfo>> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::VIRTUAL_MACHINE,
            vm_commands::CLASSES_BY_SIGNATURE,
        );

        write_string(&mut packet.data, signature);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();

        let classes_count = read_i32(&mut data)?;
        let mut classes = Vec::with_capacity(classes_count as usize);

        for _ in 0..classes_count {
            let ref_type_tag = read_u8(&mut data)?;
            let type_id = read_u64(&mut data)?;
            let status = read_i32(&mut data)?;

            classes.push(ClassInfo {
                ref_type_tag,
                type_id,
                signature: signature.to_string(),
                status,
            });
        }

        Ok(classes)
    }

    /// Resolve a signature to the first matching loaded class, failing with
    /// `ClassNotFound` when the VM reports none.
    pub async fn class_by_signature(&self, signature: &str) -> JdwpResult<ClassInfo> {
        self.classes_by_signature(signature)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| JdwpError::ClassNotFound(signature.to_string()))
    }

    /// Create a string in the VM (VirtualMachine.CreateString command).
    /// The returned ID can be passed as a method argument.
    pub async fn create_string(&self, text: &str) -> JdwpResult<StringId> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::VIRTUAL_MACHINE,
            vm_commands::CREATE_STRING,
        );

        write_string(&mut packet.data, text);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_u64(&mut data)
    }

    /// Tell the VM the debugger is going away (VirtualMachine.Dispose).
    /// The VM cancels outstanding event requests and resumes threads itself.
    pub async fn dispose(&self) -> JdwpResult<()> {
        let id = self.next_id();
        let packet = CommandPacket::new(id, command_sets::VIRTUAL_MACHINE, vm_commands::DISPOSE);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        Ok(())
    }
}
