// ThreadReference command implementations
//
// Commands for working with threads (frames, status, suspend/resume)

use crate::commands::{command_sets, thread_commands, vm_commands};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{read_i32, read_location, read_string, read_u64};
use crate::types::{FrameInfo, ThreadId};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// Raw status pair from ThreadReference.Status. `thread_status` maps to
/// [`crate::types::ThreadStatus`]; `suspend_status` bit 0 is "suspended by
/// the debugger".
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThreadStatusInfo {
    pub thread_status: i32,
    pub suspend_status: i32,
}

impl JdwpConnection {
    /// Get a thread's name (ThreadReference.Name command)
    pub async fn thread_name(&self, thread_id: ThreadId) -> JdwpResult<String> {
        let id = self.next_id();
        let mut packet =
            CommandPacket::new(id, command_sets::THREAD_REFERENCE, thread_commands::NAME);

        packet.data.put_u64(thread_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_string(&mut data)
    }

    /// Get a thread's run and suspend status (ThreadReference.Status command)
    pub async fn thread_status(&self, thread_id: ThreadId) -> JdwpResult<ThreadStatusInfo> {
        let id = self.next_id();
        let mut packet =
            CommandPacket::new(id, command_sets::THREAD_REFERENCE, thread_commands::STATUS);

        packet.data.put_u64(thread_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let thread_status = read_i32(&mut data)?;
        let suspend_status = read_i32(&mut data)?;

        Ok(ThreadStatusInfo {
            thread_status,
            suspend_status,
        })
    }

    /// How many times the thread has been suspended without a resume
    /// (ThreadReference.SuspendCount command)
    pub async fn thread_suspend_count(&self, thread_id: ThreadId) -> JdwpResult<i32> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::THREAD_REFERENCE,
            thread_commands::SUSPEND_COUNT,
        );

        packet.data.put_u64(thread_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_i32(&mut data)
    }

    /// Suspend one thread (ThreadReference.Suspend command)
    pub async fn thread_suspend(&self, thread_id: ThreadId) -> JdwpResult<()> {
        let id = self.next_id();
        let mut packet =
            CommandPacket::new(id, command_sets::THREAD_REFERENCE, thread_commands::SUSPEND);

        packet.data.put_u64(thread_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        Ok(())
    }

    /// Resume one thread (ThreadReference.Resume command)
    pub async fn thread_resume(&self, thread_id: ThreadId) -> JdwpResult<()> {
        let id = self.next_id();
        let mut packet =
            CommandPacket::new(id, command_sets::THREAD_REFERENCE, thread_commands::RESUME);

        packet.data.put_u64(thread_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        Ok(())
    }

    /// Get stack frames for a suspended thread (ThreadReference.Frames).
    /// `start_frame` 0 is the top; `length` -1 means all remaining frames.
    pub async fn frames(
        &self,
        thread_id: ThreadId,
        start_frame: i32,
        length: i32,
    ) -> JdwpResult<Vec<FrameInfo>> {
        let id = self.next_id();
        let mut packet =
            CommandPacket::new(id, command_sets::THREAD_REFERENCE, thread_commands::FRAMES);

        packet.data.put_u64(thread_id);
        packet.data.put_i32(start_frame);
        packet.data.put_i32(length);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();

        let frames_count = read_i32(&mut data)?;
        let mut frames = Vec::with_capacity(frames_count as usize);

        for _ in 0..frames_count {
            let frame_id = read_u64(&mut data)?;
            let location = read_location(&mut data)?;

            frames.push(FrameInfo { frame_id, location });
        }

        Ok(frames)
    }

    /// Get all live threads (VirtualMachine.AllThreads command)
    pub async fn all_threads(&self) -> JdwpResult<Vec<ThreadId>> {
        let id = self.next_id();
        let packet =
            CommandPacket::new(id, command_sets::VIRTUAL_MACHINE, vm_commands::ALL_THREADS);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();

        let threads_count = read_i32(&mut data)?;
        let mut threads = Vec::with_capacity(threads_count as usize);

        for _ in 0..threads_count {
            threads.push(read_u64(&mut data)?);
        }

        Ok(threads)
    }

    /// Suspend all threads (VirtualMachine.Suspend command)
    pub async fn suspend_all(&self) -> JdwpResult<()> {
        let id = self.next_id();
        let packet = CommandPacket::new(id, command_sets::VIRTUAL_MACHINE, vm_commands::SUSPEND);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        Ok(())
    }

    /// Resume all threads suspended by the debugger (VirtualMachine.Resume)
    pub async fn resume_all(&self) -> JdwpResult<()> {
        let id = self.next_id();
        let packet = CommandPacket::new(id, command_sets::VIRTUAL_MACHINE, vm_commands::RESUME);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        Ok(())
    }
}
