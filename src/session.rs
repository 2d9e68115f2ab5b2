// Debug session management
//
// A session owns one attached process: its breakpoint registry, thread
// bookkeeping, and the invocation helpers (exec, load) built on top of the
// command layer.

use crate::commands::{event_kinds, invoke_options};
use crate::connection::{JdwpConfig, JdwpConnection};
use crate::dispatcher::WILDCARD_SUBSCRIPTION;
use crate::eventrequest::{StepDepth, StepSize, SuspendPolicy};
use crate::events::{EventKind, EventNotice};
use crate::classtype::InvokeReply;
use crate::protocol::{JdwpError, JdwpResult};
use crate::stackframe::VariableSlot;
use crate::types::{
    signature_tag, tag, ArrayId, ClassId, FrameId, FrameInfo, Location, MethodId, ObjectId,
    ThreadId, Value,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A breakpoint the VM has confirmed. Entries exist only between a
/// successful EventRequest.Set and the matching Clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Breakpoint {
    pub request_id: i32,
    pub location: Location,
    pub class_signature: String,
    pub method_name: String,
    pub enabled: bool,
    pub hit_count: u32,
}

/// Snapshot of a known thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub id: ThreadId,
    pub name: String,
    pub suspended: bool,
}

/// First hit of a breakpoint set via [`DebugSession::set_breakpoint_and_wait`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BreakpointHit {
    pub request_id: i32,
    pub thread_id: ThreadId,
    pub location: Location,
}

/// One local variable with its fetched value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalVariable {
    pub name: String,
    pub signature: String,
    pub value: Value,
    pub display: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectField {
    pub name: String,
    pub signature: String,
    pub value: Value,
}

/// Instance state of an object: its runtime type and field values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub object_id: ObjectId,
    pub type_signature: String,
    pub fields: Vec<ObjectField>,
}

#[derive(Debug, Default)]
struct SessionState {
    breakpoints: HashMap<i32, Breakpoint>,
    // known thread id -> cached name
    threads: HashMap<ThreadId, Option<String>>,
    suspended_threads: HashSet<ThreadId>,
    current_thread: Option<ThreadId>,
    current_frame: Option<FrameId>,
    // request id -> subscriber; key 0 is the caller's catch-all
    subscribers: HashMap<i32, mpsc::UnboundedSender<EventNotice>>,
    // internal taps that observe every event (breakpoint waits)
    watchers: Vec<mpsc::UnboundedSender<EventNotice>>,
    vm_alive: bool,
    stopped: bool,
}

/// A debug session attached to one process.
#[derive(Debug)]
pub struct DebugSession {
    pid: u32,
    package_name: String,
    connection: Arc<JdwpConnection>,
    state: Arc<Mutex<SessionState>>,
}

impl DebugSession {
    /// Attach to the VM behind `stream` (a bridge socket already addressed
    /// to `jdwp:<pid>`).
    ///
    /// Verifies the 8-byte ID profile, starts thread bookkeeping (lifecycle
    /// event requests are best-effort), and seeds the thread set.
    pub async fn attach<S>(stream: S, pid: u32, package_name: &str) -> JdwpResult<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self::attach_with_config(stream, pid, package_name, JdwpConfig::default()).await
    }

    pub async fn attach_with_config<S>(
        stream: S,
        pid: u32,
        package_name: &str,
        config: JdwpConfig,
    ) -> JdwpResult<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        info!("attaching to pid {pid} ({package_name})");

        let connection = Arc::new(JdwpConnection::attach(stream, config).await?);
        connection.ensure_android_profile().await?;

        let state = Arc::new(Mutex::new(SessionState {
            vm_alive: true,
            ..SessionState::default()
        }));

        let events = connection.subscribe(WILDCARD_SUBSCRIPTION);
        tokio::spawn(event_pump(events, Arc::clone(&state)));

        let session = Self {
            pid,
            package_name: package_name.to_string(),
            connection,
            state,
        };

        // Keep the thread set current. A VM that refuses these still works
        // for everything else, so failure is not fatal.
        for kind in [event_kinds::THREAD_START, event_kinds::THREAD_DEATH] {
            if let Err(e) = session
                .connection
                .set_event_request(kind, SuspendPolicy::None, &[])
                .await
            {
                warn!("lifecycle event request {kind} failed, continuing: {e}");
            }
        }

        match session.connection.all_threads().await {
            Ok(thread_ids) => {
                let mut s = session.state.lock().unwrap();
                for thread_id in thread_ids {
                    s.threads.entry(thread_id).or_insert(None);
                }
            }
            Err(e) => warn!("could not seed thread list: {e}"),
        }

        Ok(session)
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// The raw command-layer connection, for operations the facade does not
    /// wrap.
    pub fn connection(&self) -> &JdwpConnection {
        &self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    fn ensure_running(&self) -> JdwpResult<()> {
        let s = self.state.lock().unwrap();
        if s.stopped || !s.vm_alive {
            return Err(JdwpError::Disconnected);
        }
        drop(s);
        if !self.connection.is_connected() {
            return Err(JdwpError::Disconnected);
        }
        Ok(())
    }

    // ---- breakpoints -----------------------------------------------------

    /// Set a breakpoint at the entry of the named method (suspend-all).
    /// Overloads resolve to the first method the VM lists with that name;
    /// use [`Self::method_id`] with a full signature to pick one exactly.
    pub async fn set_breakpoint(
        &self,
        class_signature: &str,
        method_name: &str,
    ) -> JdwpResult<i32> {
        self.ensure_running()?;

        let location = self
            .resolve_method_entry(class_signature, method_name)
            .await?;
        let request_id = self
            .connection
            .set_breakpoint_at(location, SuspendPolicy::All)
            .await?;

        // registry entry only once the VM has confirmed the request
        let mut s = self.state.lock().unwrap();
        s.breakpoints.insert(
            request_id,
            Breakpoint {
                request_id,
                location,
                class_signature: class_signature.to_string(),
                method_name: method_name.to_string(),
                enabled: true,
                hit_count: 0,
            },
        );
        drop(s);

        info!("breakpoint {request_id} set at {class_signature} {method_name}");
        Ok(request_id)
    }

    /// Set a breakpoint and block until a thread hits it. The hitting
    /// thread is left suspended, ready for method invocation.
    pub async fn set_breakpoint_and_wait(
        &self,
        class_signature: &str,
        method_name: &str,
    ) -> JdwpResult<BreakpointHit> {
        // Tap the event stream before Set so the first hit cannot slip
        // through between the reply and the subscription.
        let mut events = self.watch();

        let request_id = self.set_breakpoint(class_signature, method_name).await?;

        loop {
            let Some(notice) = events.recv().await else {
                return Err(JdwpError::Disconnected);
            };
            if notice.event.request_id != request_id {
                continue;
            }
            if let EventKind::Breakpoint { thread, location } = notice.event.kind {
                debug!("breakpoint {request_id} hit on thread {thread:#x}");
                return Ok(BreakpointHit {
                    request_id,
                    thread_id: thread,
                    location,
                });
            }
        }
    }

    /// Remove a breakpoint. The registry entry goes away only after the VM
    /// confirms the clear.
    pub async fn clear_breakpoint(&self, request_id: i32) -> JdwpResult<()> {
        self.connection
            .clear_event_request(event_kinds::BREAKPOINT, request_id)
            .await?;

        self.state.lock().unwrap().breakpoints.remove(&request_id);
        info!("breakpoint {request_id} cleared");
        Ok(())
    }

    /// Current breakpoint registry, hit counts included.
    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        self.state
            .lock()
            .unwrap()
            .breakpoints
            .values()
            .cloned()
            .collect()
    }

    // ---- threads ---------------------------------------------------------

    /// Known threads with names (fetched lazily) and suspension state.
    pub async fn threads(&self) -> JdwpResult<Vec<ThreadInfo>> {
        let thread_ids: Vec<ThreadId> = {
            let s = self.state.lock().unwrap();
            s.threads.keys().copied().collect()
        };

        let mut infos = Vec::with_capacity(thread_ids.len());
        for thread_id in thread_ids {
            let cached = {
                let s = self.state.lock().unwrap();
                s.threads.get(&thread_id).cloned().flatten()
            };

            let name = match cached {
                Some(name) => name,
                None => match self.connection.thread_name(thread_id).await {
                    Ok(name) => {
                        let mut s = self.state.lock().unwrap();
                        s.threads.insert(thread_id, Some(name.clone()));
                        name
                    }
                    Err(e) => {
                        // thread may have died since we learned its id
                        debug!("could not name thread {thread_id:#x}: {e}");
                        continue;
                    }
                },
            };

            let suspended = self
                .state
                .lock()
                .unwrap()
                .suspended_threads
                .contains(&thread_id);

            infos.push(ThreadInfo {
                id: thread_id,
                name,
                suspended,
            });
        }

        Ok(infos)
    }

    /// Suspend one thread; the suspended set is updated only after the VM
    /// confirms.
    pub async fn suspend_thread(&self, thread_id: ThreadId) -> JdwpResult<()> {
        self.connection.thread_suspend(thread_id).await?;
        self.state
            .lock()
            .unwrap()
            .suspended_threads
            .insert(thread_id);
        Ok(())
    }

    pub async fn resume_thread(&self, thread_id: ThreadId) -> JdwpResult<()> {
        self.connection.thread_resume(thread_id).await?;

        let mut s = self.state.lock().unwrap();
        s.suspended_threads.remove(&thread_id);
        if s.current_thread == Some(thread_id) {
            s.current_thread = None;
            s.current_frame = None;
        }
        Ok(())
    }

    /// Resume every thread the debugger suspended (VirtualMachine.Resume).
    pub async fn resume(&self) -> JdwpResult<()> {
        self.connection.resume_all().await?;

        let mut s = self.state.lock().unwrap();
        s.suspended_threads.clear();
        s.current_thread = None;
        s.current_frame = None;
        Ok(())
    }

    /// Single-step a suspended thread. Registers a one-shot step request and
    /// resumes the thread; the step event arrives through the event stream.
    pub async fn step_thread(
        &self,
        thread_id: ThreadId,
        size: StepSize,
        depth: StepDepth,
    ) -> JdwpResult<i32> {
        self.ensure_running()?;
        let request_id = self
            .connection
            .set_single_step(thread_id, size, depth)
            .await?;
        self.resume_thread(thread_id).await?;
        Ok(request_id)
    }

    /// Stack frames of a suspended thread, top first.
    pub async fn stack_frames(&self, thread_id: ThreadId) -> JdwpResult<Vec<FrameInfo>> {
        let frames = self.connection.frames(thread_id, 0, -1).await?;

        let mut s = self.state.lock().unwrap();
        if s.current_thread == Some(thread_id) {
            s.current_frame = frames.first().map(|f| f.frame_id);
        }
        drop(s);

        Ok(frames)
    }

    // ---- inspection ------------------------------------------------------

    /// Fetch the local variables visible in a frame.
    ///
    /// The frame's location supplies the method whose variable table names
    /// the slots. Slots the VM rejects at the current pc are skipped.
    pub async fn local_variables(
        &self,
        thread_id: ThreadId,
        frame_id: FrameId,
    ) -> JdwpResult<Vec<LocalVariable>> {
        let frames = self.connection.frames(thread_id, 0, -1).await?;
        let frame = frames
            .iter()
            .find(|f| f.frame_id == frame_id)
            .ok_or(JdwpError::FrameNotFound(frame_id))?;

        let table = self
            .connection
            .variable_table(frame.location.class_id, frame.location.method_id)
            .await?;

        let mut locals = Vec::with_capacity(table.variables.len());
        for variable in &table.variables {
            let sig_tag = match signature_tag(&variable.signature) {
                Ok(t) => t,
                Err(e) => {
                    warn!("variable {} has odd signature: {e}", variable.name);
                    continue;
                }
            };

            let slot = VariableSlot {
                slot: variable.slot as i32,
                sig_tag,
            };
            match self
                .connection
                .frame_get_values(thread_id, frame_id, &[slot])
                .await
            {
                Ok(values) => {
                    let Some(value) = values.into_iter().next() else {
                        continue;
                    };
                    let display = self.render_value(&value).await;
                    locals.push(LocalVariable {
                        name: variable.name.clone(),
                        signature: variable.signature.clone(),
                        value,
                        display,
                    });
                }
                Err(e) => {
                    debug!(
                        "variable {} (slot {}) unavailable here: {e}",
                        variable.name, variable.slot
                    );
                }
            }
        }

        Ok(locals)
    }

    /// Human-readable rendering: strings are fetched, arrays summarized,
    /// primitives formatted, other references left as opaque IDs.
    async fn render_value(&self, value: &Value) -> String {
        match value.tag {
            tag::STRING => match value.as_object_id() {
                Some(0) | None => "null".to_string(),
                Some(string_id) => match self.connection.string_value(string_id).await {
                    Ok(text) => format!("\"{text}\""),
                    Err(e) => {
                        debug!("could not fetch string {string_id:#x}: {e}");
                        value.format()
                    }
                },
            },
            tag::ARRAY => match value.as_object_id() {
                Some(0) | None => "null".to_string(),
                Some(array_id) => match self.connection.array_length(array_id).await {
                    Ok(length) => format!("array[{length}] @{array_id:x}"),
                    Err(e) => {
                        debug!("could not size array {array_id:#x}: {e}");
                        value.format()
                    }
                },
            },
            _ => value.format(),
        }
    }

    /// Runtime type and instance fields of an object.
    pub async fn inspect_object(&self, object_id: ObjectId) -> JdwpResult<ObjectInfo> {
        let (_ref_type_tag, ref_type_id) =
            self.connection.object_reference_type(object_id).await?;
        let type_signature = self.connection.type_signature(ref_type_id).await?;

        let fields = self.connection.fields(ref_type_id).await?;
        let instance_fields: Vec<_> = fields.into_iter().filter(|f| !f.is_static()).collect();

        let values = if instance_fields.is_empty() {
            Vec::new()
        } else {
            let field_ids: Vec<_> = instance_fields.iter().map(|f| f.field_id).collect();
            self.connection
                .object_get_values(object_id, &field_ids)
                .await?
        };

        let fields = instance_fields
            .into_iter()
            .zip(values)
            .map(|(field, value)| ObjectField {
                name: field.name,
                signature: field.signature,
                value,
            })
            .collect();

        Ok(ObjectInfo {
            object_id,
            type_signature,
            fields,
        })
    }

    /// Array elements, lazily: `count` of `None` means through the end.
    pub async fn array_values(
        &self,
        array_id: ArrayId,
        first_index: i32,
        count: Option<i32>,
    ) -> JdwpResult<Vec<Value>> {
        let length = self.connection.array_length(array_id).await?;
        let first_index = first_index.max(0);
        let remaining = (length - first_index).max(0);
        let count = count.map_or(remaining, |c| c.clamp(0, remaining));

        if count == 0 {
            return Ok(Vec::new());
        }
        self.connection
            .array_get_values(array_id, first_index, count)
            .await
    }

    // ---- method resolution ----------------------------------------------

    /// Exact-match method lookup by name and JNI signature.
    pub async fn method_id(
        &self,
        class_id: ClassId,
        name: &str,
        signature: &str,
    ) -> JdwpResult<MethodId> {
        self.find_method(class_id, &format!("{class_id:#x}"), name, signature)
            .await
    }

    /// Lookup from a combined descriptor like `exec(Ljava/lang/String;)Ljava/lang/Process;`,
    /// split at the first parenthesis.
    pub async fn method_id_from_descriptor(
        &self,
        class_id: ClassId,
        descriptor: &str,
    ) -> JdwpResult<MethodId> {
        let open = descriptor.find('(').ok_or_else(|| {
            JdwpError::MethodNotFound(format!("{class_id:#x}"), descriptor.to_string())
        })?;
        self.method_id(class_id, &descriptor[..open], &descriptor[open..])
            .await
    }

    async fn find_method(
        &self,
        class_id: ClassId,
        class_display: &str,
        name: &str,
        signature: &str,
    ) -> JdwpResult<MethodId> {
        let methods = self.connection.methods(class_id).await?;
        methods
            .iter()
            .find(|m| m.name == name && m.signature == signature)
            .map(|m| m.method_id)
            .ok_or_else(|| {
                JdwpError::MethodNotFound(class_display.to_string(), format!("{name}{signature}"))
            })
    }

    async fn resolve_method_entry(
        &self,
        class_signature: &str,
        method_name: &str,
    ) -> JdwpResult<Location> {
        let class = self.connection.class_by_signature(class_signature).await?;
        let methods = self.connection.methods(class.type_id).await?;

        let method = methods
            .iter()
            .find(|m| m.name == method_name)
            .ok_or_else(|| {
                JdwpError::MethodNotFound(class_signature.to_string(), method_name.to_string())
            })?;

        Ok(Location::method_entry(class.type_id, method.method_id))
    }

    // ---- in-VM invocation ------------------------------------------------

    /// Run an OS command inside the debugged process via
    /// `Runtime.getRuntime().exec(command).waitFor()`, returning the child's
    /// exit code.
    ///
    /// Needs a thread suspended by an event (a fresh breakpoint hit works);
    /// with `thread` of `None` any suspended thread is used. The debugged
    /// thread stays busy until the child exits; the dispatcher does not.
    pub async fn exec(&self, thread: Option<ThreadId>, command: &str) -> JdwpResult<i32> {
        self.ensure_running()?;
        let thread_id = self.invocation_thread(thread)?;
        info!("exec on thread {thread_id:#x}: {command}");

        let runtime_class = self
            .connection
            .class_by_signature("Ljava/lang/Runtime;")
            .await?;
        let get_runtime = self
            .find_method(
                runtime_class.type_id,
                "Ljava/lang/Runtime;",
                "getRuntime",
                "()Ljava/lang/Runtime;",
            )
            .await?;
        let reply = self
            .connection
            .class_invoke_method(
                runtime_class.type_id,
                thread_id,
                get_runtime,
                &[],
                invoke_options::NONE,
            )
            .await?;
        let runtime = unwrap_object(reply)?;

        let command_string = self.connection.create_string(command).await?;

        let exec_method = self
            .find_method(
                runtime_class.type_id,
                "Ljava/lang/Runtime;",
                "exec",
                "(Ljava/lang/String;)Ljava/lang/Process;",
            )
            .await?;
        let reply = self
            .connection
            .object_invoke_method(
                runtime,
                thread_id,
                runtime_class.type_id,
                exec_method,
                &[Value::string(command_string)],
                invoke_options::NONE,
            )
            .await?;
        let process = unwrap_object(reply)?;

        let process_class = self
            .connection
            .class_by_signature("Ljava/lang/Process;")
            .await?;
        let wait_for = self
            .find_method(
                process_class.type_id,
                "Ljava/lang/Process;",
                "waitFor",
                "()I",
            )
            .await?;
        let reply = self
            .connection
            .object_invoke_method(
                process,
                thread_id,
                process_class.type_id,
                wait_for,
                &[],
                invoke_options::NONE,
            )
            .await?;

        if reply.threw() {
            return Err(JdwpError::InvokeException(reply.exception.object_id));
        }
        let exit_code = reply.value.expect_int()?;
        info!("exec finished with exit code {exit_code}");
        Ok(exit_code)
    }

    /// Load a native library inside the debugged process via the static
    /// `System.load(absolutePath)`. Same thread precondition as [`Self::exec`].
    pub async fn load_library(
        &self,
        thread: Option<ThreadId>,
        absolute_path: &str,
    ) -> JdwpResult<()> {
        self.ensure_running()?;
        let thread_id = self.invocation_thread(thread)?;
        info!("loading library on thread {thread_id:#x}: {absolute_path}");

        let system_class = self
            .connection
            .class_by_signature("Ljava/lang/System;")
            .await?;
        let load_method = self
            .find_method(
                system_class.type_id,
                "Ljava/lang/System;",
                "load",
                "(Ljava/lang/String;)V",
            )
            .await?;

        let path_string = self.connection.create_string(absolute_path).await?;

        let reply = self
            .connection
            .class_invoke_method(
                system_class.type_id,
                thread_id,
                load_method,
                &[Value::string(path_string)],
                invoke_options::NONE,
            )
            .await?;

        if reply.threw() {
            return Err(JdwpError::InvokeException(reply.exception.object_id));
        }
        Ok(())
    }

    fn invocation_thread(&self, requested: Option<ThreadId>) -> JdwpResult<ThreadId> {
        if let Some(thread_id) = requested {
            return Ok(thread_id);
        }
        let s = self.state.lock().unwrap();
        s.current_thread
            .filter(|t| s.suspended_threads.contains(t))
            .or_else(|| s.suspended_threads.iter().next().copied())
            .ok_or(JdwpError::NoThreadAvailable)
    }

    // ---- eventing --------------------------------------------------------

    /// Receive events for one request ID; [`WILDCARD_SUBSCRIPTION`] (0)
    /// catches everything without a specific subscriber. A new subscription
    /// under the same key replaces the old one.
    pub fn on(&self, request_id: i32) -> mpsc::UnboundedReceiver<EventNotice> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state
            .lock()
            .unwrap()
            .subscribers
            .insert(request_id, tx);
        rx
    }

    pub fn off(&self, request_id: i32) {
        self.state.lock().unwrap().subscribers.remove(&request_id);
    }

    /// All session events, regardless of subscribers.
    pub fn events(&self) -> mpsc::UnboundedReceiver<EventNotice> {
        self.on(WILDCARD_SUBSCRIPTION)
    }

    /// Internal tap over the full event stream, independent of the
    /// subscriber registry.
    fn watch(&self) -> mpsc::UnboundedReceiver<EventNotice> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().unwrap().watchers.push(tx);
        rx
    }

    // ---- teardown --------------------------------------------------------

    /// Stop debugging: clear breakpoints, resume what we suspended, and
    /// close the transport. Idempotent; failures past the first step are
    /// logged, not returned.
    pub async fn stop(&self) -> JdwpResult<()> {
        let (breakpoints, suspended) = {
            let mut s = self.state.lock().unwrap();
            if s.stopped {
                return Ok(());
            }
            s.stopped = true;
            (
                s.breakpoints.drain().map(|(id, _)| id).collect::<Vec<_>>(),
                s.suspended_threads.drain().collect::<Vec<_>>(),
            )
        };

        info!("stopping session for pid {}", self.pid);

        if self.connection.is_connected() {
            for request_id in breakpoints {
                if let Err(e) = self
                    .connection
                    .clear_event_request(event_kinds::BREAKPOINT, request_id)
                    .await
                {
                    warn!("failed to clear breakpoint {request_id}: {e}");
                }
            }

            for thread_id in suspended {
                if let Err(e) = self.connection.thread_resume(thread_id).await {
                    warn!("failed to resume thread {thread_id:#x}: {e}");
                }
            }

            if let Err(e) = self.connection.dispose().await {
                debug!("dispose failed: {e}");
            }
        }

        self.connection.close();
        Ok(())
    }
}

fn unwrap_object(reply: InvokeReply) -> JdwpResult<ObjectId> {
    if reply.threw() {
        return Err(JdwpError::InvokeException(reply.exception.object_id));
    }
    reply.value.expect_object()
}

/// Wildcard consumer of the dispatcher's event stream: updates session
/// state, then fans out to session-level subscribers and watchers.
async fn event_pump(
    mut events: mpsc::UnboundedReceiver<EventNotice>,
    state: Arc<Mutex<SessionState>>,
) {
    while let Some(notice) = events.recv().await {
        update_state(&state, &notice);
        route(&state, notice);
    }

    debug!("event pump ended");
    let mut s = state.lock().unwrap();
    s.vm_alive = false;
    // dropping the senders ends every session-level receiver
    s.subscribers.clear();
    s.watchers.clear();
}

fn update_state(state: &Mutex<SessionState>, notice: &EventNotice) {
    let mut s = state.lock().unwrap();
    match &notice.event.kind {
        EventKind::ThreadStart { thread } => {
            s.threads.entry(*thread).or_insert(None);
        }
        EventKind::ThreadDeath { thread } => {
            s.threads.remove(thread);
            s.suspended_threads.remove(thread);
            if s.current_thread == Some(*thread) {
                s.current_thread = None;
                s.current_frame = None;
            }
        }
        EventKind::VmDeath => {
            info!("VM died");
            s.vm_alive = false;
        }
        EventKind::Breakpoint { thread, .. } => {
            if let Some(breakpoint) = s.breakpoints.get_mut(&notice.event.request_id) {
                breakpoint.hit_count += 1;
            }
            s.threads.entry(*thread).or_insert(None);
            if notice.suspend_policy != SuspendPolicy::None as u8 {
                s.suspended_threads.insert(*thread);
                s.current_thread = Some(*thread);
            }
        }
        EventKind::SingleStep { thread, .. } => {
            s.threads.entry(*thread).or_insert(None);
            if notice.suspend_policy != SuspendPolicy::None as u8 {
                s.suspended_threads.insert(*thread);
                s.current_thread = Some(*thread);
            }
        }
        _ => {}
    }
}

fn route(state: &Mutex<SessionState>, notice: EventNotice) {
    let mut s = state.lock().unwrap();

    // internal watchers see everything; prune the ones that hung up
    s.watchers.retain(|w| w.send(notice.clone()).is_ok());

    let request_id = notice.event.request_id;
    let notice = match s.subscribers.get(&request_id) {
        Some(tx) => match tx.send(notice) {
            Ok(()) => return,
            Err(rejected) => rejected.0,
        },
        None => notice,
    };

    if request_id != WILDCARD_SUBSCRIPTION {
        if let Some(tx) = s.subscribers.get(&WILDCARD_SUBSCRIPTION) {
            if tx.send(notice).is_ok() {
                return;
            }
        }
    }

    debug!("no session subscriber for request id {request_id}");
}

/// One live session per PID.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<u32, Arc<DebugSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach and register a session, refusing a second attach to the same
    /// PID.
    pub async fn start_debugging<S>(
        &self,
        stream: S,
        pid: u32,
        package_name: &str,
    ) -> JdwpResult<Arc<DebugSession>>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        if self.sessions.lock().unwrap().contains_key(&pid) {
            return Err(JdwpError::DuplicateSession(pid));
        }

        let session = Arc::new(DebugSession::attach(stream, pid, package_name).await?);
        self.sessions
            .lock()
            .unwrap()
            .insert(pid, Arc::clone(&session));
        Ok(session)
    }

    /// Stop and deregister. Unknown PIDs are a no-op, so calling twice is
    /// safe.
    pub async fn stop_debugging(&self, pid: u32) -> JdwpResult<()> {
        let session = self.sessions.lock().unwrap().remove(&pid);
        match session {
            Some(session) => session.stop().await,
            None => Ok(()),
        }
    }

    pub fn get(&self, pid: u32) -> Option<Arc<DebugSession>> {
        self.sessions.lock().unwrap().get(&pid).cloned()
    }
}
