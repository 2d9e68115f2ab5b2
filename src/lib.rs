// JDWP client library for Android-hosted VMs
//
// Implements the subset of the JDWP protocol needed to drive a debuggable
// Android process:
// - Connection management (handshake, framing, request/reply dispatch)
// - Breakpoint and event request operations
// - Stack and object inspection
// - Execution control (suspend/resume/step)
// - In-VM method invocation, including Runtime.exec and System.load
//
// The transport is any ordered byte stream addressed to `jdwp:<pid>`;
// with a stock Android bridge that is `adb forward tcp:<port> jdwp:<pid>`.

pub mod array;
pub mod classtype;
pub mod commands;
pub mod connection;
pub mod dispatcher;
pub mod eventrequest;
pub mod events;
pub mod method;
pub mod object;
pub mod protocol;
pub mod reader;
pub mod reftype;
pub mod session;
pub mod stackframe;
pub mod string;
pub mod thread;
pub mod transport;
pub mod types;
pub mod vm;

pub use connection::{JdwpConfig, JdwpConnection};
pub use dispatcher::WILDCARD_SUBSCRIPTION;
pub use eventrequest::{EventModifier, StepDepth, StepSize, SuspendPolicy};
pub use events::{Event, EventKind, EventNotice, EventSet};
pub use protocol::{JdwpError, JdwpResult};
pub use session::{
    Breakpoint, BreakpointHit, DebugSession, LocalVariable, ObjectField, ObjectInfo,
    SessionRegistry, ThreadInfo,
};
pub use types::{Location, TaggedObjectId, Value, ValueData};
