//! Subprocess lifecycle: spawning, registry bookkeeping and cancellation.

pub mod manager;
pub mod registry;

pub use manager::{
    CapturedOutput, ChildProcess, OUTPUT_MARKER, ProcessManager, QUIT_SEQUENCE, RunningProcess,
    check_executable, classify, stop_gracefully,
};
pub use registry::{ProcessControl, ProcessRegistry};
