pub mod cancel;
pub mod orchestrator;
pub mod progress;
pub mod worker;

pub use cancel::CancellationToken;
pub use orchestrator::{DiffSource, Orchestrator, ReviewBackend, RunGuard, RunState};
pub use progress::{streaming_percent, ProgressSink, ReviewEvent};
pub use worker::{ReviewHandle, ReviewWorker};
