pub mod client;
pub mod invoker;
pub mod probe;
pub mod prompt;
pub mod stream;

pub use client::OllamaClient;
pub use invoker::{ReviewInvoker, ReviewReply};
pub use probe::{check_connection, ConnectionReport, ProbeKind, ProbeStatus};
