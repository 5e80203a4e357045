pub mod general;
pub mod review;

pub use general::CommandOutput;
pub use review::{DiffResult, ReviewOutcome, ReviewRequest, ReviewTimings, TransferMode, HEAD_REF};
