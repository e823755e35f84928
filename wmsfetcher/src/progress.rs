/// Sink for the human-readable attempt log the planner produces while it
/// walks stores and endpoints. Line order reflects causal search order and
/// is preserved end-to-end by implementations.
pub trait ProgressReporter: Send + Sync {
    fn log(&self, message: String);
}

/// Reporter that drops everything. Useful for callers that only want the
/// final answer.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn log(&self, _message: String) {}
}
