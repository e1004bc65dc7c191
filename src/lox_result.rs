use std::error::Error;

/// Evaluation results carry boxed errors so that `RuntimeError` and the
/// internal `return` signal can share one channel and be told apart by
/// downcasting at the function-call boundary.
pub type Result<T> = std::result::Result<T, Box<dyn Error>>;
