use crate::token::Token;

use gc::Gc;
use thiserror::Error;

/// Aborts the current run. `token` locates the operator or identifier the
/// evaluator was looking at when the error fired.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub token: Gc<Token>,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: Gc<Token>, message: &str) -> Self {
        Self {
            token,
            message: message.to_owned(),
        }
    }
}
