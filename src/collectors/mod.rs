pub mod arcconf;
pub mod host;
pub mod lsblk;
pub mod megacli;
pub mod text;

use crate::executor::ExecutionError;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Failed to parse output: {0}")]
pub struct ParseError(pub String);

/// Failure while running or reading a vendor tool.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
