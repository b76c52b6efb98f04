#![doc = include_str!("../README.md")]

mod config;
mod error;
mod job;
mod pool;
mod queue;
mod result;
mod sink;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::job::*;
pub use crate::pool::*;
pub use crate::queue::*;
pub use crate::result::*;
pub use crate::sink::{Done, Results};
// Re-exported so callers and job bodies agree on the token type.
pub use tokio_util::sync::CancellationToken;
