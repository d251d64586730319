pub mod backoff;
pub mod runner;

pub use backoff::Backoff;
pub use runner::{StreamTarget, Tailer, TailerError, TailerSettings, TailerStats};
