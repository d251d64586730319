pub mod cli;
pub mod config;
pub mod sink;
pub mod source;
pub mod storage;
pub mod supervisor;
pub mod tailer;
