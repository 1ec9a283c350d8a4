// lib95hf/src/protocol/mod.rs

pub mod commands;
pub mod parser;
pub mod reply;
pub mod result;

pub use commands::{Command, CommandKind};
pub use reply::Reply;
pub use result::{check_crc, check_reply};
