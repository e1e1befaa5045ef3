//! CLI command implementations

pub mod resolve;
pub mod roots;
pub mod watch;
