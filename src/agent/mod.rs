//! The caching agent and its client.
//!
//! - `protocol`: request/response messages and line framing
//! - `server`: the long-lived process holding the unlocked vault
//! - `client`: connecting, spawning and stopping the agent
//! - `launcher`: how a new agent process is started

pub mod client;
pub mod launcher;
pub mod protocol;
pub mod server;

pub use client::{Connection, ConnectionManager};
pub use launcher::{DaemonLauncher, SelfExecLauncher, RUN_SERVER_COMMAND};
pub use protocol::{Request, Response};
