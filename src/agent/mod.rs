//! The unlock agent and its client stub.
//!
//! The agent is a per-vault background process holding unwrapped level
//! keys so that only the first command of a session prompts for the
//! master password.  Clients reach it over a token-guarded unix socket
//! with length-prefixed JSON frames (`protocol`); the CLI side lives in
//! `client`, the serving side in `server`.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::AgentClient;
pub use protocol::{AgentInfo, BINARY_VERSION};
pub use server::{Agent, DEFAULT_IDLE_LOCK};
