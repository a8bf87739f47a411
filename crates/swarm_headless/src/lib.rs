//! Headless runner that feeds world snapshots to the decision engine.
//!
//! The engine itself performs no I/O. This crate owns every outer concern:
//!
//! - **Transport**: JSON lines over stdin/stdout
//! - **Configuration**: RON config files with a seed override
//! - **Verification**: parallel replays of a recorded snapshot sequence
//!
//! # Protocol
//!
//! - **stdin**: requests from the game (`tick`, `reset`, `quit`)
//! - **stdout**: responses (`ready`, `actions`, `ack`, `error`, `bye`)
//! - **stderr**: logs (human-readable)
//!
//! See [`protocol`] module for the full request/response format.
//!
//! # Example
//!
//! ```bash
//! # Play over stdin/stdout
//! cargo run -p swarm_headless -- --config bot.ron
//!
//! # Verify determinism of a recorded game
//! cargo run -p swarm_headless -- verify --script game.json --runs 8
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config_file;
pub mod protocol;
pub mod runner;
pub mod verify;

pub use config_file::ConfigFileError;
pub use protocol::{ProtocolError, Request, Response};
pub use runner::{SessionRunner, SessionSummary};
pub use verify::VerifyReport;
