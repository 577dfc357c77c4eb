//! # emberkv - An In-Memory Key-Value Cache
//!
//! emberkv is a small key-value cache reachable over TCP. It speaks a
//! simplified, line-oriented subset of the Redis wire protocol: clients send
//! `PING`, `ECHO`, `SET` and `GET` and get line-delimited replies back. Values
//! may carry a time-to-live; expired values become invisible immediately and
//! are reclaimed in the background.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             emberkv                              │
//! │                                                                  │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐           │
//! │  │   Server    │───>│ Connection  │───>│  Command    │           │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │           │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘           │
//! │                            │                  │                  │
//! │                            ▼                  ▼                  │
//! │                     ┌─────────────┐    ┌─────────────────────┐   │
//! │                     │   Decoder   │    │    ExpiringStore    │   │
//! │                     └─────────────┘    │  Mutex<HashMap<..>> │   │
//! │                                        └──────────▲──────────┘   │
//! │                                                   │ sweep        │
//! │                                        ┌──────────┴──────────┐   │
//! │                                        │      Reclaimer      │   │
//! │                                        │ (Background Task)   │   │
//! │                                        └─────────────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use emberkv::server::Server;
//! use emberkv::storage::ReclaimConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = Server::bind("127.0.0.1:6379", ReclaimConfig::default()).await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING` replies `+PONG`
//! - `ECHO message` replies `+message`
//! - `SET key value [PX milliseconds | EX seconds]` replies `+OK`
//! - `GET key` replies `+value`, or `$-1` if the key is missing or expired
//! - anything else replies `+OK`
//!
//! A request that does not follow the `*<argc>` / `$<len>` framing gets an
//! `-ERR` reply and the connection is closed.
//!
//! ## Module Overview
//!
//! - [`protocol`]: request decoder and reply encoding
//! - [`storage`]: the expiring store and its reclamation loop
//! - [`commands`]: command dispatch
//! - [`connection`]: per-client connection loop
//! - [`server`]: TCP listener
//! - [`config`]: command-line configuration

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{decode, Command, DecodeError, Reply};
pub use server::Server;
pub use storage::{ExpiringStore, ReclaimConfig, Reclaimer};

/// The default port (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host to bind to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of emberkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
