//! Connection Handler Module
//!
//! Manages individual client connections. Each accepted connection runs in
//! its own Tokio task and shares nothing with other connections except the
//! store.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (server.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ accept() + spawn
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ Read bytes  │───>│   Decode    │───>│  Dispatch   │      │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘      │
//! │         ▲                                     ▼             │
//! │         │                            ┌─────────────┐        │
//! │         └────────────────────────────│ Send reply  │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod handler;

pub use handler::{
    handle_connection, ConnectionError, ConnectionHandler, ConnectionStats, READ_BUFFER_SIZE,
};
