//! Command Handler Module
//!
//! Receives decoded commands, runs them against the store, and returns the
//! reply.
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │    Decoder      │  (protocol module)
//! └────────┬────────┘
//!          │ Command
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ ExpiringStore   │  (storage module)
//! └─────────────────┘
//! ```

pub mod handler;

pub use handler::CommandHandler;
