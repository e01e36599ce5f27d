//! # lumen-projector: the remote surface
//!
//! Connects to the control console, signals ready, and draws whatever
//! the latest broadcast frame says the audience should see. Keys on the
//! projector travel back to the console as back-channel commands.
//!
//! ## Layout
//!
//! - **service**: connection lifecycle, ready handshake, message loop.
//! - **view**: drawing a render state with ratatui.
//! - **config**: TOML configuration.

pub mod config;
pub mod service;
pub mod view;
