//! # lumen-control: operator console
//!
//! Terminal console for the operator. It owns the presentation engine,
//! opens the projector surface and shows what the audience sees.
//!
//! ## Layout
//!
//! - **app**: console state, completion and drawing (ratatui).
//! - **control**: the engine task; commands, back-channel, auto-advance.
//! - **surface**: launching and accepting the projector.
//! - **config**: TOML configuration.

pub mod app;
pub mod config;
pub mod control;
pub mod surface;

pub use app::{App, ControlEvent, UiEvent};
pub use control::Controller;
