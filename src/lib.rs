//! trade-replay: headless trade replay and chart annotation engine.
//!
//! The crate renders nothing and owns no clock or network client. Hosts feed
//! pointer/keyboard input, elapsed time and candle fetch responses into a
//! [`ReplaySession`], and draw the backend-agnostic frames it produces.

pub mod annotation;
pub mod api;
pub mod core;
pub mod error;
pub mod extensions;
pub mod interaction;
pub mod panes;
pub mod persistence;
pub mod render;
pub mod replay;
pub mod telemetry;

pub use api::{ReplaySession, SessionConfig};
pub use error::{ReplayError, ReplayResult};
