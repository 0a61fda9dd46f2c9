mod fetch_pipeline;
mod session;
mod session_config;

pub use fetch_pipeline::{FetchKind, FetchRequest, LoadState};
pub use session::{ReplaySession, SessionLifecycle};
pub use session_config::SessionConfig;
