//! Event dispatch: routes inbound events to the session pipelines.
//!
//! Events of one conversation run strictly in arrival order on that
//! conversation's lane; lanes of different conversations run concurrently.

pub mod handler;
pub mod lanes;
pub mod reaper;

pub use handler::handle_event;
pub use lanes::Dispatcher;
pub use reaper::spawn_session_reaper;
