pub mod registry;
pub mod replies;
pub mod service;
pub mod types;

pub use registry::SessionRegistry;
pub use service::{CancelOutcome, ExpireOutcome, SessionService};
pub use types::{ConversationId, RenderedDocument, Session};
