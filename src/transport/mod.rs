pub mod health;
pub mod policy;
pub mod runtime;
pub mod startup;
pub mod telegram;
pub mod traits;

pub use startup::{doctor, start_bot};
pub use telegram::TelegramChannel;
pub use traits::{
    AttachmentKind, Channel, Command, EventKind, ImageAttachment, InboundEvent, MediaData,
    MessageRef,
};
