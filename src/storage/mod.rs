pub mod local;
pub mod traits;

pub use local::LocalBlobStore;
pub use traits::{BlobStore, FileRef};
