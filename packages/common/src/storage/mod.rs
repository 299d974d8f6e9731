mod checksum;
mod error;
mod key;
mod traits;

pub mod filesystem;

pub use checksum::Checksum;
pub use error::StorageError;
pub use key::StorageKey;
pub use traits::{BoxReader, MediaStore, StoredObject};
