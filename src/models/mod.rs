mod cart;
mod custom_request;
mod intent;
pub mod metadata;
mod purchase;

pub use cart::*;
pub use custom_request::*;
pub use intent::*;
pub use metadata::{MetadataError, SessionMetadata};
pub use purchase::*;
