mod error;
mod format;
mod verify;

pub use error::Fat32Error;
pub use format::{format_fat32, Fat32Geometry, VOLUME_LABEL};
pub use verify::verify_fat32;
