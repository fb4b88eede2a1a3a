//! Host capabilities the orchestrator hands control to.

use phoenix_core::ramdisk::RamdiskVolume;

use crate::error::RecoveryError;

/// Loads and starts a newer copy of this driver during servicing.
pub trait ImageLoader {
    /// Load and start the image. In production the new image takes over
    /// and resumes the run via the persisted servicing token.
    fn load_and_start(&mut self, image: &[u8]) -> Result<(), RecoveryError>;
}

/// Boots the constructed recovery volume.
pub trait BootHandoff {
    /// Hand control to the volume's boot loader. On real firmware a
    /// successful handoff does not return; a test double may return
    /// `Ok` to let the caller observe the terminal phase.
    fn ramboot(&mut self, volume: &mut RamdiskVolume) -> Result<(), RecoveryError>;
}
