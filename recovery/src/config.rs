//! Per-run recovery configuration.

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use phoenix_net::dcat::RequiredFile;

/// Store names the inventory blobs are deposited under.
pub const INVENTORY_PRIMARY_NAME: &str = "PhoenixInventoryPrimary";
pub const INVENTORY_SECONDARY_NAME: &str = "PhoenixInventorySecondary";

/// One file pulled out of the recovery image after download.
#[derive(Debug, Clone)]
pub struct BootFile {
    /// Catalog path inside the WIM.
    pub wim_path: String,
    /// Destination path on the recovery volume. Ignored when
    /// `servicing` is set.
    pub target_path: String,
    /// A missing critical file aborts the run; a missing non-critical
    /// file is logged and skipped.
    pub critical: bool,
    /// Captured into memory as the updated self-driver instead of being
    /// placed on the volume.
    pub servicing: bool,
}

impl BootFile {
    pub fn new(wim_path: &str, target_path: &str, critical: bool) -> Self {
        Self {
            wim_path: wim_path.to_string(),
            target_path: target_path.to_string(),
            critical,
            servicing: false,
        }
    }

    pub fn servicing_image(wim_path: &str) -> Self {
        Self {
            wim_path: wim_path.to_string(),
            target_path: String::new(),
            critical: false,
            servicing: true,
        }
    }
}

/// Locally supplied inventory blobs, deposited into persistent storage
/// at configure time before processing.
#[derive(Debug, Clone, Default)]
pub struct InventoryBlobs {
    pub primary: Option<Vec<u8>>,
    pub secondary: Option<Vec<u8>>,
}

/// Everything one run needs, owned by the caller and handed to
/// [`crate::Recovery::new`]. No global state backs any of this.
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Metadata-service endpoint.
    pub service_url: String,
    /// Ramdisk size in bytes; must clear the FAT32 geometry floor.
    pub ramdisk_size: u64,
    /// Accept content whose digest check was skipped. Caller-visible
    /// configuration, never a silent fallback; every skip is logged.
    pub skip_hash_validation: bool,
    /// Collaterals the resolver must locate, in download order. The
    /// first entry not stored in memory is the recovery image the boot
    /// files are extracted from.
    pub collaterals: Vec<RequiredFile>,
    /// Files extracted from the recovery image. Empty disables the
    /// extraction step entirely.
    pub boot_files: Vec<BootFile>,
    /// Inventory blobs supplied by the caller for this run.
    pub local_inventories: InventoryBlobs,
}

impl RecoveryConfig {
    /// Configuration with the standard collateral and boot-file tables.
    pub fn new(service_url: &str, ramdisk_size: u64) -> Self {
        Self {
            service_url: service_url.to_string(),
            ramdisk_size,
            skip_hash_validation: false,
            collaterals: default_collaterals(),
            boot_files: default_boot_files(),
            local_inventories: InventoryBlobs::default(),
        }
    }
}

/// The one collateral every recovery needs: the recovery OS image.
pub fn default_collaterals() -> Vec<RequiredFile> {
    vec![RequiredFile {
        file_name: "winre.wim".to_string(),
        target_path: "/sources/recovery.wim".to_string(),
        store_in_memory: false,
    }]
}

/// The fixed boot-critical set pulled from the recovery image, plus the
/// optional updated copy of this driver.
pub fn default_boot_files() -> Vec<BootFile> {
    vec![
        BootFile::new("\\sources\\boot.sdi", "/boot.sdi", true),
        BootFile::new("\\Windows\\Boot\\EFI\\bootmgfw.efi", "/efi/boot/bootx64.efi", true),
        BootFile::new("\\Windows\\Boot\\DVD\\EFI\\BCD", "/efi/boot/bcd", true),
        BootFile::servicing_image("\\Windows\\Boot\\EFI\\phoenixbmr.efi"),
    ]
}
