//! The recovery run state machine.

use alloc::vec::Vec;

use phoenix_core::builder::format_single_fat32_volume;
use phoenix_core::disk::PartitionExtent;
use phoenix_core::fs::fat32_ops::FileExtent;
use phoenix_core::log_info;
use phoenix_core::ramdisk::RamdiskVolume;
use phoenix_net::dcat::{self, InventoryKind, SoftwareInventoryRecord};
use phoenix_net::download::{self, VerifyMode};
use phoenix_net::time::{Clock, Timeouts};
use phoenix_net::transport::Transport;
use phoenix_persistent::{attributes, ServicingToken, TokenStore};
use uguid::{guid, Guid};
use wimfs::{SliceSource, WimImage};

use crate::config::{RecoveryConfig, INVENTORY_PRIMARY_NAME, INVENTORY_SECONDARY_NAME};
use crate::error::RecoveryError;
use crate::extraction::extract_boot_files;
use crate::handoff::{BootHandoff, ImageLoader};
use crate::phase::{PhasePayload, ProgressSink, RecoveryPhase};
use crate::sinks::VolumeSinkPolicy;

// Fixed identifiers for the synthesized GPT; no entropy source exists
// this early in boot
const DISK_GUID: Guid = guid!("7b2a6f3e-1d54-48c9-9c07-82e5d00b13a6");
const PARTITION_GUID: Guid = guid!("e94f2c81-6a0d-45b7-b3c2-51fd08a97e44");

/// One recovery run: context object, capabilities, and the phase
/// machine. Constructed per run, destroyed at `close`.
pub struct Recovery<'caps> {
    config: RecoveryConfig,
    transport: &'caps mut dyn Transport,
    clock: &'caps dyn Clock,
    token_store: &'caps mut dyn TokenStore,

    phase: RecoveryPhase,
    busy: bool,
    configured: bool,
    volume: Option<RamdiskVolume>,
    partition: Option<PartitionExtent>,
    records: Vec<SoftwareInventoryRecord>,
    descriptors: Vec<dcat::CollateralDescriptor>,
    placed: Vec<(alloc::string::String, FileExtent)>,
    driver_image: Option<Vec<u8>>,
    extended_error: Option<RecoveryError>,
}

impl<'caps> Recovery<'caps> {
    pub fn new(
        config: RecoveryConfig,
        transport: &'caps mut dyn Transport,
        clock: &'caps dyn Clock,
        token_store: &'caps mut dyn TokenStore,
    ) -> Self {
        Self {
            config,
            transport,
            clock,
            token_store,
            phase: RecoveryPhase::Configuring,
            busy: false,
            configured: false,
            volume: None,
            partition: None,
            records: Vec::new(),
            descriptors: Vec::new(),
            placed: Vec::new(),
            driver_image: None,
            extended_error: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> RecoveryPhase {
        self.phase
    }

    /// First fault recorded during the run, surviving teardown.
    pub fn extended_error(&self) -> Option<RecoveryError> {
        self.extended_error
    }

    /// The constructed volume, while the run holds one.
    pub fn volume(&self) -> Option<&RamdiskVolume> {
        self.volume.as_ref()
    }

    /// Where each volume-placed collateral landed.
    pub fn placed_collaterals(&self) -> &[(alloc::string::String, FileExtent)] {
        &self.placed
    }

    /// Phase `Configuring`: build the volume, deposit and process the
    /// inventory blobs, and resolve the collateral set. On any failure
    /// every partially-acquired resource is released and the instance
    /// is unusable until reconfigured.
    pub fn configure(&mut self, progress: &mut dyn ProgressSink) -> Result<(), RecoveryError> {
        if self.busy || self.configured {
            return Err(RecoveryError::Busy);
        }
        self.busy = true;

        let result = self.configure_inner(progress);
        if let Err(e) = result {
            self.record_fault(e);
            self.teardown();
            self.busy = false;
            return Err(e);
        }

        self.configured = true;
        self.busy = false;
        Ok(())
    }

    fn configure_inner(&mut self, progress: &mut dyn ProgressSink) -> Result<(), RecoveryError> {
        self.enter_phase(progress, RecoveryPhase::Configuring)?;

        // Ramdisk: allocate, partition, format, verify
        let mut volume = RamdiskVolume::allocate(self.config.ramdisk_size)?;
        let (partition, _geometry) = format_single_fat32_volume(
            &mut volume,
            DISK_GUID,
            PARTITION_GUID,
            "PHOENIX RECOVERY",
        )?;
        self.volume = Some(volume);
        self.partition = Some(partition);
        log_info!("configure: recovery volume formatted");

        // Deposit locally supplied inventory blobs, then read both slots
        let local = self.config.local_inventories.clone();
        if let Some(blob) = &local.primary {
            self.token_store
                .save(INVENTORY_PRIMARY_NAME, attributes::SERVICING_TOKEN, blob)?;
        }
        if let Some(blob) = &local.secondary {
            self.token_store
                .save(INVENTORY_SECONDARY_NAME, attributes::SERVICING_TOKEN, blob)?;
        }

        self.records = self.load_inventory_records()?;
        if self.records.is_empty() {
            log_info!("configure: no usable inventory record");
            return Err(RecoveryError::NotFound);
        }

        // Resolve collaterals, newest inventory first
        let timeouts = Timeouts::from_clock(self.clock);
        self.descriptors = dcat::resolve(
            self.transport,
            self.clock,
            &timeouts,
            &self.config.service_url,
            &mut self.records,
            &self.config.collaterals,
        )
        .map_err(RecoveryError::from)?;

        // The winning record stays; the other slot's deposit is stale now
        self.delete_stale_inventory()?;

        self.enter_phase(progress, RecoveryPhase::Configured)
    }

    /// Phases `CollateralsDownloading` through `StubOsRamboot`.
    pub fn start(
        &mut self,
        progress: &mut dyn ProgressSink,
        loader: &mut dyn ImageLoader,
        handoff: &mut dyn BootHandoff,
    ) -> Result<(), RecoveryError> {
        if self.busy {
            return Err(RecoveryError::Busy);
        }
        if !self.configured {
            return Err(RecoveryError::NotConfigured);
        }
        self.busy = true;

        let result = self.start_inner(progress, loader, handoff);
        if let Err(e) = result {
            self.record_fault(e);
            self.teardown();
            self.busy = false;
            return Err(e);
        }

        self.busy = false;
        Ok(())
    }

    fn start_inner(
        &mut self,
        progress: &mut dyn ProgressSink,
        loader: &mut dyn ImageLoader,
        handoff: &mut dyn BootHandoff,
    ) -> Result<(), RecoveryError> {
        self.enter_phase(progress, RecoveryPhase::CollateralsDownloading)?;
        self.download_collaterals(progress)?;
        self.enter_phase(progress, RecoveryPhase::CollateralsDownloaded)?;

        if !self.config.boot_files.is_empty() {
            let volume = self.volume.as_mut().ok_or(RecoveryError::NotConfigured)?;
            let partition = self.partition.ok_or(RecoveryError::NotConfigured)?;
            let wim_extent = recovery_image_extent(&self.descriptors, &self.placed)
                .ok_or(RecoveryError::NotFound)?;
            let captured = extract_boot_files(
                volume,
                partition.start_lba,
                wim_extent,
                &self.config.boot_files,
            )?;
            if captured.is_some() {
                self.driver_image = captured;
            }
        }

        self.enter_phase(progress, RecoveryPhase::ServicingOperations)?;
        self.run_servicing(loader)?;

        self.enter_phase(progress, RecoveryPhase::StubOsRamboot)?;
        let volume = self.volume.as_mut().ok_or(RecoveryError::NotConfigured)?;
        volume.mark_registered();
        handoff.ramboot(volume)
    }

    /// Release the volume, transport state, and in-flight buffers. Always
    /// safe to call; never overwrites the recorded first fault.
    pub fn close(&mut self) {
        self.teardown();
        self.configured = false;
        self.busy = false;
    }

    fn teardown(&mut self) {
        self.transport.cancel();
        self.volume = None;
        self.partition = None;
        self.records.clear();
        self.descriptors.clear();
        self.placed.clear();
        self.driver_image = None;
        log_info!("recovery: teardown complete");
    }

    fn record_fault(&mut self, error: RecoveryError) {
        // First write wins; teardown noise never replaces the cause
        if self.extended_error.is_none() {
            self.extended_error = Some(error);
        }
    }

    fn enter_phase(
        &mut self,
        progress: &mut dyn ProgressSink,
        phase: RecoveryPhase,
    ) -> Result<(), RecoveryError> {
        self.phase = phase;
        log_info!("recovery: phase transition");
        progress
            .on_progress(phase, PhasePayload::None)
            .map_err(|_| RecoveryError::Aborted)
    }

    /// Parse each deposited inventory blob into a metadata query record.
    /// An unreadable blob is logged and skipped, not fatal by itself.
    fn load_inventory_records(&mut self) -> Result<Vec<SoftwareInventoryRecord>, RecoveryError> {
        let mut records = Vec::new();
        for (name, kind) in [
            (INVENTORY_SECONDARY_NAME, InventoryKind::Secondary),
            (INVENTORY_PRIMARY_NAME, InventoryKind::Primary),
        ] {
            let blob = match self.token_store.load(name)? {
                Some(record) => record.data,
                None => continue,
            };
            match inventory_payload(&blob) {
                Some(payload) => records.push(SoftwareInventoryRecord::new(kind, payload)),
                None => {
                    log_info!("configure: inventory blob unreadable, skipping");
                }
            }
        }
        Ok(records)
    }

    fn delete_stale_inventory(&mut self) -> Result<(), RecoveryError> {
        let winner = self.records.iter().find(|r| r.valid).map(|r| r.kind);
        let stale = match winner {
            Some(InventoryKind::Secondary) => INVENTORY_PRIMARY_NAME,
            Some(InventoryKind::Primary) => INVENTORY_SECONDARY_NAME,
            None => return Ok(()),
        };
        self.token_store.delete(stale)?;
        Ok(())
    }

    fn download_collaterals(
        &mut self,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), RecoveryError> {
        let volume = self.volume.as_mut().ok_or(RecoveryError::NotConfigured)?;
        let partition = self.partition.ok_or(RecoveryError::NotConfigured)?;

        let verify = if self.config.skip_hash_validation {
            VerifyMode::Skip
        } else {
            VerifyMode::Enabled
        };

        let timeouts = Timeouts::from_clock(self.clock);
        let mut policy = VolumeSinkPolicy::new(volume, partition.start_lba);
        let result = download::download_all(
            self.transport,
            self.clock,
            &timeouts,
            &self.descriptors,
            &mut policy,
            verify,
            &mut |p| progress.on_progress(RecoveryPhase::CollateralsDownloading, PhasePayload::Download(p)),
        );
        let (placed, memory) = policy.into_parts();
        result.map_err(RecoveryError::from)?;

        self.placed = placed;
        // A memory-stored collateral is an updated copy of this driver
        if let Some((_, image)) = memory.into_iter().next() {
            self.driver_image = Some(image);
        }
        Ok(())
    }

    /// Persist the continuation token and start the newer driver image.
    /// A servicing failure is logged and the run continues on the
    /// current driver; recovery itself is still achievable.
    fn run_servicing(&mut self, loader: &mut dyn ImageLoader) -> Result<(), RecoveryError> {
        let image = match self.driver_image.take() {
            Some(image) => image,
            None => return Ok(()),
        };

        let token = ServicingToken::new(
            version::MAJOR,
            version::MINOR,
            self.volume
                .as_ref()
                .map(|v| v.base_address() as u64)
                .unwrap_or(0),
        );
        token.persist(self.token_store)?;

        if loader.load_and_start(&image).is_err() {
            log_info!("servicing: updated driver failed to start, continuing");
            // The reload never happened; the token must not linger
            self.token_store
                .delete(phoenix_persistent::SERVICING_TOKEN_NAME)?;
        }
        Ok(())
    }
}

/// Version of this driver, recorded in servicing tokens.
pub mod version {
    pub const MAJOR: u16 = 0;
    pub const MINOR: u16 = 4;
}

/// Entry point for a run resumed after self-servicing: read and destroy
/// the continuation token before any other action. Returns the token
/// the prior driver left behind, if one exists and is trustworthy.
pub fn consume_servicing_token(
    store: &mut dyn TokenStore,
) -> Result<Option<ServicingToken>, RecoveryError> {
    phoenix_persistent::take_token(store).map_err(RecoveryError::from)
}

/// The recovery image is the first collateral placed on the volume.
fn recovery_image_extent(
    descriptors: &[dcat::CollateralDescriptor],
    placed: &[(alloc::string::String, FileExtent)],
) -> Option<FileExtent> {
    let target = &descriptors.iter().find(|d| !d.store_in_memory)?.target_path;
    placed
        .iter()
        .find(|(path, _)| path == target)
        .map(|(_, extent)| *extent)
}

/// Derive a metadata query payload from an inventory WIM blob.
fn inventory_payload(blob: &[u8]) -> Option<Vec<u8>> {
    let mut source = SliceSource::new(blob);
    let image = WimImage::open(&mut source).ok()?;
    let cbmr = image.cbmr()?;
    let json = alloc::format!(
        "{{\"Product\":\"{}\",\"Version\":\"{}\",\"Build\":\"{}\",\"Arch\":\"{}\"}}",
        cbmr.product,
        cbmr.version,
        cbmr.build,
        cbmr.arch
    );
    Some(json.into_bytes())
}
