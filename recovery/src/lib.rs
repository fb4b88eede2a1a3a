//! Phoenix Recovery Orchestrator
//!
//! The top-level phase state machine of the bare-metal recovery flow:
//!
//! ```text
//! Configuring -> Configured -> CollateralsDownloading ->
//! CollateralsDownloaded -> ServicingOperations -> StubOsRamboot
//! ```
//!
//! Phases progress strictly forward; no phase is revisited within one
//! run. The orchestrator owns the ramdisk volume for the duration of a
//! run, sequences the resolver, download engine, and WIM extraction,
//! reports every transition to the caller's progress sink, and tears
//! everything down on any exit path. All state lives in one explicit
//! [`Recovery`] value constructed per run; there are no globals.

#![no_std]

extern crate alloc;

pub mod config;
pub mod error;
pub mod extraction;
pub mod handoff;
pub mod orchestrator;
pub mod phase;
pub mod sinks;

pub use config::{BootFile, InventoryBlobs, RecoveryConfig};
pub use error::RecoveryError;
pub use handoff::{BootHandoff, ImageLoader};
pub use orchestrator::{consume_servicing_token, Recovery};
pub use phase::{PhasePayload, ProgressSink, RecoveryPhase};
