//! Phoenix Core Library
//!
//! Low-level operations for the in-memory recovery disk image: ramdisk
//! buffer ownership, GPT structure synthesis, and FAT32 formatting with
//! contiguous file allocation. Designed to be no_std compatible.

#![no_std]

extern crate alloc;

pub mod builder;
pub mod disk;
pub mod fs;
pub mod logger;
pub mod ramdisk;
