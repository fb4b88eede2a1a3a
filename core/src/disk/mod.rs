// Disk image structure synthesis

pub mod crc32;
pub mod gpt;
pub mod gpt_writer;

pub use gpt_writer::{write_gpt, GptError, PartitionExtent};
