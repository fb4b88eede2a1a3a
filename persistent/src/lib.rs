//! Phoenix Persistent State
//!
//! The single piece of state this system ever persists: the servicing
//! token written immediately before the running driver replaces itself
//! with a newer downloaded copy, and consumed by the first action of the
//! resumed run. The storage medium is abstracted behind [`TokenStore`]
//! (firmware variable services in production, memory in tests).

#![no_std]

extern crate alloc;

pub mod store;
pub mod token;

pub use store::{attributes, MemoryTokenStore, StoredRecord, TokenStore};
pub use token::{take_token, ServicingToken, TokenError, SERVICING_TOKEN_NAME};
