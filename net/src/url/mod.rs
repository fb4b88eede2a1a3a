//! URL handling.

mod parser;

pub use parser::{Scheme, Url};
