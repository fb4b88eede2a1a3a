//! HTTP request model.

mod request;

pub use request::{HttpMethod, HttpRequest};
