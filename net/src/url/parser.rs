//! URL parser for HTTP/HTTPS URLs.
//!
//! The resolver uses this to vet resolved collateral locations before
//! they are handed to the transport: the scheme must be one the pinned
//! TLS channels can carry.

use alloc::string::{String, ToString};

use crate::error::{NetError, Result};

/// HTTP URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// Parsed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    pub scheme: Scheme,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
}

impl Url {
    /// Parse `scheme://host[:port][/path]`.
    ///
    /// # Errors
    ///
    /// Returns `NetError::InvalidUrl` on a missing or unknown scheme, a
    /// missing host, or an unparseable port.
    pub fn parse(url: &str) -> Result<Self> {
        let scheme_end = url.find("://").ok_or(NetError::InvalidUrl)?;
        let scheme = Scheme::parse(&url[..scheme_end]).ok_or(NetError::InvalidUrl)?;

        let rest = &url[scheme_end + 3..];
        if rest.is_empty() {
            return Err(NetError::InvalidUrl);
        }

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.rfind(':') {
            Some(idx) => {
                let port_str = &authority[idx + 1..];
                if port_str.is_empty() {
                    return Err(NetError::InvalidUrl);
                }
                let port = port_str.parse::<u16>().map_err(|_| NetError::InvalidUrl)?;
                (&authority[..idx], Some(port))
            }
            None => (authority, None),
        };

        if host.is_empty() {
            return Err(NetError::InvalidUrl);
        }

        Ok(Url {
            scheme,
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or_else(|| self.scheme.default_port())
    }

    pub fn is_https(&self) -> bool {
        self.scheme == Scheme::Https
    }
}
