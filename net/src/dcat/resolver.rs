//! Collateral resolution against the metadata service.

use alloc::vec::Vec;

use phoenix_core::log_info;

use crate::certs::METADATA_TLS_PINS;
use crate::error::{NetError, Result};
use crate::http::{HttpMethod, HttpRequest};
use crate::time::{Clock, Timeouts};
use crate::transport::{wait_chunk, wait_ready, Chunk, Transport};
use crate::url::Url;

use super::response::parse_file_record;
use super::{CollateralDescriptor, InventoryKind, RequiredFile, SoftwareInventoryRecord};

/// Bounded retries for the metadata GET path. Content downloads are
/// never retried.
pub const METADATA_RETRY_LIMIT: u32 = 3;

/// Resolve the required collaterals, trying inventory records
/// newest-first (Secondary, then Primary). A record whose resolution
/// fails is marked invalid and skipped for the rest of the run; the
/// whole operation fails only once every record has failed.
pub fn resolve<T, C>(
    transport: &mut T,
    clock: &C,
    timeouts: &Timeouts,
    service_url: &str,
    records: &mut [SoftwareInventoryRecord],
    required: &[RequiredFile],
) -> Result<Vec<CollateralDescriptor>>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    if required.is_empty() {
        return Err(NetError::NotFound);
    }

    for kind in [InventoryKind::Secondary, InventoryKind::Primary] {
        for record in records.iter_mut().filter(|r| r.kind == kind) {
            if !record.valid {
                continue;
            }
            match resolve_record(transport, clock, timeouts, service_url, record, required) {
                Ok(descriptors) => return Ok(descriptors),
                Err(_) => {
                    log_info!("dcat: inventory record failed, trying older record");
                    record.valid = false;
                }
            }
        }
    }

    Err(NetError::NotFound)
}

fn resolve_record<T, C>(
    transport: &mut T,
    clock: &C,
    timeouts: &Timeouts,
    service_url: &str,
    record: &SoftwareInventoryRecord,
    required: &[RequiredFile],
) -> Result<Vec<CollateralDescriptor>>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    let body = fetch_metadata(transport, clock, timeouts, service_url, &record.request_payload)?;

    let mut descriptors = Vec::with_capacity(required.len());
    for file in required {
        let parsed = parse_file_record(&body, &file.file_name)?;

        // The content channel's pins only ride on TLS
        if !Url::parse(&parsed.url)?.is_https() {
            return Err(NetError::InvalidUrl);
        }

        descriptors.push(CollateralDescriptor {
            source_url: parsed.url,
            target_path: file.target_path.clone(),
            size_bytes: parsed.size,
            digest: parsed.digest,
            store_in_memory: file.store_in_memory,
        });
    }
    Ok(descriptors)
}

/// One metadata round trip, retried on `Timeout` up to
/// [`METADATA_RETRY_LIMIT`] times. Other failures propagate immediately.
fn fetch_metadata<T, C>(
    transport: &mut T,
    clock: &C,
    timeouts: &Timeouts,
    service_url: &str,
    payload: &[u8],
) -> Result<Vec<u8>>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match fetch_metadata_once(transport, clock, timeouts, service_url, payload) {
            Ok(body) => return Ok(body),
            Err(NetError::Timeout) if attempt <= METADATA_RETRY_LIMIT => {
                log_info!("dcat: metadata request timed out, retrying");
            }
            Err(e) => return Err(e),
        }
    }
}

fn fetch_metadata_once<T, C>(
    transport: &mut T,
    clock: &C,
    timeouts: &Timeouts,
    service_url: &str,
    payload: &[u8],
) -> Result<Vec<u8>>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    let request = HttpRequest::new(HttpMethod::Post, service_url, &METADATA_TLS_PINS)
        .header("Content-Type", "application/json")
        .body(payload.to_vec());

    transport.begin(&request)?;
    wait_ready(transport, clock, timeouts.metadata_request())?;

    let status = transport.status_code()?;
    if status != 200 {
        return Err(NetError::HttpStatus(status));
    }

    let mut body = Vec::new();
    if let Some(length) = transport.content_length()? {
        body.reserve(length.min(1 << 20) as usize);
    }
    loop {
        match wait_chunk(transport, clock, timeouts.metadata_request())? {
            Chunk::Data(data) => body.extend_from_slice(&data),
            Chunk::End => return Ok(body),
            // wait_chunk only resolves to Data or End
            Chunk::Pending => continue,
        }
    }
}
