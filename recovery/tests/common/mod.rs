//! Shared fixtures for orchestrator tests: a WIM container builder,
//! recording progress sink, and loader/handoff doubles.

use base64::Engine;
use phoenix_net::download::DownloadProgress;
use phoenix_net::verify::ContentVerifier;
use phoenix_net::CallbackAbort;
use phoenix_recovery::{PhasePayload, ProgressSink, RecoveryError, RecoveryPhase};

/// Minimal WIM container: header + payloads + UTF-8 XML catalog.
pub struct WimBuilder {
    files: Vec<(String, Vec<u8>)>,
    cbmr: Option<[String; 4]>,
}

impl WimBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            cbmr: None,
        }
    }

    pub fn add_file(mut self, path: &str, content: &[u8]) -> Self {
        self.files.push((path.to_string(), content.to_vec()));
        self
    }

    pub fn with_cbmr(mut self, product: &str, version: &str, build: &str, arch: &str) -> Self {
        self.cbmr = Some([
            product.to_string(),
            version.to_string(),
            build.to_string(),
            arch.to_string(),
        ]);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut data = vec![0u8; 208];
        let mut placed = Vec::new();
        for (path, content) in &self.files {
            placed.push((path.clone(), data.len() as u64, content.len() as u64));
            data.extend_from_slice(content);
        }

        let mut xml = String::from("<WIM><IMAGE><NAME>Recovery</NAME>");
        if !self.files.is_empty() {
            xml.push_str("<RESOURCES>");
            for (path, offset, size) in &placed {
                xml.push_str(&format!(
                    "<FILE><PATH>{}</PATH><OFFSET>{:X}</OFFSET><SIZE>{:X}</SIZE></FILE>",
                    path, offset, size
                ));
            }
            xml.push_str("</RESOURCES>");
        }
        xml.push_str("</IMAGE>");
        if let Some([product, version, build, arch]) = &self.cbmr {
            xml.push_str(&format!(
                "<CBMR><PRODUCT>{}</PRODUCT><VERSION>{}</VERSION><BUILD>{}</BUILD><ARCH>{}</ARCH></CBMR>",
                product, version, build, arch
            ));
        }
        xml.push_str("</WIM>");

        let xml_offset = data.len() as u64;
        let xml_bytes = xml.into_bytes();
        let xml_size = xml_bytes.len() as u64;
        data.extend_from_slice(&xml_bytes);

        data[0..8].copy_from_slice(b"MSWIM\x00\x00\x00");
        data[8..12].copy_from_slice(&208u32.to_le_bytes());
        data[12..16].copy_from_slice(&0x0000_000Eu32.to_le_bytes());
        data[44..48].copy_from_slice(&1u32.to_le_bytes());
        data[0x48..0x50].copy_from_slice(&xml_size.to_le_bytes());
        data[0x50..0x58].copy_from_slice(&xml_offset.to_le_bytes());
        // No integrity table or crypt hash in test containers
        data
    }
}

/// SHA-256 of `data`.
pub fn digest_of(data: &[u8]) -> [u8; 32] {
    let mut verifier = ContentVerifier::new();
    verifier.update(data);
    verifier.finalize()
}

/// Base64 digest field value for `data`.
pub fn digest_b64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(digest_of(data))
}

/// DCAT response body listing `(file_name, url, payload)` entries.
pub fn metadata_body(entries: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = String::from("{\"Files\":[");
    for (i, (name, url, payload)) in entries.iter().enumerate() {
        if i > 0 {
            body.push(',');
        }
        body.push_str(&format!(
            "{{\"FileName\":\"{}\",\"Size\":{},\"Digest\":\"{}\",\"Url\":\"{}\"}}",
            name,
            payload.len(),
            digest_b64(payload),
            url
        ));
    }
    body.push_str("]}");
    body.into_bytes()
}

/// Progress sink recording every report, optionally aborting when a
/// download report for a given collateral arrives.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<(RecoveryPhase, Option<DownloadProgress>)>,
    pub abort_on_collateral: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort_on(collateral_index: usize) -> Self {
        Self {
            events: Vec::new(),
            abort_on_collateral: Some(collateral_index),
        }
    }

    pub fn phases(&self) -> Vec<RecoveryPhase> {
        let mut phases: Vec<RecoveryPhase> = Vec::new();
        for (phase, _) in &self.events {
            if phases.last() != Some(phase) {
                phases.push(*phase);
            }
        }
        phases
    }
}

impl ProgressSink for RecordingSink {
    fn on_progress(
        &mut self,
        phase: RecoveryPhase,
        payload: PhasePayload<'_>,
    ) -> Result<(), CallbackAbort> {
        let download = match payload {
            PhasePayload::Download(p) => Some(*p),
            PhasePayload::None => None,
        };
        self.events.push((phase, download));

        if let (Some(limit), Some(p)) = (self.abort_on_collateral, download) {
            if p.collateral_index == limit {
                return Err(CallbackAbort);
            }
        }
        Ok(())
    }
}

/// Read-only block view over a snapshot of the finished volume, for
/// inspecting the filesystem the orchestrator produced.
pub struct MemoryBlockIo {
    pub data: Vec<u8>,
}

impl MemoryBlockIo {
    pub fn snapshot(volume: &phoenix_core::ramdisk::RamdiskVolume) -> Self {
        Self {
            data: volume.as_slice().to_vec(),
        }
    }
}

impl gpt_disk_io::BlockIo for MemoryBlockIo {
    type Error = std::io::Error;

    fn block_size(&self) -> gpt_disk_types::BlockSize {
        gpt_disk_types::BlockSize::BS_512
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok(self.data.len() as u64 / 512)
    }

    fn read_blocks(
        &mut self,
        start_lba: gpt_disk_types::Lba,
        dst: &mut [u8],
    ) -> Result<(), Self::Error> {
        let offset = start_lba.0 as usize * 512;
        if offset + dst.len() > self.data.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "read beyond end of device",
            ));
        }
        dst.copy_from_slice(&self.data[offset..offset + dst.len()]);
        Ok(())
    }

    fn write_blocks(
        &mut self,
        start_lba: gpt_disk_types::Lba,
        src: &[u8],
    ) -> Result<(), Self::Error> {
        let offset = start_lba.0 as usize * 512;
        if offset + src.len() > self.data.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write beyond end of device",
            ));
        }
        self.data[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Image loader double.
#[derive(Default)]
pub struct TestLoader {
    pub started: Vec<Vec<u8>>,
    pub fail: bool,
}

impl phoenix_recovery::ImageLoader for TestLoader {
    fn load_and_start(&mut self, image: &[u8]) -> Result<(), RecoveryError> {
        self.started.push(image.to_vec());
        if self.fail {
            return Err(RecoveryError::Servicing);
        }
        Ok(())
    }
}

/// Boot handoff double.
#[derive(Default)]
pub struct TestHandoff {
    pub booted: u32,
}

impl phoenix_recovery::BootHandoff for TestHandoff {
    fn ramboot(
        &mut self,
        volume: &mut phoenix_core::ramdisk::RamdiskVolume,
    ) -> Result<(), RecoveryError> {
        assert!(volume.is_registered(), "volume must be registered at handoff");
        self.booted += 1;
        Ok(())
    }
}
