//! In-memory WIM container builder for tests

pub struct WimBuilder {
    files: Vec<(String, Vec<u8>)>,
    cbmr: Option<[String; 4]>,
    utf16: bool,
    omit_resources: bool,
    integrity_size: u64,
    crypt_hash_size: u32,
    length_skew: i64,
}

impl WimBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            cbmr: None,
            utf16: false,
            omit_resources: false,
            integrity_size: 56,
            crypt_hash_size: 20,
            length_skew: 0,
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

    pub fn utf16_catalog(mut self) -> Self {
        self.utf16 = true;
        self
    }

    pub fn without_resources(mut self) -> Self {
        self.omit_resources = true;
        self
    }

    /// Grow or shrink the final buffer without touching the header,
    /// breaking the end-of-container accounting invariant.
    pub fn skew_length(mut self, delta: i64) -> Self {
        self.length_skew = delta;
        self
    }

    pub fn build(self) -> Vec<u8> {
        const HEADER_SIZE: usize = 208;

        // Lay out file payloads after the header
        let mut data = vec![0u8; HEADER_SIZE];
        let mut placed: Vec<(String, u64, u64)> = Vec::new();
        for (path, content) in &self.files {
            let offset = data.len() as u64;
            data.extend_from_slice(content);
            placed.push((path.clone(), offset, content.len() as u64));
        }

        // XML catalog
        let mut xml = String::from("<WIM><IMAGE><NAME>Recovery</NAME>");
        if !self.omit_resources {
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

        let xml_bytes = if self.utf16 {
            let mut bytes = vec![0xFF, 0xFE];
            for unit in xml.encode_utf16() {
                bytes.extend_from_slice(&unit.to_le_bytes());
            }
            bytes
        } else {
            xml.into_bytes()
        };

        let xml_offset = data.len() as u64;
        let xml_size = xml_bytes.len() as u64;
        data.extend_from_slice(&xml_bytes);
        data.extend(std::iter::repeat(0u8).take(self.integrity_size as usize));
        data.extend(std::iter::repeat(0u8).take(self.crypt_hash_size as usize));

        // Header
        data[0..8].copy_from_slice(b"MSWIM\x00\x00\x00");
        data[8..12].copy_from_slice(&208u32.to_le_bytes());
        data[12..16].copy_from_slice(&0x0000_000Eu32.to_le_bytes());
        data[44..48].copy_from_slice(&1u32.to_le_bytes());
        data[0x48..0x50].copy_from_slice(&xml_size.to_le_bytes());
        data[0x50..0x58].copy_from_slice(&xml_offset.to_le_bytes());
        data[0x7C..0x84].copy_from_slice(&self.integrity_size.to_le_bytes());
        data[0x94..0x98].copy_from_slice(&self.crypt_hash_size.to_le_bytes());

        match self.length_skew {
            0 => {}
            d if d > 0 => data.extend(std::iter::repeat(0u8).take(d as usize)),
            d => {
                let new_len = data.len() - (-d) as usize;
                data.truncate(new_len);
            }
        }

        data
    }
}
