//! Compression sniffing by magic bytes.

use std::io::{Cursor, Read};

use flate2::read::MultiGzDecoder;
use zip::ZipArchive;

use crate::error::{DiscoveryResult, ScraperError};

const GZIP_MAGIC: &[u8] = &[0x1F, 0x8B];
const ZIP_MAGIC: &[u8] = &[0x50, 0x4B, 0x03, 0x04];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Compression {
    Gzip,
    Zip,
    Plain,
}

pub(crate) fn sniff(bytes: &[u8]) -> Compression {
    if bytes.starts_with(GZIP_MAGIC) {
        Compression::Gzip
    } else if bytes.starts_with(ZIP_MAGIC) {
        Compression::Zip
    } else {
        Compression::Plain
    }
}

/// Undo gzip or zip wrapping; plain input is returned untouched.
///
/// Gzip streams may hold several members; all of them are concatenated.
/// Zip archives yield the first entry whose name ends in `.xml`.
pub(crate) fn decompress(bytes: Vec<u8>) -> DiscoveryResult<Vec<u8>> {
    match sniff(&bytes) {
        Compression::Plain => Ok(bytes),
        Compression::Gzip => {
            let mut out = Vec::with_capacity(bytes.len() * 4);
            MultiGzDecoder::new(bytes.as_slice())
                .read_to_end(&mut out)
                .map_err(|e| ScraperError::malformed(format!("gzip: {e}")))?;
            Ok(out)
        }
        Compression::Zip => unzip_first_xml(&bytes),
    }
}

fn unzip_first_xml(bytes: &[u8]) -> DiscoveryResult<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ScraperError::malformed(format!("zip: {e}")))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ScraperError::malformed(format!("zip entry {index}: {e}")))?;
        if !entry.name().to_ascii_lowercase().ends_with(".xml") {
            continue;
        }
        tracing::debug!(entry = entry.name(), "extracting xml from zip");
        let mut out = Vec::new();
        entry
            .read_to_end(&mut out)
            .map_err(|e| ScraperError::malformed(format!("zip entry {index}: {e}")))?;
        return Ok(out);
    }

    Err(ScraperError::NoXmlInArchive)
}
