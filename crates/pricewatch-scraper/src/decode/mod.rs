//! Content decode pipeline: downloaded bytes in, generic document out.
//!
//! Stages run in a fixed order:
//! 1. text input is re-encoded with the detected charset;
//! 2. gzip / zip wrapping is removed by magic-byte sniffing;
//! 3. bytes are decoded (declared charset, XML prolog, detection, UTF-8);
//! 4. generic repairs ([`repair::repair`]);
//! 5. the optional `</SubChain>` fix;
//! 6. structured parse ([`xml::parse`]).

pub(crate) mod charset;
pub(crate) mod decompress;
pub(crate) mod repair;
pub(crate) mod xml;

use serde_json::Value;

use crate::error::DiscoveryResult;
use crate::fetch::RawContent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Close a `SubChain` element the publisher forgot to close.
    pub repair_missing_subchain: bool,
}

/// Run stages 1 to 5 and return the repaired XML text.
///
/// # Errors
///
/// [`ScraperError::NoXmlInArchive`](crate::ScraperError::NoXmlInArchive) for
/// a zip without an `.xml` entry, or
/// [`ScraperError::MalformedDocument`](crate::ScraperError::MalformedDocument)
/// when decompression fails.
pub fn decode_text(content: RawContent, options: DecodeOptions) -> DiscoveryResult<String> {
    let (bytes, declared) = match content {
        RawContent::Bytes { bytes, charset } => (bytes, charset),
        RawContent::Text(text) => {
            let (bytes, label) = charset::encode_text(&text);
            (bytes, Some(label.to_owned()))
        }
    };

    let bytes = decompress::decompress(bytes)?;
    let text = charset::decode_bytes(&bytes, declared.as_deref());
    let mut text = repair::repair(&text);
    if options.repair_missing_subchain {
        text = repair::close_missing_subchain(&text);
    }
    Ok(text)
}

/// Full pipeline: [`decode_text`] then parse into a nested document.
///
/// # Errors
///
/// Everything [`decode_text`] returns, plus
/// [`ScraperError::MalformedDocument`](crate::ScraperError::MalformedDocument)
/// when the repaired text still does not parse.
pub fn decode(content: RawContent, options: DecodeOptions) -> DiscoveryResult<Value> {
    let text = decode_text(content, options)?;
    xml::parse(&text)
}
