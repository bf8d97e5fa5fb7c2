//! Text encoding detection.
//!
//! Priority when decoding bytes: charset declared by the server, then the
//! XML prolog's `encoding=`, then a statistical guess, then UTF-8. A BOM, if
//! present, overrides all of them.

use std::sync::LazyLock;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;

static PROLOG_ENCODING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*<\?xml[^>]*?encoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#)
        .expect("valid regex")
});

/// How far into a document the prolog is looked for.
const PROLOG_WINDOW: usize = 256;

/// Extract `charset=` from a `Content-Type` header value.
pub(crate) fn from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_owned())
            .filter(|v| !v.is_empty())
    })
}

/// The `encoding` named in an XML declaration at the start of `bytes`.
pub(crate) fn prolog_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let head = &head[..head.len().min(PROLOG_WINDOW)];
    let label = PROLOG_ENCODING.captures(head)?.get(1)?.as_bytes();
    Encoding::for_label(label)
}

pub(crate) fn detect(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

fn choose(bytes: &[u8], declared: Option<&str>) -> &'static Encoding {
    declared
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .or_else(|| prolog_encoding(bytes))
        .unwrap_or_else(|| detect(bytes))
}

/// Decode `bytes` to a string, replacing undecodable sequences.
pub(crate) fn decode_bytes(bytes: &[u8], declared: Option<&str>) -> String {
    let encoding = choose(bytes, declared);
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(encoding = used.name(), "replaced undecodable bytes");
    }
    text.into_owned()
}

/// Re-encode text into bytes with the charset the detector picks for it.
///
/// Falls back to UTF-8 when the guess is UTF-8 already or the text has
/// characters the guessed charset cannot represent. Returns the label to
/// decode the bytes back with.
pub(crate) fn encode_text(text: &str) -> (Vec<u8>, &'static str) {
    let guess = detect(text.as_bytes());
    if guess != UTF_8 {
        let (bytes, _, unmappable) = guess.encode(text);
        if !unmappable {
            return (bytes.into_owned(), guess.name());
        }
    }
    (text.as_bytes().to_vec(), UTF_8.name())
}
