//! Text-level fixes for malformed XML seen in the wild.

use std::sync::LazyLock;

use regex::Regex;

static OPEN_TAG_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(\w+)\s+>").expect("valid regex"));
static CLOSE_TAG_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</(\w+)\s+>").expect("valid regex"));

/// Entities an `&` may legitimately start.
const KNOWN_ENTITIES: [&str; 5] = ["amp;", "lt;", "gt;", "quot;", "apos;"];

const ROOT_CLOSE: &str = "</Root>";

/// Apply every generic repair, in order: BOM removal, tag whitespace, bare
/// ampersands, trailing content after `</Root>`.
pub(crate) fn repair(text: &str) -> String {
    let text = text.replace('\u{FEFF}', "");
    let text = OPEN_TAG_SPACE.replace_all(&text, "<$1>");
    let text = CLOSE_TAG_SPACE.replace_all(&text, "</$1>");
    let mut text = escape_bare_ampersands(&text);
    if let Some(pos) = text.find(ROOT_CLOSE) {
        text.truncate(pos + ROOT_CLOSE.len());
    }
    text
}

/// Replace every `&` that does not begin one of the five predefined XML
/// entities with `&amp;`.
pub(crate) fn escape_bare_ampersands(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        if KNOWN_ENTITIES.iter().any(|e| after.starts_with(e)) {
            out.push('&');
        } else {
            out.push_str("&amp;");
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Insert `</SubChain>` before every `</SubChains>` when none precedes the
/// first `</SubChains>`.
pub(crate) fn close_missing_subchain(text: &str) -> String {
    let head = text.split("</SubChains>").next().unwrap_or(text);
    if head.contains("</SubChain>") || !text.contains("</SubChains>") {
        return text.to_owned();
    }
    text.replace("</SubChains>", "</SubChain></SubChains>")
}
