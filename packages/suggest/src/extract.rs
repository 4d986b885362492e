//! Microformat field extraction from `adr_address` HTML fragments.
//!
//! The places service returns addresses like
//! `<span class="street-address">400 Broadway</span>, <span class="locality">Seattle</span>`.
//! Fields are pulled out with a regex rather than an HTML parser, and
//! numeric character references (`&#39;`) in the captured text are decoded.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Regex for the `street-address` span contents.
pub static STREET_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| field_pattern("street-address"));

/// Regex for the `region` span contents.
pub static REGION_RE: LazyLock<Regex> = LazyLock::new(|| field_pattern("region"));

/// Regex for decimal numeric character references (`&#NNN;`).
static NUMERIC_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(\d+);").expect("valid regex"));

/// Builds the case-insensitive pattern matching `"<class>">value<`.
///
/// # Panics
///
/// Never in practice: `class` is escaped before being embedded.
#[must_use]
pub fn field_pattern(class: &str) -> Regex {
    Regex::new(&format!(r#"(?i)"{}"\s*>(.+?)<"#, regex::escape(class))).expect("valid regex")
}

/// Returns the first capture group of `pattern` in `html`, with numeric
/// character references decoded.
///
/// Absent input and non-matching input both yield an empty string.
#[must_use]
pub fn extract(html: Option<&str>, pattern: &Regex) -> String {
    let Some(captured) = pattern
        .captures(html.unwrap_or_default())
        .and_then(|caps| caps.get(1))
    else {
        return String::new();
    };

    decode_numeric_refs(captured.as_str()).into_owned()
}

/// Replaces every `&#NNN;` with the character it encodes.
///
/// References that do not name a Unicode scalar value are kept verbatim.
#[must_use]
pub fn decode_numeric_refs(text: &str) -> Cow<'_, str> {
    NUMERIC_REF_RE.replace_all(text, |caps: &Captures<'_>| {
        caps[1]
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), String::from)
    })
}
