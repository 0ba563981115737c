//! Canonical display form of tester output.
//!
//! Control bytes become mnemonic markers so escape sequences can be read
//! and diffed in plain-text logs. Bytes that are not valid UTF-8 are shown
//! as `\xNN` instead of failing the case.

use std::fmt::Write;

use crate::exec::RawResult;

/// Display form of an empty output.
pub const EMPTY_MARKER: &str = "[EMPTY]";

/// Render raw output bytes in canonical display form.
#[must_use]
pub fn normalize_bytes(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return EMPTY_MARKER.to_string();
    }

    let mut out = String::with_capacity(bytes.len() + 8);
    for chunk in bytes.utf8_chunks() {
        for ch in chunk.valid().chars() {
            match ch {
                '\x1b' => out.push_str("ESC"),
                '\0' => out.push_str("\\0"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\x08' => out.push_str("\\b"),
                other => out.push(other),
            }
        }
        for byte in chunk.invalid() {
            let _ = write!(out, "\\x{byte:02x}");
        }
    }
    out
}

/// Render a tester result: output bytes, or the error sentinel text.
#[must_use]
pub fn normalize(raw: &RawResult) -> String {
    match raw {
        RawResult::Output(bytes) => normalize_bytes(bytes),
        RawResult::Failed(err) => err.sentinel(),
    }
}
