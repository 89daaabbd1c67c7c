//! Encoding helpers shared by every document type.

use std::fmt::Write as _;

use base64::{engine::general_purpose, Engine};
use dirauth_types::{DescriptorDigest, Digest256, IdentityDigest};

use crate::NetdocError;

/// Keyword that opens the signature section of a signed document.
pub const SIGNATURE_KEYWORD: &str = "directory-signature";

const OBJECT_LINE_WIDTH: usize = 64;

// ── Base64 ──────────────────────────────────────────────────────────────

/// Unpadded base64, as used for digests inside router lines.
pub fn encode_b64_nopad(bytes: &[u8]) -> String {
    general_purpose::STANDARD_NO_PAD.encode(bytes)
}

pub fn decode_b64_nopad(s: &str) -> Result<Vec<u8>, String> {
    general_purpose::STANDARD_NO_PAD
        .decode(s.trim_end_matches('='))
        .map_err(|e| e.to_string())
}

/// Padded base64, as used inside objects.
pub fn decode_b64(s: &str) -> Result<Vec<u8>, String> {
    general_purpose::STANDARD.decode(s).map_err(|e| e.to_string())
}

pub fn identity_b64(id: &IdentityDigest) -> String {
    encode_b64_nopad(id.as_bytes())
}

pub fn descriptor_b64(d: &DescriptorDigest) -> String {
    encode_b64_nopad(d.as_bytes())
}

pub fn digest256_b64(d: &Digest256) -> String {
    encode_b64_nopad(d.as_bytes())
}

// ── Objects ─────────────────────────────────────────────────────────────

/// Append a `-----BEGIN <label>-----` block wrapping `data` at 64 columns.
pub fn push_object(out: &mut String, label: &str, data: &[u8]) {
    let encoded = general_purpose::STANDARD.encode(data);
    let _ = writeln!(out, "-----BEGIN {label}-----");
    for chunk in encoded.as_bytes().chunks(OBJECT_LINE_WIDTH) {
        // base64 output is ASCII, so every chunk is valid UTF-8.
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push('\n');
    }
    let _ = writeln!(out, "-----END {label}-----");
}

/// Append `keyword` and `value` as one line, omitting the separating space
/// when the value is empty.
pub fn push_item(out: &mut String, keyword: &str, value: &str) {
    out.push_str(keyword);
    if !value.is_empty() {
        out.push(' ');
        out.push_str(value);
    }
    out.push('\n');
}

// ── Signed portion ──────────────────────────────────────────────────────

/// Byte offset of the first `directory-signature` item at the start of a line.
pub fn signature_section_start(text: &str) -> Option<usize> {
    let needle = format!("{SIGNATURE_KEYWORD} ");
    if text.starts_with(&needle) {
        return Some(0);
    }
    text.find(&format!("\n{needle}")).map(|pos| pos + 1)
}

/// The signed portion of a document: everything up to and including the
/// space after the first `directory-signature` keyword.
pub fn signed_portion(text: &str) -> Result<&str, NetdocError> {
    let start = signature_section_start(text).ok_or(NetdocError::NoSignatureSection)?;
    Ok(&text[..start + SIGNATURE_KEYWORD.len() + 1])
}
