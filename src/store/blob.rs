// BLOB version prefix helpers. [version: u8][payload].
// Version 1 = JSON document. A blob without a prefix (starts with '{') is read as bare JSON.

use serde::Serialize;
use serde::de::DeserializeOwned;

pub(super) const BLOB_VERSION: u8 = 1;

fn with_version_prefix(version: u8, payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(version);
    out.extend_from_slice(&payload);
    out
}

/// Payload after version byte. If first byte matches `expected_version`, return rest; else legacy (whole blob).
fn blob_payload(bytes: &[u8], expected_version: u8) -> &[u8] {
    match bytes.first() {
        Some(v) if *v == expected_version => &bytes[1..],
        _ => bytes,
    }
}

pub(super) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    Ok(with_version_prefix(BLOB_VERSION, serde_json::to_vec(value)?))
}

pub(super) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(blob_payload(bytes, BLOB_VERSION))
}
