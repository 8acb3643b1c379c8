//! Fingerprints of the domain documents an audit was run against.
//!
//! Each audit input records the digest of the YAML text it loaded. Comparing
//! it with a fresh digest of the file on disk tells a curator whether the
//! knowledge base changed after the report was written.
//!
//! Format: `fnv1a64:` followed by 16 lowercase hex digits (FNV-1a, 64-bit,
//! over the UTF-8 bytes of the text exactly as read).

/// Prefix of every document digest.
pub const DOCUMENT_DIGEST_V1_PREFIX: &str = "fnv1a64:";

const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a64(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(OFFSET_BASIS, |h, b| (h ^ u64::from(*b)).wrapping_mul(PRIME))
}

/// Digest of a domain document's text, as stored on its audit input.
pub fn document_digest_v1(text: &str) -> String {
    format!("{DOCUMENT_DIGEST_V1_PREFIX}{:016x}", fnv1a64(text.as_bytes()))
}
