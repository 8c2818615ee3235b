//! Content-plus-options cache key derivation.

use std::fmt;

use crate::format::Format;
use crate::metrics::MetricKind;

/// 32-byte digest over input bytes and the full option tuple. Two calls
/// with bit-identical inputs and identical options land on the same key;
/// `None` and `Some(0)` are distinct inputs to the digest (they are fed as
/// different tagged byte sequences, not coerced to a shared sentinel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    #[must_use]
    pub fn compute(
        input_bytes: &[u8],
        max_bytes: Option<u64>,
        max_diff: Option<f64>,
        metric: MetricKind,
        formats: &[Format],
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(input_bytes.len() as u64).to_le_bytes());
        hasher.update(input_bytes);

        hash_optional_u64(&mut hasher, max_bytes);
        hash_optional_f64(&mut hasher, max_diff);

        hasher.update(metric.tag().as_bytes());
        hasher.update(b"\0");

        hasher.update(&(formats.len() as u64).to_le_bytes());
        for format in formats {
            hasher.update(format.tag().as_bytes());
            hasher.update(b"\0");
        }

        Self(*hasher.finalize().as_bytes())
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        hex_encode(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn hash_optional_u64(hasher: &mut blake3::Hasher, value: Option<u64>) {
    match value {
        None => hasher.update(&[0u8]),
        Some(v) => {
            hasher.update(&[1u8]);
            hasher.update(&v.to_le_bytes())
        }
    };
}

fn hash_optional_f64(hasher: &mut blake3::Hasher, value: Option<f64>) {
    match value {
        None => hasher.update(&[0u8]),
        Some(v) => {
            hasher.update(&[1u8]);
            hasher.update(&v.to_le_bytes())
        }
    };
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0F) as usize] as char);
    }
    out
}
