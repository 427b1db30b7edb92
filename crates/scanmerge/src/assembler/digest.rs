//! Content digests recorded for every composite document.

use sm3::{Digest, Sm3};

/// Lower-case hex MD5 and SM3 digests of a byte string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digests {
    pub md5: String,
    pub sm3: String,
}

pub fn digest(bytes: &[u8]) -> Digests {
    Digests {
        md5: format!("{:x}", md5::compute(bytes)),
        sm3: hex::encode(Sm3::digest(bytes)),
    }
}
