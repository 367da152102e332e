//! Content fingerprints for datasets and model artefacts.

/// 32-bit FNV-1a state. Not cryptographic; only used to detect content changes.
#[derive(Copy, Clone, Debug)]
pub struct Fingerprint(u32);

const FNV_OFFSET: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

impl Fingerprint {
    pub fn new() -> Self {
        Self(FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn update(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.0 = (self.0 ^ u32::from(*b)).wrapping_mul(FNV_PRIME);
        }
    }

    /// 8-character lowercase hex digest.
    pub fn finish_hex(&self) -> String {
        format!("{:08x}", self.0)
    }

    /// One-shot digest of a byte slice.
    pub fn of(bytes: &[u8]) -> Self {
        let mut fp = Self::new();
        fp.update(bytes);
        fp
    }
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::new()
    }
}
