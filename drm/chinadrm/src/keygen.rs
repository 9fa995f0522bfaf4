use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{DrmError, DrmResult};

/// Content keys are AES-128.
pub const CONTENT_KEY_LEN: usize = 16;

/// Only the first 30 seed bytes participate in derivation.
const SEED_PREFIX_LEN: usize = 30;

/// Built-in shared secret, overridable at construction.
const DEFAULT_KEY_SEED: &[u8] =
    b"b1cc1aa664122baca692107d4ba5d6d21ef9787ee82f8020ec93adcc25d44b8f";

/**
    Deterministic content-key derivation from a shared secret seed.

    Follows the PlayReady key-seed construction: three SHA-256 digests
    over interleavings of the truncated seed and the KID's UTF-8 bytes,
    folded down to 16 bytes by XOR of both digest halves. The same
    seed and KID always yield the same key, so the relationship
    between KID and key never needs to be stored.
*/
#[derive(Debug)]
pub struct KeyDeriver {
    seed: Vec<u8>,
}

impl KeyDeriver {
    /**
        Create a deriver over a caller-supplied seed (at least 30 bytes).
    */
    pub fn new(seed: impl Into<Vec<u8>>) -> DrmResult<Self> {
        let seed = seed.into();
        if seed.len() < SEED_PREFIX_LEN {
            return Err(DrmError::SeedTooShort(seed.len()));
        }
        Ok(Self { seed })
    }

    /**
        Derive the 16-byte content key for a KID.

        The KID is treated as opaque text; its UTF-8 bytes are hashed,
        not any UUID binary form.
    */
    pub fn derive_key(&self, kid: &str) -> [u8; CONTENT_KEY_LEN] {
        let seed = &self.seed[..SEED_PREFIX_LEN];
        let kid = kid.as_bytes();

        let mut sha = Sha256::new();
        sha.update(seed);
        sha.update(kid);
        let output_a = sha.finalize();

        let mut sha = Sha256::new();
        sha.update(seed);
        sha.update(kid);
        sha.update(seed);
        let output_b = sha.finalize();

        let mut sha = Sha256::new();
        sha.update(seed);
        sha.update(kid);
        sha.update(seed);
        sha.update(kid);
        let output_c = sha.finalize();

        let mut key = [0u8; CONTENT_KEY_LEN];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = output_a[i]
                ^ output_a[i + CONTENT_KEY_LEN]
                ^ output_b[i]
                ^ output_b[i + CONTENT_KEY_LEN]
                ^ output_c[i]
                ^ output_c[i + CONTENT_KEY_LEN];
        }
        key
    }

    /**
        Generate a fresh random key and a UUID v4 KID for it.

        Key bytes come from the OS CSPRNG.
    */
    pub fn random_key() -> DrmResult<([u8; CONTENT_KEY_LEN], String)> {
        let mut key = [0u8; CONTENT_KEY_LEN];
        OsRng
            .try_fill_bytes(&mut key)
            .map_err(|e| DrmError::RngFailure(e.to_string()))?;
        Ok((key, Uuid::new_v4().to_string()))
    }
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self {
            seed: DEFAULT_KEY_SEED.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const KID: &str = "3bff1f0c-0b16-4641-84af-8832f1cd37b5";

    #[test]
    fn derives_known_vector() {
        let deriver = KeyDeriver::default();
        let key = deriver.derive_key(KID);
        assert_eq!(key, hex!("5d0ad7e63fd99b153ef5fbd74c879cb7"));
    }

    #[test]
    fn derivation_is_deterministic() {
        let deriver = KeyDeriver::default();
        assert_eq!(deriver.derive_key(KID), deriver.derive_key(KID));
        assert_ne!(deriver.derive_key(KID), deriver.derive_key("other-kid"));
    }

    #[test]
    fn only_first_30_seed_bytes_matter() {
        let base = b"0123456789abcdef0123456789abcd".to_vec();
        assert_eq!(base.len(), 30);
        let mut extended = base.clone();
        extended.extend_from_slice(b"-trailing-bytes-ignored-entirely");

        let short = KeyDeriver::new(base).unwrap();
        let long = KeyDeriver::new(extended).unwrap();
        assert_eq!(short.derive_key(KID), long.derive_key(KID));
    }

    #[test]
    fn different_seeds_diverge() {
        let a = KeyDeriver::new(vec![0xAA; 30]).unwrap();
        let b = KeyDeriver::new(vec![0xBB; 30]).unwrap();
        assert_ne!(a.derive_key(KID), b.derive_key(KID));
    }

    #[test]
    fn short_seed_rejected() {
        let err = KeyDeriver::new(vec![0u8; 29]).unwrap_err();
        assert!(matches!(err, DrmError::SeedTooShort(29)));
    }

    #[test]
    fn random_keys_are_unique_with_uuid_kids() {
        let (key_a, kid_a) = KeyDeriver::random_key().unwrap();
        let (key_b, kid_b) = KeyDeriver::random_key().unwrap();

        assert_ne!(key_a, key_b);
        assert_ne!(kid_a, kid_b);
        assert!(Uuid::parse_str(&kid_a).is_ok());
        assert!(Uuid::parse_str(&kid_b).is_ok());
    }
}
