use std::path::Path;

use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha1::Sha1;

use crate::error::{DrmError, DrmResult};

/**
    RSA-PKCS1-v1.5 SHA-1 signer over license canonical bytes.

    The private key is parsed once at construction into an immutable
    handle; `sign` performs no I/O and is safe to call from parallel
    request handlers. Reconfiguration means building a new signer.
*/
#[derive(Debug)]
pub struct RsaSigner {
    signing_key: SigningKey<Sha1>,
}

impl RsaSigner {
    /**
        Load a PKCS#1 PEM private key from a file.

        Fails fast: a missing path, unreadable file, or unparsable key
        all surface here, never later from `sign`.
    */
    pub fn from_pem_file(path: impl AsRef<Path>) -> DrmResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DrmError::PemFileMissing(path.display().to_string()));
        }
        let pem = std::fs::read_to_string(path)
            .map_err(|e| DrmError::PemDecodeFailed(format!("{}: {e}", path.display())))?;
        Self::from_pkcs1_pem(&pem)
    }

    /**
        Parse a PKCS#1 PEM private key from a string.
    */
    pub fn from_pkcs1_pem(pem: &str) -> DrmResult<Self> {
        let key = RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| DrmError::PrivateKeyParseFailed(e.to_string()))?;
        Ok(Self::from_private_key(key))
    }

    /**
        Wrap an already-parsed private key.
    */
    pub fn from_private_key(key: RsaPrivateKey) -> Self {
        Self {
            signing_key: SigningKey::new(key),
        }
    }

    /**
        Sign arbitrary bytes: SHA-1 digest, PKCS#1 v1.5 padding, RSA.
    */
    pub fn sign(&self, message: &[u8]) -> DrmResult<Vec<u8>> {
        let signature = self
            .signing_key
            .try_sign(message)
            .map_err(|e| DrmError::SigningFailed(e.to_string()))?;
        Ok(signature.to_vec())
    }
}
