use std::time::{SystemTime, UNIX_EPOCH};

use drm_chinadrm_format::license::{ChinaDrmLicense, CommonLicense, License};

use crate::error::DrmResult;
use crate::keygen::{CONTENT_KEY_LEN, KeyDeriver};
use crate::signer::RsaSigner;

/**
    The license issuing facade.

    Stateless per request: the signer handle and derivation seed are
    fixed at construction (constructor injection), after which the
    issuer is safe to share across parallel request handlers.
*/
pub struct LicenseIssuer {
    deriver: KeyDeriver,
    signer: RsaSigner,
}

impl LicenseIssuer {
    /**
        Build an issuer over the default derivation seed.
    */
    pub fn new(signer: RsaSigner) -> Self {
        Self {
            deriver: KeyDeriver::default(),
            signer,
        }
    }

    /**
        Build an issuer with a caller-supplied key deriver.
    */
    pub fn with_deriver(signer: RsaSigner, deriver: KeyDeriver) -> Self {
        Self { deriver, signer }
    }

    /**
        Issue a GY/T 277 baseline license, base64-encoded.
    */
    pub fn issue_common(
        &self,
        kids: &[String],
        subject_ids: &[String],
        cert_id: &str,
    ) -> DrmResult<String> {
        let license =
            CommonLicense::new(&self.derive_keys(kids), subject_ids, cert_id, now_epoch_secs())?;
        self.sign_and_encode(license.into())
    }

    /**
        Issue a ChinaDRM license carrying a Content unit, base64-encoded.
    */
    pub fn issue_china_drm(
        &self,
        content_id: u64,
        kids: &[String],
        subject_ids: &[String],
        cert_id: &str,
    ) -> DrmResult<String> {
        let license = ChinaDrmLicense::new(
            content_id,
            &self.derive_keys(kids),
            subject_ids,
            cert_id,
            now_epoch_secs(),
        )?;
        self.sign_and_encode(license.into())
    }

    /**
        Generate a random content key and fresh KID for provisioning.
    */
    pub fn generate_fresh_key(&self) -> DrmResult<([u8; CONTENT_KEY_LEN], String)> {
        KeyDeriver::random_key()
    }

    fn derive_keys(&self, kids: &[String]) -> Vec<(String, [u8; CONTENT_KEY_LEN])> {
        kids.iter()
            .map(|kid| (kid.clone(), self.deriver.derive_key(kid)))
            .collect()
    }

    /**
        Two-pass envelope: sign the canonical bytes, embed the
        signature, then emit the final stream.
    */
    fn sign_and_encode(&self, mut license: License) -> DrmResult<String> {
        let canonical = license.canonical_bytes(true);
        let signature = self.signer.sign(&canonical)?;
        license.set_signature(signature);
        Ok(license.base64(true))
    }
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
