use thiserror::Error;

use drm_chinadrm_format::FormatError;

pub type DrmResult<T> = Result<T, DrmError>;

#[derive(Debug, Error)]
pub enum DrmError {
    #[error("key seed is {0} bytes, need at least 30")]
    SeedTooShort(usize),

    #[error("pem file missing: {0}")]
    PemFileMissing(String),

    #[error("pem file unreadable: {0}")]
    PemDecodeFailed(String),

    #[error("private key parse failed: {0}")]
    PrivateKeyParseFailed(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("random source failed: {0}")]
    RngFailure(String),

    #[error(transparent)]
    Format(#[from] FormatError),
}
