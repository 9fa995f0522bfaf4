/*!
    GY/T 277-2014 license issuing core.

    Derives per-KID content keys from a shared secret seed, assembles
    licenses in the [`drm_chinadrm_format`] unit model, signs the
    canonical serialization with RSA PKCS#1 v1.5 over SHA-1, and hands
    back base64 artifacts ready for client delivery.
*/

mod error;
mod issuer;
mod keygen;
mod signer;

pub use self::error::{DrmError, DrmResult};
pub use self::issuer::LicenseIssuer;
pub use self::keygen::{CONTENT_KEY_LEN, KeyDeriver};
pub use self::signer::RsaSigner;

pub use drm_chinadrm_format::FormatError;
