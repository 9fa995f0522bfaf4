use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("license needs at least one key id")]
    EmptyKidList,

    #[error("key id is {0} bytes, exceeding the 255-byte length field")]
    KidTooLong(usize),

    #[error("certificate id is {0} bytes, exceeding the 255-byte length field")]
    CertIdTooLong(usize),

    #[error("invalid enum value {value} for {kind}")]
    InvalidEnumValue { kind: &'static str, value: u8 },
}
