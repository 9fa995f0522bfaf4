/*!
    License unit taxonomy and TLV encoders.

    Every unit shares a 4-byte header: Type(1) | Index(1) | Length(2),
    with Length counting the payload bytes that follow. All multi-byte
    integers are big-endian. The Length of each unit is computed
    structurally from its field widths before emission.
*/

use drm_core::Writer;

use crate::error::FormatError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Unit header width: Type(1) + Index(1) + Length(2).
pub const UNIT_HEADER_LEN: usize = 4;

pub const UNIT_TYPE_LICENSE_HEADER: u8 = 0x00;
pub const UNIT_TYPE_CONTENT: u8 = 0x01;
pub const UNIT_TYPE_AUTH_OBJECT: u8 = 0x02;
pub const UNIT_TYPE_KEY: u8 = 0x03;
pub const UNIT_TYPE_POLICY: u8 = 0x04;
pub const UNIT_TYPE_SIGNATURE: u8 = 0xFF;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/**
    Algorithm identifiers carried in Key and Signature units.
*/
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Sha1 = 0x00,
    Sha256 = 0x01,
    Sm3_256 = 0x02,
    Rsa1024 = 0x10,
    Rsa2048 = 0x11,
    Sm2_256 = 0x12,
    Aes128 = 0x20,
    TripleDes = 0x21,
    Sm4_128 = 0x22,
    Rc4 = 0x30,
    RsaSha1_1024 = 0x40,
    RsaSha1_2048 = 0x41,
    Sm2Sign = 0x42,
}

impl Algorithm {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA_1",
            Self::Sha256 => "SHA_256",
            Self::Sm3_256 => "SM3_256",
            Self::Rsa1024 => "RSA_1024",
            Self::Rsa2048 => "RSA_2048",
            Self::Sm2_256 => "SM2_256",
            Self::Aes128 => "AES_128_128",
            Self::TripleDes => "3DES_64_112",
            Self::Sm4_128 => "SM4_128",
            Self::Rc4 => "RC4",
            Self::RsaSha1_1024 => "RSA_SHA1_1024",
            Self::RsaSha1_2048 => "RSA_SHA1_2048",
            Self::Sm2Sign => "SM2_256_SIGN",
        }
    }
}

impl TryFrom<u8> for Algorithm {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Sha1),
            0x01 => Ok(Self::Sha256),
            0x02 => Ok(Self::Sm3_256),
            0x10 => Ok(Self::Rsa1024),
            0x11 => Ok(Self::Rsa2048),
            0x12 => Ok(Self::Sm2_256),
            0x20 => Ok(Self::Aes128),
            0x21 => Ok(Self::TripleDes),
            0x22 => Ok(Self::Sm4_128),
            0x30 => Ok(Self::Rc4),
            0x40 => Ok(Self::RsaSha1_1024),
            0x41 => Ok(Self::RsaSha1_2048),
            0x42 => Ok(Self::Sm2Sign),
            _ => Err(FormatError::InvalidEnumValue {
                kind: "Algorithm",
                value,
            }),
        }
    }
}

impl core::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/**
    Kind of key carried by a Key unit and referenced by a Policy unit.
*/
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Content = 0x01,
    Business = 0x02,
    Device = 0x03,
}

impl TryFrom<u8> for KeyKind {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Content),
            0x02 => Ok(Self::Business),
            0x03 => Ok(Self::Device),
            _ => Err(FormatError::InvalidEnumValue {
                kind: "KeyKind",
                value,
            }),
        }
    }
}

/**
    Entity class an AuthorizedObject unit grants rights to.
*/
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Account = 0x01,
    Device = 0x02,
    Ip = 0x03,
}

impl TryFrom<u8> for ObjectType {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Account),
            0x02 => Ok(Self::Device),
            0x03 => Ok(Self::Ip),
            _ => Err(FormatError::InvalidEnumValue {
                kind: "ObjectType",
                value,
            }),
        }
    }
}

/**
    Boolean combinator selected by a Counter unit's type byte.
    An absent counter is equivalent to AND over all rights.
*/
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterOp {
    And = 0xA0,
    Or = 0xA1,
    Not = 0xA2,
    Xor = 0xA3,
}

impl TryFrom<u8> for CounterOp {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0xA0 => Ok(Self::And),
            0xA1 => Ok(Self::Or),
            0xA2 => Ok(Self::Not),
            0xA3 => Ok(Self::Xor),
            _ => Err(FormatError::InvalidEnumValue {
                kind: "CounterOp",
                value,
            }),
        }
    }
}

/**
    Usage restriction kinds inside a Policy unit.
*/
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRuleType {
    /// Seconds since the Unix epoch; license invalid before this.
    StartTime = 0x01,
    /// Seconds since the Unix epoch; license invalid after this.
    EndTime = 0x02,
    /// Times the content may be used.
    PlayTimes = 0x03,
    /// Seconds of validity counted from first use.
    TimeSpan = 0x04,
    /// Total seconds the license may be in use.
    AccumulatedTimeSpan = 0x05,
}

impl TryFrom<u8> for KeyRuleType {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::StartTime),
            0x02 => Ok(Self::EndTime),
            0x03 => Ok(Self::PlayTimes),
            0x04 => Ok(Self::TimeSpan),
            0x05 => Ok(Self::AccumulatedTimeSpan),
            _ => Err(FormatError::InvalidEnumValue {
                kind: "KeyRuleType",
                value,
            }),
        }
    }
}

/**
    Base type codes for Right units (0x10..=0x9F).
*/
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RightKind {
    Play = 0x10,
    Record = 0x20,
    Copy = 0x30,
    Store = 0x40,
    Forward = 0x50,
    Execute = 0x60,
    Super = 0x80,
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

fn put_unit_header(w: &mut Writer, unit_type: u8, index: u8, length: u16) {
    w.put_u8(unit_type);
    w.put_u8(index);
    w.put_u16be(length);
}

/**
    Type 0x00. First unit of every license, always at Index 0.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseHeader {
    pub version: u8,
    pub id: u64,
    pub units_num: u8,
}

impl LicenseHeader {
    /// Version(1) + Id(8) + UnitsNum(1).
    pub const PAYLOAD_LEN: u16 = 10;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(UNIT_HEADER_LEN + Self::PAYLOAD_LEN as usize);
        put_unit_header(&mut w, UNIT_TYPE_LICENSE_HEADER, 0x00, Self::PAYLOAD_LEN);
        w.put_u8(self.version);
        w.put_u64be(self.id);
        w.put_u8(self.units_num);
        w.into_bytes()
    }
}

/**
    Type 0x03. A content key issued to the device.

    Wire payload is AlgId(1) | KeyDataLen(2) | KeyData. The `kind` and
    `kid` fields belong to the reserved auxiliary trailer and are never
    emitted; they drive assembly (each kid is paired with exactly one
    Policy unit) and inspection.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub index: u8,
    pub algorithm: Algorithm,
    pub key_data: Vec<u8>,
    pub kind: KeyKind,
    pub kid: String,
}

impl Key {
    pub fn payload_len(&self) -> u16 {
        (1 + 2 + self.key_data.len()) as u16
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(UNIT_HEADER_LEN + self.payload_len() as usize);
        put_unit_header(&mut w, UNIT_TYPE_KEY, self.index, self.payload_len());
        w.put_u8(self.algorithm as u8);
        w.put_u16be(self.key_data.len() as u16);
        w.put_bytes(&self.key_data);
        w.into_bytes()
    }
}

/**
    Type 0x02. An entity the license authorizes (account, device, IP).
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedObject {
    pub index: u8,
    pub object_type: ObjectType,
    pub object_id: Vec<u8>,
}

impl AuthorizedObject {
    pub fn payload_len(&self) -> u16 {
        (1 + self.object_id.len()) as u16
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(UNIT_HEADER_LEN + self.payload_len() as usize);
        put_unit_header(&mut w, UNIT_TYPE_AUTH_OBJECT, self.index, self.payload_len());
        w.put_u8(self.object_type as u8);
        w.put_bytes(&self.object_id);
        w.into_bytes()
    }
}

/**
    Optional parameter attached to a Right.

    The wire type byte of a Right is its base kind code plus the
    constraint's sub-kind offset, so a bare play right stays 0x10.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RightConstraint {
    None,
    Times(u32),
    Duration(u32),
    Interval { start: u32, end: u32 },
}

impl RightConstraint {
    const fn sub_kind_offset(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Times(_) => 1,
            Self::Duration(_) => 2,
            Self::Interval { .. } => 3,
        }
    }

    const fn payload_len(self) -> u16 {
        match self {
            Self::None => 0,
            Self::Times(_) | Self::Duration(_) => 4,
            Self::Interval { .. } => 8,
        }
    }
}

/**
    Type 0x10..=0x9F. An atomic permission granted by the license.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Right {
    pub index: u8,
    pub kind: RightKind,
    pub constraint: RightConstraint,
}

impl Right {
    pub fn play(index: u8) -> Self {
        Self {
            index,
            kind: RightKind::Play,
            constraint: RightConstraint::None,
        }
    }

    pub const fn type_byte(&self) -> u8 {
        self.kind as u8 + self.constraint.sub_kind_offset()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let len = self.constraint.payload_len();
        let mut w = Writer::with_capacity(UNIT_HEADER_LEN + len as usize);
        put_unit_header(&mut w, self.type_byte(), self.index, len);
        match self.constraint {
            RightConstraint::None => {}
            RightConstraint::Times(n) | RightConstraint::Duration(n) => w.put_u32be(n),
            RightConstraint::Interval { start, end } => {
                w.put_u32be(start);
                w.put_u32be(end);
            }
        }
        w.into_bytes()
    }
}

/**
    A single usage rule inside a Policy unit:
    RuleType(1) | DataLen(1) | Data.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRule {
    pub rule_type: KeyRuleType,
    pub data: Vec<u8>,
}

impl KeyRule {
    fn from_u32(rule_type: KeyRuleType, value: u32) -> Self {
        Self {
            rule_type,
            data: value.to_be_bytes().to_vec(),
        }
    }

    pub fn start_time(epoch_secs: u32) -> Self {
        Self::from_u32(KeyRuleType::StartTime, epoch_secs)
    }

    pub fn end_time(epoch_secs: u32) -> Self {
        Self::from_u32(KeyRuleType::EndTime, epoch_secs)
    }

    pub fn play_times(times: u32) -> Self {
        Self::from_u32(KeyRuleType::PlayTimes, times)
    }

    pub fn time_span(secs: u32) -> Self {
        Self::from_u32(KeyRuleType::TimeSpan, secs)
    }

    pub fn accumulated_time_span(secs: u32) -> Self {
        Self::from_u32(KeyRuleType::AccumulatedTimeSpan, secs)
    }

    pub fn encoded_len(&self) -> usize {
        2 + self.data.len()
    }

    fn write(&self, w: &mut Writer) {
        w.put_u8(self.rule_type as u8);
        w.put_u8(self.data.len() as u8);
        w.put_bytes(&self.data);
    }
}

/**
    Type 0x04. Usage restrictions for one key, matched by KID.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub index: u8,
    pub key_kind: KeyKind,
    pub kid: String,
    pub rules: Vec<KeyRule>,
}

impl Policy {
    pub fn new(
        index: u8,
        key_kind: KeyKind,
        kid: impl Into<String>,
        rules: Vec<KeyRule>,
    ) -> Result<Self, FormatError> {
        let kid = kid.into();
        if kid.len() > u8::MAX as usize {
            return Err(FormatError::KidTooLong(kid.len()));
        }
        Ok(Self {
            index,
            key_kind,
            kid,
            rules,
        })
    }

    pub fn payload_len(&self) -> u16 {
        let rules: usize = self.rules.iter().map(KeyRule::encoded_len).sum();
        (1 + 1 + self.kid.len() + 1 + rules) as u16
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(UNIT_HEADER_LEN + self.payload_len() as usize);
        put_unit_header(&mut w, UNIT_TYPE_POLICY, self.index, self.payload_len());
        w.put_u8(self.key_kind as u8);
        w.put_u8(self.kid.len() as u8);
        w.put_bytes(self.kid.as_bytes());
        w.put_u8(self.rules.len() as u8);
        for rule in &self.rules {
            rule.write(&mut w);
        }
        w.into_bytes()
    }
}

/**
    Type 0xA0..=0xA3. Boolean combinator over Right unit indices.

    The canonical empty AND counter keeps the fixed published Length of
    4: IndexNum(2) = 0 followed by two reserved zero bytes, so framing
    by Length stays exact. Non-empty counters encode structurally as
    IndexNum(2) | indices.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    pub op: CounterOp,
    pub index: u8,
    pub rights_indices: Vec<u8>,
}

impl Counter {
    /// Payload width of the empty legacy form.
    pub const EMPTY_PAYLOAD_LEN: u16 = 4;

    pub fn empty_and(index: u8) -> Self {
        Self {
            op: CounterOp::And,
            index,
            rights_indices: Vec::new(),
        }
    }

    pub fn payload_len(&self) -> u16 {
        if self.rights_indices.is_empty() {
            Self::EMPTY_PAYLOAD_LEN
        } else {
            (2 + self.rights_indices.len()) as u16
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(UNIT_HEADER_LEN + self.payload_len() as usize);
        put_unit_header(&mut w, self.op as u8, self.index, self.payload_len());
        w.put_u16be(self.rights_indices.len() as u16);
        if self.rights_indices.is_empty() {
            w.put_u16be(0);
        } else {
            w.put_bytes(&self.rights_indices);
        }
        w.into_bytes()
    }
}

/**
    Type 0xFF. Always the last unit when present.

    Built as a shell carrying the algorithm and certificate id; the
    signature bytes are filled in after the canonical serialization has
    been signed.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub index: u8,
    pub algorithm: Algorithm,
    pub cert_id: Vec<u8>,
    pub signature_data: Vec<u8>,
}

impl Signature {
    pub fn new(
        index: u8,
        algorithm: Algorithm,
        cert_id: impl Into<Vec<u8>>,
    ) -> Result<Self, FormatError> {
        let cert_id = cert_id.into();
        if cert_id.len() > u8::MAX as usize {
            return Err(FormatError::CertIdTooLong(cert_id.len()));
        }
        Ok(Self {
            index,
            algorithm,
            cert_id,
            signature_data: Vec::new(),
        })
    }

    pub fn set_signature(&mut self, signature: Vec<u8>) {
        self.signature_data = signature;
    }

    pub fn payload_len(&self) -> u16 {
        (1 + 1 + self.cert_id.len() + 2 + self.signature_data.len()) as u16
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(UNIT_HEADER_LEN + self.payload_len() as usize);
        put_unit_header(&mut w, UNIT_TYPE_SIGNATURE, self.index, self.payload_len());
        w.put_u8(self.algorithm as u8);
        w.put_u8(self.cert_id.len() as u8);
        w.put_bytes(&self.cert_id);
        w.put_u16be(self.signature_data.len() as u16);
        w.put_bytes(&self.signature_data);
        w.into_bytes()
    }
}

/**
    Type 0x01. ChinaDRM-only unit binding a content id to its key ids:
    ContentId(8) | per kid: KidLen(1) | Kid.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub index: u8,
    pub content_id: u64,
    pub kids: Vec<String>,
}

impl Content {
    pub fn new(
        index: u8,
        content_id: u64,
        kids: impl IntoIterator<Item = String>,
    ) -> Result<Self, FormatError> {
        let kids: Vec<String> = kids.into_iter().collect();
        for kid in &kids {
            if kid.len() > u8::MAX as usize {
                return Err(FormatError::KidTooLong(kid.len()));
            }
        }
        Ok(Self {
            index,
            content_id,
            kids,
        })
    }

    pub fn payload_len(&self) -> u16 {
        let kids: usize = self.kids.iter().map(|k| 1 + k.len()).sum();
        (8 + kids) as u16
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(UNIT_HEADER_LEN + self.payload_len() as usize);
        put_unit_header(&mut w, UNIT_TYPE_CONTENT, self.index, self.payload_len());
        w.put_u64be(self.content_id);
        for kid in &self.kids {
            w.put_u8(kid.len() as u8);
            w.put_bytes(kid.as_bytes());
        }
        w.into_bytes()
    }
}
