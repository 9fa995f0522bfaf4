/*!
    License assembly and the signing envelope.

    A license is a flat, ordered run of units. The canonical byte
    stream excludes the Signature unit; the signer covers exactly those
    bytes, after which the stream is re-emitted with the Signature unit
    appended and base64-encoded for delivery.
*/

use data_encoding::BASE64;
use drm_core::Writer;

use crate::error::FormatError;
use crate::units::{
    Algorithm, AuthorizedObject, Content, Counter, Key, KeyKind, KeyRule, LicenseHeader,
    ObjectType, Policy, Right, Signature,
};

/// Current license format version.
pub const LICENSE_VERSION: u8 = 1;

/// Placeholder license id; deployments allocate unique ids.
pub const DEFAULT_LICENSE_ID: u64 = 1234567890;

/// One year and one day, in seconds.
const VALIDITY_SECS: u64 = 366 * 24 * 60 * 60;

/**
    GY/T 277-2014 baseline license.

    Canonical unit order:
    Header | Keys | AuthorizedObjects | Rights | Policies | [Counter] | [Signature].
*/
#[derive(Debug, Clone)]
pub struct CommonLicense {
    pub header: LicenseHeader,
    pub keys: Vec<Key>,
    pub objects: Vec<AuthorizedObject>,
    pub rights: Vec<Right>,
    pub policies: Vec<Policy>,
    pub counter: Counter,
    pub signature: Signature,
}

impl CommonLicense {
    /**
        Assemble a license over pre-derived content keys.

        `keys` pairs each KID with its 16-byte content key. Every KID
        gets one Key unit and one Policy unit whose time window opens
        at `valid_from` (epoch seconds) and closes a year and a day
        later. Each subject id becomes an account AuthorizedObject.
    */
    pub fn new(
        keys: &[(String, [u8; 16])],
        subject_ids: &[String],
        cert_id: &str,
        valid_from: u64,
    ) -> Result<Self, FormatError> {
        if keys.is_empty() {
            return Err(FormatError::EmptyKidList);
        }

        let valid_until = valid_from + VALIDITY_SECS;

        let mut key_units = Vec::with_capacity(keys.len());
        let mut policies = Vec::with_capacity(keys.len());
        for (i, (kid, key)) in keys.iter().enumerate() {
            let index = (i + 1) as u8;
            policies.push(Policy::new(
                index,
                KeyKind::Content,
                kid.clone(),
                vec![
                    KeyRule::start_time(valid_from as u32),
                    KeyRule::end_time(valid_until as u32),
                ],
            )?);
            key_units.push(Key {
                index,
                algorithm: Algorithm::Aes128,
                key_data: key.to_vec(),
                kind: KeyKind::Content,
                kid: kid.clone(),
            });
        }

        let objects = subject_ids
            .iter()
            .enumerate()
            .map(|(i, id)| AuthorizedObject {
                index: (i + 1) as u8,
                object_type: ObjectType::Account,
                object_id: id.as_bytes().to_vec(),
            })
            .collect();

        // Advisory; consumers frame by per-unit Length, never by this.
        let units_num = (2 * keys.len() + subject_ids.len() + 1) as u8;

        Ok(Self {
            header: LicenseHeader {
                version: LICENSE_VERSION,
                id: DEFAULT_LICENSE_ID,
                units_num,
            },
            keys: key_units,
            objects,
            rights: vec![Right::play(1)],
            policies,
            counter: Counter::empty_and(1),
            signature: Signature::new(1, Algorithm::RsaSha1_1024, cert_id.as_bytes().to_vec())?,
        })
    }

    /**
        Emit the license byte stream.

        `with_signature = false` produces the canonical bytes the
        signature is computed over.
    */
    pub fn serialize(&self, with_counter: bool, with_signature: bool) -> Vec<u8> {
        let mut w = Writer::new();
        w.put_bytes(&self.header.to_bytes());
        for key in &self.keys {
            w.put_bytes(&key.to_bytes());
        }
        for object in &self.objects {
            w.put_bytes(&object.to_bytes());
        }
        for right in &self.rights {
            w.put_bytes(&right.to_bytes());
        }
        for policy in &self.policies {
            w.put_bytes(&policy.to_bytes());
        }
        if with_counter {
            w.put_bytes(&self.counter.to_bytes());
        }
        if with_signature {
            w.put_bytes(&self.signature.to_bytes());
        }
        w.into_bytes()
    }

    /**
        The bytes a verifier reconstructs without the signature.
    */
    pub fn canonical_bytes(&self, with_counter: bool) -> Vec<u8> {
        self.serialize(with_counter, false)
    }

    /**
        Fill the Signature unit after signing the canonical bytes.
    */
    pub fn set_signature(&mut self, signature: Vec<u8>) {
        self.signature.set_signature(signature);
    }

    /**
        Final signed stream, base64-encoded (standard alphabet, padded).
    */
    pub fn base64(&self, with_counter: bool) -> String {
        BASE64.encode(&self.serialize(with_counter, true))
    }
}

/**
    ChinaDRM license: the GY/T 277 baseline plus a Content unit bound
    between the common body and the Signature unit.
*/
#[derive(Debug, Clone)]
pub struct ChinaDrmLicense {
    pub common: CommonLicense,
    pub content: Content,
}

impl ChinaDrmLicense {
    pub fn new(
        content_id: u64,
        keys: &[(String, [u8; 16])],
        subject_ids: &[String],
        cert_id: &str,
        valid_from: u64,
    ) -> Result<Self, FormatError> {
        let common = CommonLicense::new(keys, subject_ids, cert_id, valid_from)?;
        let content = Content::new(
            0x01,
            content_id,
            keys.iter().map(|(kid, _)| kid.clone()),
        )?;
        Ok(Self { common, content })
    }

    pub fn serialize(&self, with_counter: bool, with_signature: bool) -> Vec<u8> {
        let mut w = Writer::new();
        w.put_bytes(&self.common.serialize(with_counter, false));
        w.put_bytes(&self.content.to_bytes());
        if with_signature {
            w.put_bytes(&self.common.signature.to_bytes());
        }
        w.into_bytes()
    }

    pub fn canonical_bytes(&self, with_counter: bool) -> Vec<u8> {
        self.serialize(with_counter, false)
    }

    pub fn set_signature(&mut self, signature: Vec<u8>) {
        self.common.set_signature(signature);
    }

    pub fn base64(&self, with_counter: bool) -> String {
        BASE64.encode(&self.serialize(with_counter, true))
    }
}

/**
    Either license flavor, dispatched by containment.
*/
#[derive(Debug, Clone)]
pub enum License {
    Common(CommonLicense),
    ChinaDrm(ChinaDrmLicense),
}

impl License {
    pub fn serialize(&self, with_counter: bool, with_signature: bool) -> Vec<u8> {
        match self {
            Self::Common(license) => license.serialize(with_counter, with_signature),
            Self::ChinaDrm(license) => license.serialize(with_counter, with_signature),
        }
    }

    pub fn canonical_bytes(&self, with_counter: bool) -> Vec<u8> {
        self.serialize(with_counter, false)
    }

    pub fn set_signature(&mut self, signature: Vec<u8>) {
        match self {
            Self::Common(license) => license.set_signature(signature),
            Self::ChinaDrm(license) => license.set_signature(signature),
        }
    }

    pub fn base64(&self, with_counter: bool) -> String {
        match self {
            Self::Common(license) => license.base64(with_counter),
            Self::ChinaDrm(license) => license.base64(with_counter),
        }
    }
}

impl From<CommonLicense> for License {
    fn from(license: CommonLicense) -> Self {
        Self::Common(license)
    }
}

impl From<ChinaDrmLicense> for License {
    fn from(license: ChinaDrmLicense) -> Self {
        Self::ChinaDrm(license)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{CounterOp, KeyRuleType, UNIT_HEADER_LEN, UNIT_TYPE_SIGNATURE};
    use drm_core::Reader;

    const VALID_FROM: u64 = 1_700_000_000;

    fn sample_keys() -> Vec<(String, [u8; 16])> {
        vec![
            ("123456789".to_string(), [0x11; 16]),
            ("987345678".to_string(), [0x22; 16]),
        ]
    }

    fn sample_subjects() -> Vec<String> {
        vec![
            "579de65b-67af-4041-9267-3db266102964".to_string(),
            "7429c039-c614-489e-af15-1f109cc4f908".to_string(),
        ]
    }

    const CERT_ID: &str = "b8c35868-0a5d-4b0e-9f03-ef77e363b1de";

    fn sample_common() -> CommonLicense {
        CommonLicense::new(&sample_keys(), &sample_subjects(), CERT_ID, VALID_FROM).unwrap()
    }

    /// Walk a serialized stream into (type, index, payload) triples,
    /// framing by each unit's Length field.
    fn walk_units(bytes: &[u8]) -> Vec<(u8, u8, Vec<u8>)> {
        let mut r = Reader::new(bytes);
        let mut units = Vec::new();
        while r.remaining() > 0 {
            let unit_type = r.read_u8().unwrap();
            let index = r.read_u8().unwrap();
            let length = r.read_u16be().unwrap() as usize;
            let payload = r.read_bytes(length).unwrap().to_vec();
            units.push((unit_type, index, payload));
        }
        units
    }

    #[test]
    fn unit_order_and_count() {
        let mut license = sample_common();
        license.set_signature(vec![0xCD; 128]);
        let bytes = license.serialize(true, true);

        let units = walk_units(&bytes);
        let types: Vec<u8> = units.iter().map(|(t, _, _)| *t).collect();
        assert_eq!(
            types,
            [0x00, 0x03, 0x03, 0x02, 0x02, 0x10, 0x04, 0x04, 0xA0, 0xFF]
        );

        // Header at offset 0, index 0; every other unit indexed from 1.
        assert_eq!(units[0].1, 0);
        assert!(units[1..].iter().all(|(_, index, _)| *index >= 1));

        // 2 kids, 2 subjects: advisory count is 2k + s + 1.
        assert_eq!(license.header.units_num, 7);
        assert_eq!(units[0].2[9], 7);
    }

    #[test]
    fn every_unit_length_matches_payload() {
        let mut license = sample_common();
        license.set_signature(vec![0xCD; 128]);
        let bytes = license.serialize(true, true);

        // walk_units frames by Length; consuming the whole stream with
        // no leftover proves Length == payload size for every unit.
        let units = walk_units(&bytes);
        let total: usize = units
            .iter()
            .map(|(_, _, payload)| UNIT_HEADER_LEN + payload.len())
            .sum();
        assert_eq!(total, bytes.len());
    }

    #[test]
    fn each_kid_has_one_key_and_one_policy() {
        let license = sample_common();
        for (kid, key) in sample_keys() {
            let keys: Vec<_> = license.keys.iter().filter(|k| k.kid == kid).collect();
            assert_eq!(keys.len(), 1);
            assert_eq!(keys[0].key_data, key);
            assert_eq!(
                license.policies.iter().filter(|p| p.kid == kid).count(),
                1
            );
        }
    }

    #[test]
    fn policy_window_is_a_year_and_a_day() {
        let license = sample_common();
        let policy = &license.policies[0];
        assert_eq!(policy.rules.len(), 2);
        assert_eq!(policy.rules[0].rule_type, KeyRuleType::StartTime);
        assert_eq!(policy.rules[1].rule_type, KeyRuleType::EndTime);

        let start = u32::from_be_bytes(policy.rules[0].data.clone().try_into().unwrap());
        let end = u32::from_be_bytes(policy.rules[1].data.clone().try_into().unwrap());
        assert_eq!(start, VALID_FROM as u32);
        assert_eq!(u64::from(end - start), 366 * 24 * 60 * 60);
    }

    #[test]
    fn counter_defaults_to_empty_and() {
        let license = sample_common();
        assert_eq!(license.counter.op, CounterOp::And);
        assert!(license.counter.rights_indices.is_empty());

        // Omitted counter drops its unit from the stream.
        let with = license.serialize(true, false);
        let without = license.serialize(false, false);
        assert_eq!(with.len(), without.len() + 8);
    }

    #[test]
    fn signed_stream_extends_canonical_bytes() {
        let mut license = sample_common();
        let canonical = license.canonical_bytes(true);

        license.set_signature(vec![0xAB; 128]);
        let signed = license.serialize(true, true);

        // Stripping the Signature unit recovers the signed-over bytes.
        assert!(signed.starts_with(&canonical));
        assert_eq!(&signed[canonical.len()..], license.signature.to_bytes());

        // Filling the signature must not disturb the canonical bytes.
        assert_eq!(license.canonical_bytes(true), canonical);
    }

    #[test]
    fn base64_round_trip() {
        let mut license = sample_common();
        license.set_signature(vec![0x5A; 128]);
        let encoded = license.base64(true);
        let decoded = data_encoding::BASE64.decode(encoded.as_bytes()).unwrap();
        assert_eq!(decoded, license.serialize(true, true));
    }

    #[test]
    fn empty_kid_list_rejected() {
        let err = CommonLicense::new(&[], &sample_subjects(), CERT_ID, VALID_FROM).unwrap_err();
        assert!(matches!(err, FormatError::EmptyKidList));
    }

    #[test]
    fn oversized_kid_rejected() {
        let keys = vec![("k".repeat(300), [0u8; 16])];
        let err = CommonLicense::new(&keys, &sample_subjects(), CERT_ID, VALID_FROM).unwrap_err();
        assert!(matches!(err, FormatError::KidTooLong(300)));
    }

    #[test]
    fn chinadrm_appends_content_before_signature() {
        let mut license =
            ChinaDrmLicense::new(12_345_678_900, &sample_keys(), &sample_subjects(), CERT_ID, VALID_FROM)
                .unwrap();
        license.set_signature(vec![0xEE; 128]);
        let bytes = license.serialize(true, true);

        let units = walk_units(&bytes);
        let types: Vec<u8> = units.iter().map(|(t, _, _)| *t).collect();
        assert_eq!(
            types,
            [0x00, 0x03, 0x03, 0x02, 0x02, 0x10, 0x04, 0x04, 0xA0, 0x01, 0xFF]
        );

        // Content payload: ContentId(8) then (len, kid) per kid.
        let (_, index, payload) = &units[9];
        assert_eq!(*index, 0x01);
        let mut r = Reader::new(payload);
        assert_eq!(r.read_u64be().unwrap(), 12_345_678_900);
        assert_eq!(r.read_u8().unwrap(), 9);
        assert_eq!(r.read_bytes(9).unwrap(), b"123456789");
        assert_eq!(r.read_u8().unwrap(), 9);
        assert_eq!(r.read_bytes(9).unwrap(), b"987345678");

        // Signature stays terminal.
        assert_eq!(units.last().unwrap().0, UNIT_TYPE_SIGNATURE);
    }

    #[test]
    fn chinadrm_canonical_bytes_include_content() {
        let mut license =
            ChinaDrmLicense::new(7, &sample_keys(), &sample_subjects(), CERT_ID, VALID_FROM)
                .unwrap();
        let canonical = license.canonical_bytes(true);
        assert!(canonical.ends_with(&license.content.to_bytes()));

        license.set_signature(vec![0x99; 128]);
        let signed = license.serialize(true, true);
        assert!(signed.starts_with(&canonical));
    }

    #[test]
    fn license_enum_dispatches_both_flavors() {
        let mut common: License = sample_common().into();
        let mut chinadrm: License =
            ChinaDrmLicense::new(1, &sample_keys(), &sample_subjects(), CERT_ID, VALID_FROM)
                .unwrap()
                .into();

        for license in [&mut common, &mut chinadrm] {
            let canonical = license.canonical_bytes(true);
            license.set_signature(vec![0x42; 128]);
            let signed = license.serialize(true, true);
            assert!(signed.starts_with(&canonical));
            assert_eq!(
                data_encoding::BASE64
                    .decode(license.base64(true).as_bytes())
                    .unwrap(),
                signed
            );
        }
    }
}
