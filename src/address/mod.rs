// ============================================================================
// Metadata Address Codec
// ============================================================================
//
// Every stored entity is keyed by a type-tagged byte sequence derived from its
// logical identity. The first byte is the kind tag; the tag fixes the total
// length and which components follow it.
//
//   Scope                 0x00 | scope uuid                         17 bytes
//   Session               0x01 | scope uuid | session uuid          33 bytes
//   Record                0x02 | scope uuid | name hash             33 bytes
//   ContractSpecification 0x03 | spec uuid                          17 bytes
//   ScopeSpecification    0x04 | spec uuid                          17 bytes
//   RecordSpecification   0x05 | contract spec uuid | name hash     33 bytes
//
// ============================================================================

use crate::core::{MetaError, Result};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const UUID_LEN: usize = 16;
const NAME_HASH_LEN: usize = 16;
const SHORT_LEN: usize = 1 + UUID_LEN;
const LONG_LEN: usize = 1 + UUID_LEN + UUID_LEN;

/// Entity kind encoded in the leading tag byte of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AddressKind {
    Scope,
    Session,
    Record,
    ContractSpecification,
    ScopeSpecification,
    RecordSpecification,
}

impl AddressKind {
    pub const ALL: [AddressKind; 6] = [
        AddressKind::Scope,
        AddressKind::Session,
        AddressKind::Record,
        AddressKind::ContractSpecification,
        AddressKind::ScopeSpecification,
        AddressKind::RecordSpecification,
    ];

    pub fn tag(self) -> u8 {
        match self {
            AddressKind::Scope => 0x00,
            AddressKind::Session => 0x01,
            AddressKind::Record => 0x02,
            AddressKind::ContractSpecification => 0x03,
            AddressKind::ScopeSpecification => 0x04,
            AddressKind::RecordSpecification => 0x05,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Total encoded length for addresses of this kind.
    pub fn encoded_len(self) -> usize {
        match self {
            AddressKind::Scope
            | AddressKind::ContractSpecification
            | AddressKind::ScopeSpecification => SHORT_LEN,
            AddressKind::Session | AddressKind::Record | AddressKind::RecordSpecification => {
                LONG_LEN
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AddressKind::Scope => "scope",
            AddressKind::Session => "session",
            AddressKind::Record => "record",
            AddressKind::ContractSpecification => "contractspec",
            AddressKind::ScopeSpecification => "scopespec",
            AddressKind::RecordSpecification => "recspec",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// First 16 bytes of the SHA-256 of a normalized (trimmed, lowercased) name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameHash([u8; NAME_HASH_LEN]);

impl NameHash {
    pub fn of(name: &str) -> Result<Self> {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(MetaError::InvalidInputKind(
                "name cannot be empty".to_string(),
            ));
        }
        let digest = Sha256::digest(normalized.as_bytes());
        let mut bytes = [0u8; NAME_HASH_LEN];
        bytes.copy_from_slice(&digest[..NAME_HASH_LEN]);
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; NAME_HASH_LEN] {
        &self.0
    }
}

/// Secondary identity component supplied to [`MetadataAddress::derive`].
#[derive(Debug, Clone, Copy)]
pub enum Secondary<'a> {
    None,
    Uuid(Uuid),
    Name(&'a str),
}

/// Deterministic, type-tagged storage key for a metadata entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataAddress {
    Scope {
        scope_uuid: Uuid,
    },
    Session {
        scope_uuid: Uuid,
        session_uuid: Uuid,
    },
    Record {
        scope_uuid: Uuid,
        name_hash: NameHash,
    },
    ContractSpecification {
        spec_uuid: Uuid,
    },
    ScopeSpecification {
        spec_uuid: Uuid,
    },
    RecordSpecification {
        contract_spec_uuid: Uuid,
        name_hash: NameHash,
    },
}

impl MetadataAddress {
    pub fn scope(scope_uuid: Uuid) -> Self {
        MetadataAddress::Scope { scope_uuid }
    }

    pub fn session(scope_uuid: Uuid, session_uuid: Uuid) -> Self {
        MetadataAddress::Session {
            scope_uuid,
            session_uuid,
        }
    }

    pub fn record(scope_uuid: Uuid, name: &str) -> Result<Self> {
        Ok(MetadataAddress::Record {
            scope_uuid,
            name_hash: NameHash::of(name)?,
        })
    }

    pub fn contract_specification(spec_uuid: Uuid) -> Self {
        MetadataAddress::ContractSpecification { spec_uuid }
    }

    pub fn scope_specification(spec_uuid: Uuid) -> Self {
        MetadataAddress::ScopeSpecification { spec_uuid }
    }

    pub fn record_specification(contract_spec_uuid: Uuid, name: &str) -> Result<Self> {
        Ok(MetadataAddress::RecordSpecification {
            contract_spec_uuid,
            name_hash: NameHash::of(name)?,
        })
    }

    /// Derives an address from a kind and its identity inputs.
    ///
    /// Fails with `InvalidInputKind` when the secondary input does not have
    /// the shape the kind requires, or when a name cannot be hashed.
    pub fn derive(kind: AddressKind, primary: Uuid, secondary: Secondary<'_>) -> Result<Self> {
        match (kind, secondary) {
            (AddressKind::Scope, Secondary::None) => Ok(Self::scope(primary)),
            (AddressKind::ContractSpecification, Secondary::None) => {
                Ok(Self::contract_specification(primary))
            }
            (AddressKind::ScopeSpecification, Secondary::None) => {
                Ok(Self::scope_specification(primary))
            }
            (AddressKind::Session, Secondary::Uuid(session_uuid)) => {
                Ok(Self::session(primary, session_uuid))
            }
            (AddressKind::Record, Secondary::Name(name)) => Self::record(primary, name),
            (AddressKind::RecordSpecification, Secondary::Name(name)) => {
                Self::record_specification(primary, name)
            }
            (kind, secondary) => Err(MetaError::InvalidInputKind(format!(
                "{} address cannot be derived from {:?}",
                kind, secondary
            ))),
        }
    }

    pub fn kind(&self) -> AddressKind {
        match self {
            MetadataAddress::Scope { .. } => AddressKind::Scope,
            MetadataAddress::Session { .. } => AddressKind::Session,
            MetadataAddress::Record { .. } => AddressKind::Record,
            MetadataAddress::ContractSpecification { .. } => AddressKind::ContractSpecification,
            MetadataAddress::ScopeSpecification { .. } => AddressKind::ScopeSpecification,
            MetadataAddress::RecordSpecification { .. } => AddressKind::RecordSpecification,
        }
    }

    pub fn is_kind(&self, kind: AddressKind) -> bool {
        self.kind() == kind
    }

    /// The leading uuid: the scope uuid for scope-bound kinds, the
    /// specification uuid otherwise.
    pub fn primary_uuid(&self) -> Uuid {
        match *self {
            MetadataAddress::Scope { scope_uuid }
            | MetadataAddress::Session { scope_uuid, .. }
            | MetadataAddress::Record { scope_uuid, .. } => scope_uuid,
            MetadataAddress::ContractSpecification { spec_uuid }
            | MetadataAddress::ScopeSpecification { spec_uuid } => spec_uuid,
            MetadataAddress::RecordSpecification {
                contract_spec_uuid, ..
            } => contract_spec_uuid,
        }
    }

    /// Scope that owns this scope, session or record.
    pub fn scope_address(&self) -> Result<MetadataAddress> {
        match *self {
            MetadataAddress::Scope { .. } => Ok(*self),
            MetadataAddress::Session { scope_uuid, .. }
            | MetadataAddress::Record { scope_uuid, .. } => Ok(Self::scope(scope_uuid)),
            other => Err(MetaError::InvalidInputKind(format!(
                "{} address has no owning scope",
                other.kind()
            ))),
        }
    }

    /// Parent contract specification of a record specification, read from the
    /// address layout.
    pub fn contract_spec_address(&self) -> Result<MetadataAddress> {
        match *self {
            MetadataAddress::ContractSpecification { .. } => Ok(*self),
            MetadataAddress::RecordSpecification {
                contract_spec_uuid, ..
            } => Ok(Self::contract_specification(contract_spec_uuid)),
            other => Err(MetaError::InvalidInputKind(format!(
                "{} address has no contract specification",
                other.kind()
            ))),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.kind().encoded_len());
        bytes.push(self.kind().tag());
        match self {
            MetadataAddress::Scope { scope_uuid } => bytes.extend_from_slice(scope_uuid.as_bytes()),
            MetadataAddress::Session {
                scope_uuid,
                session_uuid,
            } => {
                bytes.extend_from_slice(scope_uuid.as_bytes());
                bytes.extend_from_slice(session_uuid.as_bytes());
            }
            MetadataAddress::Record {
                scope_uuid,
                name_hash,
            } => {
                bytes.extend_from_slice(scope_uuid.as_bytes());
                bytes.extend_from_slice(name_hash.as_bytes());
            }
            MetadataAddress::ContractSpecification { spec_uuid }
            | MetadataAddress::ScopeSpecification { spec_uuid } => {
                bytes.extend_from_slice(spec_uuid.as_bytes())
            }
            MetadataAddress::RecordSpecification {
                contract_spec_uuid,
                name_hash,
            } => {
                bytes.extend_from_slice(contract_spec_uuid.as_bytes());
                bytes.extend_from_slice(name_hash.as_bytes());
            }
        }
        bytes
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let (&tag, rest) = bytes
            .split_first()
            .ok_or_else(|| MetaError::MalformedAddress("address is empty".to_string()))?;
        let kind = AddressKind::from_tag(tag).ok_or_else(|| {
            MetaError::MalformedAddress(format!("unknown address type tag 0x{:02x}", tag))
        })?;
        if bytes.len() != kind.encoded_len() {
            return Err(MetaError::MalformedAddress(format!(
                "{} address must be {} bytes, got {}",
                kind,
                kind.encoded_len(),
                bytes.len()
            )));
        }

        let primary = read_uuid(&rest[..UUID_LEN]);
        let address = match kind {
            AddressKind::Scope => Self::scope(primary),
            AddressKind::ContractSpecification => Self::contract_specification(primary),
            AddressKind::ScopeSpecification => Self::scope_specification(primary),
            AddressKind::Session => Self::session(primary, read_uuid(&rest[UUID_LEN..])),
            AddressKind::Record => MetadataAddress::Record {
                scope_uuid: primary,
                name_hash: read_name_hash(&rest[UUID_LEN..]),
            },
            AddressKind::RecordSpecification => MetadataAddress::RecordSpecification {
                contract_spec_uuid: primary,
                name_hash: read_name_hash(&rest[UUID_LEN..]),
            },
        };
        Ok(address)
    }

    /// Prefix selecting every stored entity of `kind`.
    pub fn kind_prefix(kind: AddressKind) -> Vec<u8> {
        vec![kind.tag()]
    }

    /// Prefix selecting the sessions stored under this scope.
    pub fn scope_session_prefix(&self) -> Result<Vec<u8>> {
        self.child_prefix(AddressKind::Session)
    }

    /// Prefix selecting the records stored under this scope.
    pub fn scope_record_prefix(&self) -> Result<Vec<u8>> {
        self.child_prefix(AddressKind::Record)
    }

    /// Prefix selecting the record specifications under this contract
    /// specification.
    pub fn contract_spec_record_spec_prefix(&self) -> Result<Vec<u8>> {
        self.child_prefix(AddressKind::RecordSpecification)
    }

    fn child_prefix(&self, child: AddressKind) -> Result<Vec<u8>> {
        let parent_ok = match child {
            AddressKind::Session | AddressKind::Record => matches!(
                self,
                MetadataAddress::Scope { .. }
                    | MetadataAddress::Session { .. }
                    | MetadataAddress::Record { .. }
            ),
            AddressKind::RecordSpecification => matches!(
                self,
                MetadataAddress::ContractSpecification { .. }
                    | MetadataAddress::RecordSpecification { .. }
            ),
            _ => false,
        };
        if !parent_ok {
            return Err(MetaError::InvalidInputKind(format!(
                "cannot iterate {} entries under a {} address",
                child,
                self.kind()
            )));
        }
        let mut prefix = Vec::with_capacity(SHORT_LEN);
        prefix.push(child.tag());
        prefix.extend_from_slice(self.primary_uuid().as_bytes());
        Ok(prefix)
    }
}

fn read_uuid(bytes: &[u8]) -> Uuid {
    let mut raw = [0u8; UUID_LEN];
    raw.copy_from_slice(&bytes[..UUID_LEN]);
    Uuid::from_bytes(raw)
}

fn read_name_hash(bytes: &[u8]) -> NameHash {
    let mut raw = [0u8; NAME_HASH_LEN];
    raw.copy_from_slice(&bytes[..NAME_HASH_LEN]);
    NameHash(raw)
}

impl fmt::Display for MetadataAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), hex::encode(self.to_bytes()))
    }
}

impl FromStr for MetadataAddress {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, encoded) = s
            .split_once(':')
            .ok_or_else(|| MetaError::MalformedAddress(format!("missing kind prefix in '{}'", s)))?;
        let kind = AddressKind::from_name(name)
            .ok_or_else(|| MetaError::MalformedAddress(format!("unknown address kind '{}'", name)))?;
        let bytes = hex::decode(encoded)
            .map_err(|e| MetaError::MalformedAddress(format!("invalid hex in '{}': {}", s, e)))?;
        let address = Self::parse(&bytes)?;
        if address.kind() != kind {
            return Err(MetaError::MalformedAddress(format!(
                "kind prefix '{}' does not match encoded {} address",
                name,
                address.kind()
            )));
        }
        Ok(address)
    }
}

impl Serialize for MetadataAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_bytes(&self.to_bytes())
        }
    }
}

impl<'de> Deserialize<'de> for MetadataAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_str(AddressVisitor)
        } else {
            deserializer.deserialize_bytes(AddressVisitor)
        }
    }
}

struct AddressVisitor;

impl<'de> Visitor<'de> for AddressVisitor {
    type Value = MetadataAddress;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a metadata address")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> std::result::Result<Self::Value, E> {
        MetadataAddress::parse(v).map_err(E::custom)
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
        let mut bytes = Vec::with_capacity(LONG_LEN);
        while let Some(byte) = seq.next_element::<u8>()? {
            bytes.push(byte);
        }
        MetadataAddress::parse(&bytes).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid(n: u8) -> Uuid {
        Uuid::from_bytes([n; 16])
    }

    #[test]
    fn test_derive_is_deterministic() {
        let a = MetadataAddress::derive(AddressKind::Record, uuid(1), Secondary::Name("Deed")).unwrap();
        let b = MetadataAddress::derive(AddressKind::Record, uuid(1), Secondary::Name("Deed")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_record_name_is_normalized() {
        let a = MetadataAddress::record(uuid(1), "  Deed ").unwrap();
        let b = MetadataAddress::record(uuid(1), "deed").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_kinds_never_collide_on_same_uuid() {
        let id = uuid(7);
        let addresses = [
            MetadataAddress::scope(id),
            MetadataAddress::contract_specification(id),
            MetadataAddress::scope_specification(id),
            MetadataAddress::session(id, id),
            MetadataAddress::record(id, "x").unwrap(),
            MetadataAddress::record_specification(id, "x").unwrap(),
        ];
        for (i, a) in addresses.iter().enumerate() {
            for b in &addresses[i + 1..] {
                assert_ne!(a.to_bytes(), b.to_bytes());
            }
        }
    }

    #[test]
    fn test_parse_round_trip_for_every_kind() {
        let addresses = [
            MetadataAddress::scope(uuid(1)),
            MetadataAddress::session(uuid(1), uuid(2)),
            MetadataAddress::record(uuid(1), "income").unwrap(),
            MetadataAddress::contract_specification(uuid(3)),
            MetadataAddress::scope_specification(uuid(4)),
            MetadataAddress::record_specification(uuid(3), "income").unwrap(),
        ];
        for address in addresses {
            let parsed = MetadataAddress::parse(&address.to_bytes()).unwrap();
            assert_eq!(parsed, address);
            assert_eq!(parsed.to_bytes().len(), address.kind().encoded_len());
        }
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(MetadataAddress::parse(&[]), Err(MetaError::MalformedAddress(_))));
        assert!(matches!(MetadataAddress::parse(&[0x09; 17]), Err(MetaError::MalformedAddress(_))));

        let mut truncated = MetadataAddress::session(uuid(1), uuid(2)).to_bytes();
        truncated.pop();
        assert!(matches!(MetadataAddress::parse(&truncated), Err(MetaError::MalformedAddress(_))));
    }

    #[test]
    fn test_derive_rejects_wrong_secondary() {
        let err = MetadataAddress::derive(AddressKind::Session, uuid(1), Secondary::Name("x")).unwrap_err();
        assert!(matches!(err, MetaError::InvalidInputKind(_)));

        let err = MetadataAddress::derive(AddressKind::Record, uuid(1), Secondary::Name("   ")).unwrap_err();
        assert!(matches!(err, MetaError::InvalidInputKind(_)));
    }

    #[test]
    fn test_record_spec_parent_is_read_from_layout() {
        let child = MetadataAddress::record_specification(uuid(9), "appraisal").unwrap();
        assert_eq!(
            child.contract_spec_address().unwrap(),
            MetadataAddress::contract_specification(uuid(9))
        );
    }

    #[test]
    fn test_iteration_prefixes() {
        let scope = MetadataAddress::scope(uuid(5));
        let session = MetadataAddress::session(uuid(5), uuid(6));
        let record = MetadataAddress::record(uuid(5), "r").unwrap();

        assert!(session.to_bytes().starts_with(&scope.scope_session_prefix().unwrap()));
        assert!(record.to_bytes().starts_with(&scope.scope_record_prefix().unwrap()));
        assert!(!record.to_bytes().starts_with(&scope.scope_session_prefix().unwrap()));
        assert!(MetadataAddress::contract_specification(uuid(5)).scope_record_prefix().is_err());
    }

    #[test]
    fn test_string_form_round_trip() {
        let address = MetadataAddress::session(uuid(1), uuid(2));
        let text = address.to_string();
        assert!(text.starts_with("session:01"));
        assert_eq!(text.parse::<MetadataAddress>().unwrap(), address);
        assert!("scope:01".parse::<MetadataAddress>().is_err());
    }

    #[test]
    fn test_serde_binary_and_json() {
        let address = MetadataAddress::record(uuid(1), "r").unwrap();
        let packed = rmp_serde::to_vec(&address).unwrap();
        let unpacked: MetadataAddress = rmp_serde::from_slice(&packed).unwrap();
        assert_eq!(unpacked, address);

        let json = serde_json::to_string(&address).unwrap();
        assert!(json.starts_with("\"record:02"));
        let back: MetadataAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
