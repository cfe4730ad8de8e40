//! Address derivation and parsing through the public API

use metaledger::{AddressKind, ErrorKind, MetaError, MetadataAddress, Secondary};
use std::collections::HashSet;
use uuid::Uuid;

const PRIMARY: Uuid = Uuid::from_bytes([0xab; 16]);
const SECONDARY: Uuid = Uuid::from_bytes([0xcd; 16]);

fn derive_all() -> Vec<MetadataAddress> {
    AddressKind::ALL
        .iter()
        .map(|&kind| {
            let secondary = match kind {
                AddressKind::Session => Secondary::Uuid(SECONDARY),
                AddressKind::Record | AddressKind::RecordSpecification => Secondary::Name("deed"),
                _ => Secondary::None,
            };
            MetadataAddress::derive(kind, PRIMARY, secondary).unwrap()
        })
        .collect()
}

#[test]
fn test_kinds_never_collide_on_same_identity() {
    let addresses = derive_all();
    let bytes: HashSet<Vec<u8>> = addresses.iter().map(MetadataAddress::to_bytes).collect();
    assert_eq!(bytes.len(), AddressKind::ALL.len());
}

#[test]
fn test_every_kind_parses_back() {
    for address in derive_all() {
        let bytes = address.to_bytes();
        assert_eq!(bytes.len(), address.kind().encoded_len());
        assert_eq!(MetadataAddress::parse(&bytes).unwrap(), address);
        assert_eq!(address.to_string().parse::<MetadataAddress>().unwrap(), address);
        assert_eq!(address.primary_uuid(), PRIMARY);
    }
}

#[test]
fn test_parse_rejects_inconsistent_bytes() {
    let mut bytes = MetadataAddress::scope(PRIMARY).to_bytes();
    bytes.push(0);
    assert_eq!(
        MetadataAddress::parse(&bytes).unwrap_err().kind(),
        ErrorKind::MalformedAddress
    );

    bytes[0] = 0x7f;
    assert!(matches!(
        MetadataAddress::parse(&bytes),
        Err(MetaError::MalformedAddress(_))
    ));
    assert!(MetadataAddress::parse(&[]).is_err());
}

#[test]
fn test_wrong_secondary_input_is_rejected() {
    let err = MetadataAddress::derive(AddressKind::Session, PRIMARY, Secondary::Name("deed"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInputKind);

    let err = MetadataAddress::record(PRIMARY, "   ").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInputKind);
}

#[test]
fn test_children_share_parent_prefix() {
    let scope = MetadataAddress::scope(PRIMARY);
    let session = MetadataAddress::session(PRIMARY, SECONDARY);
    let record = MetadataAddress::record(PRIMARY, "deed").unwrap();

    assert!(session.to_bytes().starts_with(&scope.scope_session_prefix().unwrap()));
    assert!(record.to_bytes().starts_with(&scope.scope_record_prefix().unwrap()));
    assert_eq!(session.scope_address().unwrap(), scope);
    assert_eq!(record.scope_address().unwrap(), scope);

    let spec = MetadataAddress::contract_specification(PRIMARY);
    let record_spec = MetadataAddress::record_specification(PRIMARY, "deed").unwrap();
    assert!(record_spec
        .to_bytes()
        .starts_with(&spec.contract_spec_record_spec_prefix().unwrap()));
    assert_eq!(metaledger::spec::record_spec_parent(&record_spec).unwrap(), spec);
}
