//! Shared fixtures for the integration tests

#![allow(dead_code)]

use metaledger::{
    AccountAddress, ContractSource, ContractSpecification, DefinitionType, InputSource,
    InputSpecification, MetadataAddress, MetadataKeeper, MetadataMsg, Party, PartyType, Process,
    ProcessId, Record, RecordInput, RecordInputSource, RecordInputStatus, RecordOutput,
    RecordSpecification, ResultStatus, Scope, Session,
};
use uuid::Uuid;

pub const SCOPE: Uuid = Uuid::from_bytes([0x11; 16]);
pub const SESSION: Uuid = Uuid::from_bytes([0x22; 16]);
pub const CONTRACT: Uuid = Uuid::from_bytes([0x33; 16]);
pub const SCOPE_SPEC: Uuid = Uuid::from_bytes([0x44; 16]);

pub fn accounts(names: &[&str]) -> Vec<AccountAddress> {
    names.iter().map(|name| AccountAddress::new(*name)).collect()
}

pub fn scope_id() -> MetadataAddress {
    MetadataAddress::scope(SCOPE)
}

pub fn session_id() -> MetadataAddress {
    MetadataAddress::session(SCOPE, SESSION)
}

pub fn contract_spec_id() -> MetadataAddress {
    MetadataAddress::contract_specification(CONTRACT)
}

pub fn scope(owners: &[&str]) -> Scope {
    Scope::new(
        scope_id(),
        owners
            .iter()
            .map(|owner| Party::new(*owner, PartyType::Owner))
            .collect(),
    )
}

pub fn contract_spec(owners: &[&str]) -> ContractSpecification {
    ContractSpecification {
        specification_id: contract_spec_id(),
        description: None,
        owner_addresses: accounts(owners),
        parties_involved: vec![PartyType::Owner],
        source: ContractSource::Hash("c0ffee".to_string()),
        class_name: "LoanPackage".to_string(),
    }
}

pub fn record_spec(name: &str, inputs: &[(&str, &str)]) -> RecordSpecification {
    RecordSpecification {
        specification_id: MetadataAddress::record_specification(CONTRACT, name).unwrap(),
        name: name.to_string(),
        inputs: inputs
            .iter()
            .map(|(input, type_name)| InputSpecification {
                name: input.to_string(),
                type_name: type_name.to_string(),
                source: InputSource::Hash("d00d".to_string()),
            })
            .collect(),
        type_name: "Document".to_string(),
        result_type: DefinitionType::Record,
        responsible_parties: vec![PartyType::Owner],
    }
}

pub fn session() -> Session {
    Session {
        session_id: session_id(),
        specification_id: contract_spec_id(),
        parties: vec![Party::new("alice", PartyType::Owner)],
        name: "LoanPackage".to_string(),
        audit: None,
    }
}

pub fn record(name: &str) -> Record {
    Record {
        name: name.to_string(),
        session_id: session_id(),
        process: Process {
            id: ProcessId::Hash("abc123".to_string()),
            name: "underwrite".to_string(),
            method: "run".to_string(),
        },
        inputs: vec![RecordInput {
            name: "document".to_string(),
            source: RecordInputSource::Hash("feed".to_string()),
            type_name: "pdf".to_string(),
            status: RecordInputStatus::Proposed,
        }],
        outputs: vec![RecordOutput {
            hash: "beef".to_string(),
            status: ResultStatus::Pass,
        }],
    }
}

pub fn record_id(name: &str) -> MetadataAddress {
    MetadataAddress::record(SCOPE, name).unwrap()
}

/// Keeper holding a contract spec, a scope owned by alice and one session.
pub fn seeded_keeper() -> MetadataKeeper {
    let mut keeper = MetadataKeeper::in_memory();
    seed(&mut keeper);
    keeper
}

pub fn seed(keeper: &mut MetadataKeeper) {
    keeper
        .handle(MetadataMsg::WriteContractSpecification {
            specification: contract_spec(&["spec-owner"]),
            signers: accounts(&["spec-owner"]),
        })
        .unwrap();
    keeper
        .handle(MetadataMsg::WriteScope {
            scope: scope(&["alice"]),
            signers: accounts(&["alice"]),
        })
        .unwrap();
    keeper
        .handle(MetadataMsg::WriteSession {
            session: session(),
            signers: accounts(&["alice"]),
        })
        .unwrap();
}

pub fn write_record(keeper: &mut MetadataKeeper, name: &str) {
    keeper
        .handle(MetadataMsg::WriteRecord {
            record: record(name),
            session: None,
            signers: accounts(&["alice"]),
        })
        .unwrap();
}
