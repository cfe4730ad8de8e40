use crate::address::{AddressKind, MetadataAddress};
use crate::core::{MetaError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account that can own entities and sign mutations.
///
/// The account encoding is opaque here; equality is exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountAddress(String);

impl AccountAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountAddress {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Role a party plays for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PartyType {
    Originator,
    Servicer,
    Investor,
    Custodian,
    Owner,
    Affiliate,
    Omnibus,
    Provenance,
}

impl fmt::Display for PartyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PartyType::Originator => "PARTY_TYPE_ORIGINATOR",
            PartyType::Servicer => "PARTY_TYPE_SERVICER",
            PartyType::Investor => "PARTY_TYPE_INVESTOR",
            PartyType::Custodian => "PARTY_TYPE_CUSTODIAN",
            PartyType::Owner => "PARTY_TYPE_OWNER",
            PartyType::Affiliate => "PARTY_TYPE_AFFILIATE",
            PartyType::Omnibus => "PARTY_TYPE_OMNIBUS",
            PartyType::Provenance => "PARTY_TYPE_PROVENANCE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Party {
    pub address: AccountAddress,
    pub role: PartyType,
}

impl Party {
    pub fn new(address: impl Into<AccountAddress>, role: PartyType) -> Self {
        Self {
            address: address.into(),
            role,
        }
    }

    fn validate_basic(&self) -> Result<()> {
        if self.address.is_empty() {
            return Err(MetaError::InvalidEntity(format!(
                "party with role {} has an empty address",
                self.role
            )));
        }
        Ok(())
    }
}

/// Protected metadata carried by versionable entities.
///
/// Once written, the whole block is immutable: updates must reproduce it
/// exactly or omit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFields {
    pub created_by: AccountAddress,
    pub created_date: DateTime<Utc>,
    pub updated_by: Option<AccountAddress>,
    pub updated_date: Option<DateTime<Utc>>,
    pub version: u32,
    pub message: String,
}

impl AuditFields {
    pub fn created(by: impl Into<AccountAddress>, at: DateTime<Utc>) -> Self {
        Self {
            created_by: by.into(),
            created_date: at,
            updated_by: None,
            updated_date: None,
            version: 0,
            message: String::new(),
        }
    }
}

// ============================================================================
// Scope / Session / Record
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub scope_id: MetadataAddress,
    pub specification_id: Option<MetadataAddress>,
    pub owners: Vec<Party>,
    pub data_access: Vec<AccountAddress>,
    /// May change `data_access` without the owners' signatures.
    pub manager: Option<AccountAddress>,
    pub value_owner: Option<AccountAddress>,
}

impl Scope {
    pub fn new(scope_id: MetadataAddress, owners: Vec<Party>) -> Self {
        Self {
            scope_id,
            specification_id: None,
            owners,
            data_access: Vec::new(),
            manager: None,
            value_owner: None,
        }
    }

    pub fn owner_addresses(&self) -> Vec<AccountAddress> {
        self.owners.iter().map(|p| p.address.clone()).collect()
    }

    pub fn validate_basic(&self) -> Result<()> {
        require_kind(&self.scope_id, AddressKind::Scope, "scope id")?;
        if let Some(spec_id) = &self.specification_id {
            require_kind(spec_id, AddressKind::ScopeSpecification, "scope specification id")?;
        }
        if self.owners.is_empty() {
            return Err(MetaError::InvalidEntity(
                "scope must have at least one owner".to_string(),
            ));
        }
        for owner in &self.owners {
            owner.validate_basic()?;
        }
        require_accounts(&self.data_access, "data access")?;
        if let Some(manager) = &self.manager {
            require_account(manager, "manager")?;
        }
        if let Some(value_owner) = &self.value_owner {
            require_account(value_owner, "value owner")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: MetadataAddress,
    pub specification_id: MetadataAddress,
    pub parties: Vec<Party>,
    pub name: String,
    pub audit: Option<AuditFields>,
}

impl Session {
    pub fn validate_basic(&self) -> Result<()> {
        require_kind(&self.session_id, AddressKind::Session, "session id")?;
        require_kind(
            &self.specification_id,
            AddressKind::ContractSpecification,
            "contract specification id",
        )?;
        if self.parties.is_empty() {
            return Err(MetaError::InvalidEntity(
                "session must have at least one party".to_string(),
            ));
        }
        for party in &self.parties {
            party.validate_basic()?;
        }
        require_text(&self.name, "session name")
    }

    pub fn scope_address(&self) -> Result<MetadataAddress> {
        self.session_id.scope_address()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessId {
    Address(String),
    Hash(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,
    pub name: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordInputSource {
    /// Output of another record.
    Record(MetadataAddress),
    Hash(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordInputStatus {
    Proposed,
    Record,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordInput {
    pub name: String,
    pub source: RecordInputSource,
    pub type_name: String,
    pub status: RecordInputStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    Pass,
    Skip,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutput {
    pub hash: String,
    pub status: ResultStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub session_id: MetadataAddress,
    pub process: Process,
    pub inputs: Vec<RecordInput>,
    pub outputs: Vec<RecordOutput>,
}

impl Record {
    /// Address of this record: the session's scope plus the record name.
    pub fn record_id(&self) -> Result<MetadataAddress> {
        let scope = self.session_id.scope_address()?;
        MetadataAddress::record(scope.primary_uuid(), &self.name)
    }

    pub fn validate_basic(&self) -> Result<()> {
        require_kind(&self.session_id, AddressKind::Session, "record session id")?;
        require_text(&self.name, "record name")?;
        require_text(&self.process.name, "process name")?;
        require_text(&self.process.method, "process method")?;
        for input in &self.inputs {
            require_text(&input.name, "record input name")?;
            require_text(&input.type_name, "record input type name")?;
            match (&input.source, input.status) {
                (RecordInputSource::Record(id), RecordInputStatus::Record) => {
                    require_kind(id, AddressKind::Record, "record input source")?
                }
                (RecordInputSource::Hash(hash), RecordInputStatus::Proposed) => {
                    require_text(hash, "record input hash")?
                }
                _ => {
                    return Err(MetaError::InvalidEntity(format!(
                        "record input '{}' source does not match its status",
                        input.name
                    )));
                }
            }
        }
        for output in &self.outputs {
            require_text(&output.hash, "record output hash")?;
        }
        Ok(())
    }
}

// ============================================================================
// Specifications
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Description {
    pub name: String,
    pub description: String,
    pub website_url: String,
    pub icon_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSpecification {
    pub specification_id: MetadataAddress,
    pub description: Option<Description>,
    pub owner_addresses: Vec<AccountAddress>,
    pub parties_involved: Vec<PartyType>,
    pub contract_spec_ids: Vec<MetadataAddress>,
}

impl ScopeSpecification {
    pub fn validate_basic(&self) -> Result<()> {
        require_kind(
            &self.specification_id,
            AddressKind::ScopeSpecification,
            "scope specification id",
        )?;
        require_owners(&self.owner_addresses)?;
        require_parties(&self.parties_involved)?;
        for id in &self.contract_spec_ids {
            require_kind(id, AddressKind::ContractSpecification, "contract specification id")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractSource {
    /// An on-chain resource holding the contract definition.
    Resource(MetadataAddress),
    Hash(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSpecification {
    pub specification_id: MetadataAddress,
    pub description: Option<Description>,
    pub owner_addresses: Vec<AccountAddress>,
    pub parties_involved: Vec<PartyType>,
    pub source: ContractSource,
    pub class_name: String,
}

impl ContractSpecification {
    pub fn validate_basic(&self) -> Result<()> {
        require_kind(
            &self.specification_id,
            AddressKind::ContractSpecification,
            "contract specification id",
        )?;
        require_owners(&self.owner_addresses)?;
        require_parties(&self.parties_involved)?;
        if let ContractSource::Hash(hash) = &self.source {
            require_text(hash, "contract source hash")?;
        }
        require_text(&self.class_name, "class name")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputSource {
    Record(MetadataAddress),
    Hash(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpecification {
    pub name: String,
    pub type_name: String,
    pub source: InputSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefinitionType {
    Proposed,
    Record,
    RecordList,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSpecification {
    pub specification_id: MetadataAddress,
    pub name: String,
    pub inputs: Vec<InputSpecification>,
    pub type_name: String,
    pub result_type: DefinitionType,
    pub responsible_parties: Vec<PartyType>,
}

impl RecordSpecification {
    pub fn validate_basic(&self) -> Result<()> {
        require_kind(
            &self.specification_id,
            AddressKind::RecordSpecification,
            "record specification id",
        )?;
        require_text(&self.name, "record specification name")?;
        require_text(&self.type_name, "record specification type name")?;
        for input in &self.inputs {
            require_text(&input.name, "input specification name")?;
            require_text(&input.type_name, "input specification type name")?;
            if let InputSource::Record(id) = &input.source {
                require_kind(id, AddressKind::Record, "input specification source")?;
            }
        }
        require_parties(&self.responsible_parties)
    }

    /// Address this specification must live at, given its name.
    pub fn expected_id(&self) -> Result<MetadataAddress> {
        let parent = self.specification_id.contract_spec_address()?;
        MetadataAddress::record_specification(parent.primary_uuid(), &self.name)
    }
}

fn require_kind(address: &MetadataAddress, kind: AddressKind, field: &str) -> Result<()> {
    if address.kind() != kind {
        return Err(MetaError::MalformedAddress(format!(
            "{} must be a {} address, got {}",
            field,
            kind,
            address.kind()
        )));
    }
    Ok(())
}

fn require_text(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MetaError::InvalidEntity(format!("{} cannot be empty", field)));
    }
    Ok(())
}

fn require_account(account: &AccountAddress, field: &str) -> Result<()> {
    if account.is_empty() {
        return Err(MetaError::InvalidEntity(format!("{} address cannot be empty", field)));
    }
    Ok(())
}

fn require_accounts(accounts: &[AccountAddress], field: &str) -> Result<()> {
    accounts.iter().try_for_each(|a| require_account(a, field))
}

fn require_owners(owners: &[AccountAddress]) -> Result<()> {
    if owners.is_empty() {
        return Err(MetaError::InvalidEntity(
            "specification must have at least one owner".to_string(),
        ));
    }
    require_accounts(owners, "owner")
}

fn require_parties(parties: &[PartyType]) -> Result<()> {
    if parties.is_empty() {
        return Err(MetaError::InvalidEntity(
            "at least one party is required".to_string(),
        ));
    }
    Ok(())
}
