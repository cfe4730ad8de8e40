use crate::core::{AuditField, AuditFields, MetaError, Result};

/// Ensure a proposed audit block represents no change to the stored one.
///
/// An absent proposal means "no update", never "unset".
pub fn validate_audit_update(
    existing: Option<&AuditFields>,
    proposed: Option<&AuditFields>,
) -> Result<()> {
    let Some(proposed) = proposed else {
        return Ok(());
    };
    let Some(existing) = existing else {
        return Err(MetaError::AuditFieldsImmutable(AuditField::Block));
    };

    let changed = if existing.created_by != proposed.created_by {
        Some(AuditField::CreatedBy)
    } else if existing.created_date != proposed.created_date {
        Some(AuditField::CreatedDate)
    } else if existing.updated_by != proposed.updated_by {
        Some(AuditField::UpdatedBy)
    } else if existing.updated_date != proposed.updated_date {
        Some(AuditField::UpdatedDate)
    } else if existing.version != proposed.version {
        Some(AuditField::Version)
    } else if existing.message != proposed.message {
        Some(AuditField::Message)
    } else {
        None
    };

    match changed {
        Some(field) => Err(MetaError::AuditFieldsImmutable(field)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn audit() -> AuditFields {
        let mut audit = AuditFields::created("alice", Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        audit.updated_by = Some("bob".into());
        audit.updated_date = Some(Utc.with_ymd_and_hms(2024, 2, 2, 3, 4, 5).unwrap());
        audit.version = 3;
        audit.message = "initial".to_string();
        audit
    }

    #[test]
    fn test_identical_or_absent_block_passes() {
        let a = audit();
        assert!(validate_audit_update(Some(&a), Some(&a.clone())).is_ok());
        assert!(validate_audit_update(Some(&a), None).is_ok());
        assert!(validate_audit_update(None, None).is_ok());
    }

    #[test]
    fn test_new_block_on_unaudited_entity_fails() {
        assert_eq!(
            validate_audit_update(None, Some(&audit())),
            Err(MetaError::AuditFieldsImmutable(AuditField::Block))
        );
    }

    #[test]
    fn test_every_single_field_change_fails() {
        let a = audit();
        let fields = [
            AuditField::CreatedBy,
            AuditField::CreatedDate,
            AuditField::UpdatedBy,
            AuditField::UpdatedDate,
            AuditField::Version,
            AuditField::Message,
        ];
        for field in fields {
            let mut proposed = a.clone();
            match field {
                AuditField::CreatedBy => proposed.created_by = "mallory".into(),
                AuditField::CreatedDate => {
                    proposed.created_date = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
                }
                AuditField::UpdatedBy => proposed.updated_by = None,
                AuditField::UpdatedDate => proposed.updated_date = None,
                AuditField::Version => proposed.version += 1,
                AuditField::Message => proposed.message.push('!'),
                AuditField::Block => unreachable!(),
            }
            assert_eq!(
                validate_audit_update(Some(&a), Some(&proposed)),
                Err(MetaError::AuditFieldsImmutable(field))
            );
        }
    }
}
