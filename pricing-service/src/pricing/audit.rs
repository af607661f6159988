//! Change-log entry construction.
//!
//! Stores call these builders inside the same atomic unit as the mutation;
//! a mutation whose entry was not persisted did not happen.

use crate::models::{ChangeAction, PricingChangeLogEntry, RuleRecord};
use crate::services::PricingError;
use chrono::Utc;
use uuid::Uuid;

pub struct ChangeAuditor;

impl ChangeAuditor {
    pub fn created<R: RuleRecord>(
        new: &R,
        actor: &str,
    ) -> Result<PricingChangeLogEntry, PricingError> {
        Self::entry::<R>(new.record_id(), ChangeAction::Create, None, Some(new), actor)
    }

    pub fn updated<R: RuleRecord>(
        old: &R,
        new: &R,
        actor: &str,
    ) -> Result<PricingChangeLogEntry, PricingError> {
        Self::entry::<R>(
            new.record_id(),
            ChangeAction::Update,
            Some(old),
            Some(new),
            actor,
        )
    }

    pub fn deleted<R: RuleRecord>(
        old: &R,
        actor: &str,
    ) -> Result<PricingChangeLogEntry, PricingError> {
        Self::entry::<R>(old.record_id(), ChangeAction::Delete, Some(old), None, actor)
    }

    fn entry<R: RuleRecord>(
        entity_id: Uuid,
        action: ChangeAction,
        old: Option<&R>,
        new: Option<&R>,
        actor: &str,
    ) -> Result<PricingChangeLogEntry, PricingError> {
        let actor = actor.trim();
        if actor.is_empty() {
            return Err(PricingError::Validation(
                "an acting identity is required for pricing changes".to_string(),
            ));
        }

        Ok(PricingChangeLogEntry {
            id: Uuid::new_v4(),
            entity_type: R::ENTITY_TYPE,
            entity_id,
            action,
            old_values: old.map(serde_json::to_value).transpose()?,
            new_values: new.map(serde_json::to_value).transpose()?,
            actor: actor.to_string(),
            created_at: Utc::now(),
        })
    }
}
