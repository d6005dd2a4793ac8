//! In-process implementation of the redirect repository.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::domain::entities::{Destination, NewRedirectRule, RedirectRule, RuleId, RuleStatus};
use crate::domain::repositories::{RedirectRepository, StatusFilter};
use crate::error::AppError;

#[derive(Default)]
struct Rules {
    by_id: BTreeMap<RuleId, RedirectRule>,
    by_hash: HashMap<String, RuleId>,
    next_id: RuleId,
}

/// Redirect rules held in memory.
///
/// Behaves like the PostgreSQL store, including duplicate detection and
/// paging order. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryRedirectRepository {
    rules: RwLock<Rules>,
}

impl MemoryRedirectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn filtered(rules: &Rules, filter: StatusFilter) -> Vec<&RedirectRule> {
        let mut matching: Vec<&RedirectRule> = rules
            .by_id
            .values()
            .filter(|rule| filter.matches(rule.status))
            .collect();
        matching.sort_by_key(|rule| (rule.destination.sort_key(), rule.id));
        matching
    }
}

#[async_trait]
impl RedirectRepository for MemoryRedirectRepository {
    async fn insert(&self, new_rule: NewRedirectRule) -> Result<RedirectRule, AppError> {
        let mut rules = self.rules.write().await;

        if rules.by_hash.contains_key(&new_rule.from_hash) {
            return Err(AppError::duplicate_rule(&new_rule.from_path));
        }

        rules.next_id += 1;
        let rule = RedirectRule::new(
            rules.next_id,
            new_rule.from_path,
            new_rule.from_hash,
            new_rule.destination,
            RuleStatus::Unverified,
            Utc::now(),
        );

        rules.by_hash.insert(rule.from_hash.clone(), rule.id);
        rules.by_id.insert(rule.id, rule.clone());

        Ok(rule)
    }

    async fn find_by_hash(&self, from_hash: &str) -> Result<Option<RedirectRule>, AppError> {
        let rules = self.rules.read().await;
        Ok(rules
            .by_hash
            .get(from_hash)
            .and_then(|id| rules.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: RuleId) -> Result<Option<RedirectRule>, AppError> {
        Ok(self.rules.read().await.by_id.get(&id).cloned())
    }

    async fn update_status(&self, id: RuleId, status: RuleStatus) -> Result<bool, AppError> {
        let mut rules = self.rules.write().await;
        let rule = rules
            .by_id
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Redirect rule not found", json!({ "id": id })))?;

        if rule.status == status {
            return Ok(false);
        }

        rule.status = status;
        Ok(true)
    }

    async fn count(&self, filter: StatusFilter) -> Result<i64, AppError> {
        let rules = self.rules.read().await;
        let count = rules
            .by_id
            .values()
            .filter(|rule| filter.matches(rule.status))
            .count();
        Ok(count as i64)
    }

    async fn page(
        &self,
        filter: StatusFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RedirectRule>, AppError> {
        let rules = self.rules.read().await;
        Ok(Self::filtered(&rules, filter)
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn list_url_destinations(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<String>, AppError> {
        let rules = self.rules.read().await;
        Ok(rules
            .by_id
            .values()
            .filter_map(|rule| match &rule.destination {
                Destination::Url(url) if url.starts_with("http") => Some(url.clone()),
                _ => None,
            })
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}
