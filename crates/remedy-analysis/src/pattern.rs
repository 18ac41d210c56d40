//! Error pattern repository
//!
//! Recurring failures are remembered under a signature of the form
//! `<service>:<error type>:<category>`. The repository is an external
//! collaborator; [`InMemoryPatternStore`] serves single-process hosts
//! and tests.

use crate::error::PatternStoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use remedy_model::{ErrorClassification, ErrorContext};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;

/// Key/value repository of error patterns
#[async_trait]
pub trait PatternStore: Send + Sync + std::fmt::Debug {
    /// Store a pattern that expires after `ttl`
    async fn store_pattern(&self, key: &str, pattern: Value, ttl: Duration) -> Result<(), PatternStoreError>;

    /// Fetch a live pattern
    async fn get_pattern(&self, key: &str) -> Result<Option<Value>, PatternStoreError>;

    /// Fetch all live patterns matching `filter`
    ///
    /// A trailing `*` matches by prefix; anything else matches keys
    /// containing `filter`.
    async fn get_patterns(&self, filter: &str) -> Result<BTreeMap<String, Value>, PatternStoreError>;
}

/// Signature under which an incident's pattern is stored
#[must_use]
pub fn pattern_signature(context: &ErrorContext, classification: &ErrorClassification) -> String {
    format!(
        "{}:{}:{:?}",
        context.service_name, context.error.error_type, classification.category
    )
}

fn key_matches(key: &str, filter: &str) -> bool {
    match filter.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key.contains(filter),
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Instant,
}

/// Process-local pattern store with per-entry expiry
#[derive(Debug, Default)]
pub struct InMemoryPatternStore {
    entries: DashMap<String, Entry>,
}

impl InMemoryPatternStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, expired ones included until next access
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if store holds no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, e| e.expires_at > now);
    }
}

#[async_trait]
impl PatternStore for InMemoryPatternStore {
    async fn store_pattern(&self, key: &str, pattern: Value, ttl: Duration) -> Result<(), PatternStoreError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| PatternStoreError::Backend(format!("ttl out of range: {ttl:?}")))?;
        self.entries.insert(key.to_string(), Entry { value: pattern, expires_at });
        Ok(())
    }

    async fn get_pattern(&self, key: &str) -> Result<Option<Value>, PatternStoreError> {
        let now = Instant::now();
        let live = self
            .entries
            .get(key)
            .map(|e| (e.expires_at > now, e.value.clone()));
        match live {
            Some((true, value)) => Ok(Some(value)),
            Some((false, _)) => {
                self.entries.remove_if(key, |_, e| e.expires_at <= now);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn get_patterns(&self, filter: &str) -> Result<BTreeMap<String, Value>, PatternStoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .iter()
            .filter(|e| e.expires_at > now && key_matches(e.key(), filter))
            .map(|e| (e.key().clone(), e.value().value.clone()))
            .collect())
    }
}
