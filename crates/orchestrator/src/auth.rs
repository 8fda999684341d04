// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Robot channel authentication: a static bearer token, issued API keys,
//! or both. With neither configured, registration is open (development
//! mode).

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata for one issued API key. The secret itself is only returned
/// at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: String,
    pub label: String,
    pub created_at_ms: u64,
    pub revoked: bool,
}

#[derive(Default)]
pub struct AuthConfig {
    token: Option<String>,
    /// secret -> record
    keys: Mutex<HashMap<String, ApiKeyRecord>>,
}

impl AuthConfig {
    /// Open registration (no credentials required).
    pub fn open() -> Self {
        Self::default()
    }

    /// Require the given static token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: Some(token.into()), keys: Mutex::new(HashMap::new()) }
    }

    /// Whether any credential is configured.
    pub fn required(&self) -> bool {
        self.token.is_some() || !self.keys.lock().is_empty()
    }

    /// Check a presented credential against the token and unrevoked keys.
    pub fn verify(&self, presented: Option<&str>) -> bool {
        if !self.required() {
            return true;
        }
        let Some(presented) = presented else {
            return false;
        };
        if self.token.as_deref() == Some(presented) {
            return true;
        }
        self.keys
            .lock()
            .get(presented)
            .map(|record| !record.revoked)
            .unwrap_or(false)
    }

    /// Issue a new API key. Returns the record and the secret; the secret
    /// is not retrievable afterwards.
    pub fn create_key(&self, label: impl Into<String>, now_ms: u64) -> (ApiKeyRecord, String) {
        let secret = nanoid::nanoid!(32);
        let record = ApiKeyRecord {
            id: format!("key-{}", nanoid::nanoid!(10)),
            label: label.into(),
            created_at_ms: now_ms,
            revoked: false,
        };
        self.keys.lock().insert(secret.clone(), record.clone());
        (record, secret)
    }

    /// Revoke a key by id. Returns false for unknown ids.
    pub fn revoke_key(&self, id: &str) -> bool {
        let mut keys = self.keys.lock();
        for record in keys.values_mut() {
            if record.id == id {
                record.revoked = true;
                return true;
            }
        }
        false
    }

    /// Key metadata in stable id order.
    pub fn list_keys(&self) -> Vec<ApiKeyRecord> {
        let mut records: Vec<ApiKeyRecord> = self.keys.lock().values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
