use super::CookieOptions;
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const ROOT_PATH: &str = "/";

/// A single stored value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct Entry {
    pub value: String,
    pub path: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_persistent(&self) -> bool {
        self.expires_at.is_some()
    }
}

/// Path-scoped, expiring key/value entries shared by the store implementations
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub(super) struct Jar {
    entries: HashMap<String, Vec<Entry>>,
}

impl Jar {
    pub fn get(&self, key: &str, current_path: &str, now: DateTime<Utc>) -> Option<String> {
        // Most specific path wins, as browsers order cookies
        self.entries
            .get(key)?
            .iter()
            .filter(|entry| !entry.is_expired(now) && path_matches(&entry.path, current_path))
            .max_by_key(|entry| entry.path.len())
            .map(|entry| entry.value.clone())
    }

    pub fn set(
        &mut self,
        key: &str,
        value: &str,
        options: CookieOptions,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let expires_at = options
            .max_age
            .map(|max_age| {
                chrono::Duration::from_std(max_age)
                    .ok()
                    .and_then(|age| now.checked_add_signed(age))
                    .ok_or_else(|| {
                        CoreError::invalid_config(format!("max_age out of range: {max_age:?}"))
                    })
            })
            .transpose()?;
        let path = normalize_path(options.path.as_deref());

        let slot = self.entries.entry(key.to_string()).or_default();
        slot.retain(|entry| entry.path != path);
        slot.push(Entry {
            value: value.to_string(),
            path,
            expires_at,
        });
        Ok(())
    }

    /// Returns whether anything was removed
    pub fn clear(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn purge_expired(&mut self, now: DateTime<Utc>) {
        for slot in self.entries.values_mut() {
            slot.retain(|entry| !entry.is_expired(now));
        }
        self.entries.retain(|_, slot| !slot.is_empty());
    }

    /// Copy of the jar holding only entries that outlive the process
    pub fn persistent(&self) -> Self {
        let entries = self
            .entries
            .iter()
            .filter_map(|(key, slot)| {
                let kept: Vec<Entry> = slot.iter().filter(|e| e.is_persistent()).cloned().collect();
                (!kept.is_empty()).then(|| (key.clone(), kept))
            })
            .collect();
        Self { entries }
    }
}

fn normalize_path(path: Option<&str>) -> String {
    match path {
        None | Some("") => ROOT_PATH.to_string(),
        Some(p) if p.starts_with('/') => p.to_string(),
        Some(p) => format!("/{p}"),
    }
}

/// Cookie path-match: `/login` covers `/login` and `/login/...` but not `/loginx`
fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if cookie_path == ROOT_PATH || cookie_path == request_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}
