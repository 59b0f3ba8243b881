//! In-instance memo of fetched manifests.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::client::AttachmentContent;

type Key = (String, String);

#[derive(Debug, Clone, Default)]
struct Entry {
    content: Option<String>,
    identity: Option<String>,
    manifest_version: Option<String>,
    attachments: Option<Vec<AttachmentContent>>,
}

/// Per-archive record of what has been fetched, keyed by the requested
/// `(name, version)`.
#[derive(Debug, Default)]
pub(crate) struct ResourceMemo {
    entries: RwLock<HashMap<Key, Entry>>,
}

fn key(name: &str, version: &str) -> Key {
    (name.to_string(), version.to_string())
}

impl ResourceMemo {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn find<T>(&self, name: &str, version: &str, get: impl Fn(&Entry) -> Option<T>) -> Option<T> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        if let Some(found) = entries.get(&key(name, version)).and_then(&get) {
            return Some(found);
        }
        // A "latest" request bound to this concrete version also answers.
        entries
            .iter()
            .filter(|((n, _), entry)| n == name && entry.manifest_version.as_deref() == Some(version))
            .find_map(|(_, entry)| get(entry))
    }

    pub(crate) fn content(&self, name: &str, version: &str) -> Option<String> {
        self.find(name, version, |e| e.content.clone())
    }

    pub(crate) fn identity(&self, name: &str, version: &str) -> Option<String> {
        self.find(name, version, |e| e.identity.clone())
    }

    pub(crate) fn attachments(&self, name: &str, version: &str) -> Option<Vec<AttachmentContent>> {
        self.find(name, version, |e| e.attachments.clone())
    }

    fn update(&self, name: &str, version: &str, apply: impl FnOnce(&mut Entry)) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        apply(entries.entry(key(name, version)).or_default());
    }

    pub(crate) fn store_content(&self, name: &str, version: &str, content: &str, identity: &str) {
        self.update(name, version, |e| {
            e.content = Some(content.to_string());
            e.identity = Some(identity.to_string());
        });
    }

    pub(crate) fn store_attachments(&self, name: &str, version: &str, attachments: Vec<AttachmentContent>) {
        self.update(name, version, |e| e.attachments = Some(attachments));
    }

    pub(crate) fn bind_version(&self, name: &str, version: &str, manifest_version: &str) {
        self.update(name, version, |e| e.manifest_version = Some(manifest_version.to_string()));
    }

    /// Forget everything fetched for `identity` at `version`, whether
    /// `version` was the requested or the resolved one.
    pub(crate) fn forget(&self, identity: &str, version: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|(name, requested), entry| {
            let same_identity = entry.identity.as_deref().unwrap_or(name) == identity || name == identity;
            let same_version =
                requested == version || entry.manifest_version.as_deref() == Some(version);
            !(same_identity && same_version)
        });
    }
}
