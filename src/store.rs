//! File-backed template storage: one JSON document per source file.
//!
//! Records are keyed by the upload filename (sanitized), written once at
//! extraction time, and read-only afterwards. A missing record means the
//! source was never extracted, which is a normal condition, not an error.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::template::Template;

#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create template directory {:?}", dir))?;
        Ok(Self { dir })
    }

    /// Persist a template under the given source name. Returns the store key.
    pub fn save(&self, source_name: &str, template: &Template) -> Result<String> {
        let key = store_key(source_name);
        let path = self.path_for(&key);
        let json = serde_json::to_string_pretty(template)
            .context("failed to serialize template")?;
        fs::write(&path, &json)
            .with_context(|| format!("failed to write template {:?}", path))?;

        let content_hash = {
            let mut hasher = Sha256::new();
            hasher.update(template.template_text.as_bytes());
            format!("{:x}", hasher.finalize())
        };
        info!(
            "Stored template '{}' ({} placeholders, sha256 {})",
            key,
            template.placeholders.len(),
            content_hash
        );
        Ok(key)
    }

    /// Load a stored template. `Ok(None)` means not yet extracted.
    pub fn load(&self, source_name: &str) -> Result<Option<Template>> {
        let key = store_key(source_name);
        let path = self.path_for(&key);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No stored template for '{}'", key);
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read template {:?}", path))
            }
        };
        let template: Template = serde_json::from_str(&json)
            .with_context(|| format!("stored template {:?} is corrupt", path))?;
        Ok(Some(template))
    }

    /// Keys of every stored template.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read template directory {:?}", self.dir))?
        {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

/// Derive a filesystem-safe key from an upload filename. Path separators and
/// other non-portable characters collapse to underscores.
pub fn store_key(source_name: &str) -> String {
    source_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::parse_template;

    fn sample() -> Template {
        parse_template(
            r#"{"Template": "Party: Party_Name", "Placeholders": {
                "Party_Name": {"description": "Contracting party", "original_value": "Acme"}
            }}"#,
        )
        .unwrap()
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::open(dir.path()).unwrap();

        let key = store.save("lease.pdf", &sample()).unwrap();
        assert_eq!(key, "lease.pdf");

        let loaded = store.load("lease.pdf").unwrap().unwrap();
        assert_eq!(loaded.template_text, "Party: Party_Name");
        assert_eq!(
            loaded.placeholders["Party_Name"].original_value.as_deref(),
            Some("Acme")
        );
    }

    #[test]
    fn missing_record_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::open(dir.path()).unwrap();
        assert!(store.load("never-extracted.pdf").unwrap().is_none());
    }

    #[test]
    fn keys_cannot_escape_the_store_directory() {
        assert_eq!(store_key("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(store_key("a b/c.pdf"), "a_b_c.pdf");
        assert_eq!(store_key("plain.pdf"), "plain.pdf");
    }

    #[test]
    fn list_returns_stored_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::open(dir.path()).unwrap();
        store.save("b.pdf", &sample()).unwrap();
        store.save("a.pdf", &sample()).unwrap();
        assert_eq!(store.list().unwrap(), ["a.pdf", "b.pdf"]);
    }

    #[test]
    fn persisted_file_has_the_two_field_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::open(dir.path()).unwrap();
        store.save("x.pdf", &sample()).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("x.pdf.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(obj.contains_key("Template"));
        assert!(obj.contains_key("Placeholders"));
    }
}
