//! CLI variables - named values persisted across invocations
//!
//! Variables let scripted workflows stash identifiers (release ids, session
//! names) between commands. Each variable is one JSON file in the data
//! directory.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
    pub updated: DateTime<Utc>,
}

/// File-backed variable store
pub struct VariableStore {
    dir: PathBuf,
}

impl VariableStore {
    /// Open the store in the user data directory
    pub fn new() -> Result<Self> {
        let dir = crate::config::data_dir()?.join("vars");
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create variable directory: {:?}", dir))?;
        Ok(Self { dir })
    }

    #[cfg(test)]
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            bail!(
                "Invalid variable name {:?}; use letters, digits, '-' and '_'",
                name
            );
        }
        Ok(())
    }

    /// Store or overwrite a variable
    pub fn set(&self, name: &str, value: &str) -> Result<Variable> {
        Self::validate_name(name)?;
        let variable = Variable {
            name: name.to_string(),
            value: value.to_string(),
            updated: Utc::now(),
        };
        let json =
            serde_json::to_string_pretty(&variable).context("Failed to serialize variable")?;
        fs::write(self.path(name), json)
            .with_context(|| format!("Failed to write variable {:?}", name))?;
        Ok(variable)
    }

    /// Look up a variable; `Ok(None)` when unset
    pub fn get(&self, name: &str) -> Result<Option<Variable>> {
        Self::validate_name(name)?;
        let path = self.path(name);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read variable {:?}", name))?;
        let variable = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse variable {:?}", name))?;
        Ok(Some(variable))
    }

    /// List all variables sorted by name
    pub fn list(&self) -> Result<Vec<Variable>> {
        let mut variables = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list variables in {:?}", self.dir))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(json) = fs::read_to_string(&path) {
                if let Ok(variable) = serde_json::from_str::<Variable>(&json) {
                    variables.push(variable);
                }
            }
        }
        variables.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(variables)
    }

    /// Delete a variable; returns whether it existed
    pub fn delete(&self, name: &str) -> Result<bool> {
        Self::validate_name(name)?;
        let path = self.path(name);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("Failed to delete variable {:?}", name))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (VariableStore, TempDir) {
        let dir = TempDir::new().unwrap();
        (VariableStore::with_dir(dir.path().to_path_buf()), dir)
    }

    #[test]
    fn set_get_delete_round_trip() {
        let (store, _dir) = store();

        store.set("release-id", "4711").unwrap();
        let variable = store.get("release-id").unwrap().unwrap();
        assert_eq!(variable.value, "4711");

        assert!(store.delete("release-id").unwrap());
        assert!(store.get("release-id").unwrap().is_none());
        assert!(!store.delete("release-id").unwrap());
    }

    #[test]
    fn list_is_sorted() {
        let (store, _dir) = store();
        store.set("zeta", "1").unwrap();
        store.set("alpha", "2").unwrap();

        let names: Vec<String> = store.list().unwrap().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn invalid_names_are_rejected() {
        let (store, _dir) = store();
        assert!(store.set("../etc/passwd", "x").is_err());
        assert!(store.set("", "x").is_err());
        assert!(store.get("bad name").is_err());
    }
}
