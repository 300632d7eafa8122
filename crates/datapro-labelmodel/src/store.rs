//! Persistence of fitted models keyed by run name.
//!
//! Stores hand out `Arc<FittedModel>` snapshots. Saving a run replaces the
//! stored `Arc`, so readers that already hold the previous model keep using
//! it undisturbed.
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::{debug, info};

use crate::error::{LabelModelError, Result};
use crate::model::FittedModel;

pub trait ParameterStore {
    fn save(&self, run_name: &str, model: FittedModel) -> Result<Arc<FittedModel>>;

    fn load(&self, run_name: &str) -> Result<Arc<FittedModel>>;

    /// Stored run names, sorted.
    fn list(&self) -> Result<Vec<String>>;
}

/// Run names become file names, so keep them to a portable alphabet.
pub fn validate_run_name(run_name: &str) -> Result<()> {
    let valid = !run_name.is_empty()
        && !run_name.starts_with('.')
        && run_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(LabelModelError::InvalidConfig(format!(
            "invalid run name '{}': use letters, digits, '_', '-' or '.'",
            run_name
        )))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    runs: RwLock<HashMap<String, Arc<FittedModel>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ParameterStore for MemoryStore {
    fn save(&self, run_name: &str, model: FittedModel) -> Result<Arc<FittedModel>> {
        validate_run_name(run_name)?;
        let model = Arc::new(model);
        let mut runs = self
            .runs
            .write()
            .map_err(|_| LabelModelError::Io("memory store lock poisoned".to_string()))?;
        runs.insert(run_name.to_string(), Arc::clone(&model));
        Ok(model)
    }

    fn load(&self, run_name: &str) -> Result<Arc<FittedModel>> {
        let runs = self
            .runs
            .read()
            .map_err(|_| LabelModelError::Io("memory store lock poisoned".to_string()))?;
        runs.get(run_name)
            .cloned()
            .ok_or_else(|| LabelModelError::UnknownRun(run_name.to_string()))
    }

    fn list(&self) -> Result<Vec<String>> {
        let runs = self
            .runs
            .read()
            .map_err(|_| LabelModelError::Io("memory store lock poisoned".to_string()))?;
        let mut names: Vec<String> = runs.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// One pretty-printed JSON file per run: `<root>/<run_name>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        JsonFileStore {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, run_name: &str) -> PathBuf {
        self.root.join(format!("{}.json", run_name))
    }
}

impl ParameterStore for JsonFileStore {
    fn save(&self, run_name: &str, model: FittedModel) -> Result<Arc<FittedModel>> {
        validate_run_name(run_name)?;
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(run_name);
        // Write then rename so a concurrent load never sees a partial file.
        let tmp = self.root.join(format!(".{}.json.tmp", run_name));
        fs::write(&tmp, model.to_json()?)?;
        fs::rename(&tmp, &path)?;
        info!("Saved fitted model '{}' to {}", run_name, path.display());
        Ok(Arc::new(model))
    }

    fn load(&self, run_name: &str) -> Result<Arc<FittedModel>> {
        validate_run_name(run_name)?;
        let path = self.path_for(run_name);
        if !path.exists() {
            return Err(LabelModelError::UnknownRun(run_name.to_string()));
        }
        let json = fs::read_to_string(&path)?;
        let model = FittedModel::from_json(&json)?;
        debug!("Loaded fitted model '{}' from {}", run_name, path.display());
        Ok(Arc::new(model))
    }

    fn list(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_run_name(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
