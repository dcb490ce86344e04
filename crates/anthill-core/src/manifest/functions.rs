//! Server-side script artifacts.

use std::path::PathBuf;

use super::FunctionSpec;
use crate::error::DeliverError;
use crate::fs::text_digest;
use crate::reconcile::Artifact;

/// A function script with its source loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub name: String,
    pub path: PathBuf,
    pub imports: Vec<String>,
    pub code: String,
    digest: String,
}

impl Script {
    pub fn new(name: impl Into<String>, code: impl Into<String>, imports: Vec<String>) -> Self {
        let code = code.into();
        Self {
            name: name.into(),
            path: PathBuf::new(),
            imports,
            digest: text_digest(&code),
            code,
        }
    }

    /// Read the script named by `spec`.
    pub fn load(spec: &FunctionSpec) -> Result<Self, DeliverError> {
        if !spec.path.is_file() {
            return Err(DeliverError::Config(format!(
                "Script {} cannot be found!",
                spec.path.display()
            )));
        }
        let code = std::fs::read_to_string(&spec.path).map_err(|source| DeliverError::Io {
            kind: "Script",
            path: spec.path.clone(),
            source,
        })?;

        let mut script = Self::new(spec.name.clone(), code, spec.imports.clone());
        script.path = spec.path.clone();
        Ok(script)
    }

    /// Imports in the wire form the exec service stores: comma-joined.
    pub fn imports_joined(&self) -> String {
        self.imports.join(",")
    }
}

impl Artifact for Script {
    fn name(&self) -> &str {
        &self.name
    }

    fn digest(&self) -> &str {
        &self.digest
    }

    fn size(&self) -> u64 {
        self.code.len() as u64
    }
}
