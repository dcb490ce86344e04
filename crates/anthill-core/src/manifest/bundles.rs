//! Downloadable content bundles.

use std::path::PathBuf;

use serde_json::{Map, Value};

use super::BundleSpec;
use crate::error::DeliverError;
use crate::fs::md5_file;
use crate::reconcile::Artifact;

/// A bundle file with its content hash computed.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub name: String,
    pub path: PathBuf,
    /// MD5 hex digest, the content service's key.
    pub hash: String,
    pub size: u64,
    pub filters: Map<String, Value>,
    pub properties: Map<String, Value>,
}

impl Bundle {
    /// Hash the file named by `spec`.
    pub fn load(spec: &BundleSpec) -> Result<Self, DeliverError> {
        if !spec.path.is_file() {
            return Err(DeliverError::Config(format!(
                "Bundle {} cannot be found!",
                spec.path.display()
            )));
        }
        let (hash, size) = md5_file(&spec.path).map_err(|source| DeliverError::Io {
            kind: "Bundle",
            path: spec.path.clone(),
            source,
        })?;

        Ok(Self {
            name: spec.name.clone(),
            path: spec.path.clone(),
            hash,
            size,
            filters: spec.filters.clone(),
            properties: spec.properties.clone(),
        })
    }
}

impl Artifact for Bundle {
    fn name(&self) -> &str {
        &self.name
    }

    fn digest(&self) -> &str {
        &self.hash
    }

    fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_hashes_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.dat");
        std::fs::write(&path, b"hello world").unwrap();

        let mut filters = Map::new();
        filters.insert("platform".to_string(), Value::from("ios"));
        let bundle = Bundle::load(&BundleSpec {
            name: "x.dat".to_string(),
            path,
            filters,
            properties: Map::new(),
        })
        .unwrap();

        assert_eq!(bundle.hash, "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(bundle.size(), 11);
        assert_eq!(bundle.filters["platform"], "ios");
    }

    #[test]
    fn test_load_missing_bundle() {
        let err = Bundle::load(&BundleSpec {
            name: "x.dat".to_string(),
            path: PathBuf::from("/nonexistent/x.dat"),
            filters: Map::new(),
            properties: Map::new(),
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Bundle /nonexistent/x.dat cannot be found!");
    }
}
