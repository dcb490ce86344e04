//! Local manifests: the authoritative list of artifacts to deliver.
//!
//! A manifest declares `functions` (server-side scripts) and `bundles`
//! (downloadable content). Declarations are loaded into artifacts, which
//! carry the content digest the reconciler compares against remote state.

pub mod bundles;
pub mod functions;
pub mod parser;

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

pub use bundles::Bundle;
pub use functions::Script;
pub use parser::{ManifestFormat, parse_manifest, parse_manifest_str};

/// Declared function entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSpec {
    pub name: String,
    pub path: PathBuf,
    pub imports: Vec<String>,
}

/// Declared bundle entry.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleSpec {
    pub name: String,
    pub path: PathBuf,
    pub filters: Map<String, Value>,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub functions: Vec<FunctionSpec>,
    pub bundles: Vec<BundleSpec>,
}

impl Manifest {
    /// Make relative artifact paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for function in &mut self.functions {
            if function.path.is_relative() {
                function.path = base.join(&function.path);
            }
        }
        for bundle in &mut self.bundles {
            if bundle.path.is_relative() {
                bundle.path = base.join(&bundle.path);
            }
        }
    }
}
