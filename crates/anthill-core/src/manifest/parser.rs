//! Manifest parsing with helpful error messages.
//!
//! Manifests are JSON by default; files ending in `.toml` are read as TOML.
//! Both decode into the same document shape.

use std::path::Path;

use serde_json::{Map, Value};

use super::{BundleSpec, FunctionSpec, Manifest};
use crate::error::DeliverError;

/// Manifest encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Toml,
}

impl ManifestFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ManifestFormat::Toml,
            _ => ManifestFormat::Json,
        }
    }
}

/// Read and validate a manifest file.
///
/// Relative artifact paths resolve against the manifest's directory.
pub fn parse_manifest(path: &Path) -> Result<Manifest, DeliverError> {
    let content = std::fs::read_to_string(path).map_err(|source| DeliverError::Io {
        kind: "Manifest",
        path: path.to_path_buf(),
        source,
    })?;

    let mut manifest = parse_manifest_str(&content, ManifestFormat::from_path(path))
        .map_err(|e| DeliverError::Config(format!("{}: {e}", path.display())))?;

    if let Some(base) = path.parent() {
        manifest.resolve_paths(base);
    }
    Ok(manifest)
}

/// Parse manifest content from a string.
pub fn parse_manifest_str(content: &str, format: ManifestFormat) -> Result<Manifest, DeliverError> {
    let document: Value = match format {
        ManifestFormat::Json => serde_json::from_str(content).map_err(|e| {
            DeliverError::Config(format!(
                "JSON parsing error at line {}:\n{}\n\nError: {e}",
                e.line(),
                get_line_context(content, e.line())
            ))
        })?,
        ManifestFormat::Toml => {
            toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?
        }
    };

    let root = document
        .as_object()
        .ok_or_else(|| DeliverError::Config("manifest should be a dict".to_string()))?;

    Ok(Manifest {
        functions: parse_functions(root)?,
        bundles: parse_bundles(root)?,
    })
}

fn section<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, DeliverError> {
    match root.get(key) {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(DeliverError::Config(format!("{key} should be a dict"))),
    }
}

fn entry<'a>(
    kind: &str,
    name: &str,
    value: &'a Value,
) -> Result<(&'a Map<String, Value>, &'a str), DeliverError> {
    let entry = value
        .as_object()
        .ok_or_else(|| DeliverError::Config(format!("{kind} {name} should be a dict")))?;
    let path = entry
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| DeliverError::Config(format!("{kind} {name} has no path option")))?;
    Ok((entry, path))
}

fn parse_functions(root: &Map<String, Value>) -> Result<Vec<FunctionSpec>, DeliverError> {
    let Some(functions) = section(root, "functions")? else {
        return Ok(Vec::new());
    };

    functions
        .iter()
        .map(|(name, value)| {
            let (entry, path) = entry("Script", name, value)?;
            let imports = match entry.get("imports") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_string).ok_or_else(|| {
                            DeliverError::Config(format!(
                                "Script {name}: imports should be a list of strings"
                            ))
                        })
                    })
                    .collect::<Result<_, _>>()?,
                Some(_) => {
                    return Err(DeliverError::Config(format!(
                        "Script {name}: imports should be a list"
                    )));
                }
            };
            Ok(FunctionSpec {
                name: name.clone(),
                path: path.into(),
                imports,
            })
        })
        .collect()
}

fn parse_bundles(root: &Map<String, Value>) -> Result<Vec<BundleSpec>, DeliverError> {
    let Some(bundles) = section(root, "bundles")? else {
        return Ok(Vec::new());
    };

    bundles
        .iter()
        .map(|(name, value)| {
            let (entry, path) = entry("Bundle", name, value)?;
            Ok(BundleSpec {
                name: name.clone(),
                path: path.into(),
                filters: object_option(entry, name, "filters")?,
                properties: object_option(entry, name, "properties")?,
            })
        })
        .collect()
}

fn object_option(
    entry: &Map<String, Value>,
    name: &str,
    key: &str,
) -> Result<Map<String, Value>, DeliverError> {
    match entry.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(DeliverError::Config(format!(
            "Bundle {name}: {key} should be a dict"
        ))),
    }
}

/// Enhance TOML parsing errors with helpful context
fn enhance_toml_error(error: toml::de::Error, content: &str) -> DeliverError {
    let error_msg = error.to_string();

    let line_hint = error.span().map(|span| {
        content[..span.start.min(content.len())]
            .matches('\n')
            .count()
            + 1
    });

    match line_hint {
        Some(line_num) => DeliverError::Config(format!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            get_line_context(content, line_num),
            error_msg
        )),
        None => DeliverError::Config(format!("TOML parsing error: {error_msg}")),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2).min(lines.len());
    let end = (line_num + 2).min(lines.len());

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
