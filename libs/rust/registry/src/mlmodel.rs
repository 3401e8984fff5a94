//! `MLmodel` artifact descriptor.

use crate::error::{RegistryError, Result};
use crate::frame::CellKind;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

pub const MLMODEL_FILE: &str = "MLmodel";
const ONNX_FLAVOR: &str = "onnx";

#[derive(Debug, Clone, Deserialize)]
pub struct MlModel {
    #[serde(default)]
    pub artifact_path: Option<String>,
    #[serde(default)]
    pub flavors: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    signature: Option<RawSignature>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSignature {
    #[serde(default)]
    inputs: Option<String>,
}

/// One entry of a column-based signature. Tensor signatures carry no names and
/// are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Whether a signature column type can be fed from cells of `kind`.
pub fn signature_type_accepts(ty: &str, kind: CellKind) -> bool {
    match ty {
        "string" => kind == CellKind::String,
        "integer" | "long" => kind == CellKind::Integer,
        "float" | "double" => matches!(kind, CellKind::Integer | CellKind::Float),
        _ => false,
    }
}

impl MlModel {
    pub fn parse(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| RegistryError::InvalidArtifact(format!("{MLMODEL_FILE}: {e}")))
    }

    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(MLMODEL_FILE);
        let text = std::fs::read_to_string(&path).map_err(|e| RegistryError::io(&path, e))?;
        Self::parse(&text)
    }

    /// File name of the ONNX graph, relative to the artifact directory.
    pub fn onnx_data(&self) -> Result<&str> {
        let flavor = self.flavors.get(ONNX_FLAVOR).ok_or_else(|| RegistryError::UnsupportedFlavor {
            found: if self.flavors.is_empty() { "none".to_string() } else { self.flavors.keys().cloned().collect::<Vec<_>>().join(", ") },
        })?;
        flavor
            .get("data")
            .and_then(serde_yaml::Value::as_str)
            .ok_or_else(|| RegistryError::InvalidArtifact("onnx flavor has no `data` entry".into()))
    }

    /// Named input columns declared by the signature. Empty without a signature.
    pub fn input_columns(&self) -> Result<Vec<ColumnSpec>> {
        let Some(raw) = self.signature.as_ref().and_then(|s| s.inputs.as_deref()) else {
            return Ok(Vec::new());
        };
        let specs: Vec<ColumnSpec> =
            serde_json::from_str(raw).map_err(|e| RegistryError::InvalidArtifact(format!("signature inputs: {e}")))?;
        Ok(specs.into_iter().filter(|s| s.name.is_some()).collect())
    }
}

/// Fails when `declared` names a column outside `expected`, or declares a
/// type that cannot take the kind of values `expected` assigns to it.
pub fn check_columns<'a, T: fmt::Debug>(
    expected: &[(&str, CellKind)],
    declared: impl IntoIterator<Item = (&'a str, T)>,
    accepts: impl Fn(&T, CellKind) -> bool,
    source: &str,
) -> Result<()> {
    let mut unknown = Vec::new();
    let mut conflicts = Vec::new();
    for (name, ty) in declared {
        match expected.iter().find(|(column, _)| *column == name) {
            None => unknown.push(name),
            Some(&(_, kind)) if !accepts(&ty, kind) => conflicts.push(format!("`{name}` is {ty:?} but receives {kind} values")),
            Some(_) => {}
        }
    }
    if !unknown.is_empty() {
        return Err(RegistryError::SchemaMismatch(format!("{source} requires unknown columns: {}", unknown.join(", "))));
    }
    if !conflicts.is_empty() {
        return Err(RegistryError::SchemaMismatch(format!("{source} column types conflict: {}", conflicts.join("; "))));
    }
    Ok(())
}

/// [`check_columns`] over signature entries.
pub fn check_signature(expected: &[(&str, CellKind)], declared: &[ColumnSpec]) -> Result<()> {
    check_columns(
        expected,
        declared.iter().filter_map(|c| Some((c.name.as_deref()?, c.kind.as_str()))),
        |ty, kind| signature_type_accepts(ty, kind),
        "model signature",
    )
}
