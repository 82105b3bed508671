use materializations::{ReadOp, WriteOp};
use std::collections::BTreeMap;

/// MaterializationInfo is the known state of one unit within one materialization.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializationInfo {
    /// True if this info came from a genuine lookup of the unit,
    /// rather than being an empty placeholder.
    pub unit_in_info: bool,
    /// Assigned variant of each rule.
    pub rule_to_variant: BTreeMap<String, String>,
}

/// MaterializationMap maps a unit to its MaterializationInfo of each materialization.
pub type MaterializationMap = BTreeMap<String, BTreeMap<String, MaterializationInfo>>;

/// ResolveRequest is a request of the resolution engine.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    /// Evaluation payload, opaque to sticky resolution.
    pub payload: serde_json::Value,
    /// Materializations which are already known to the caller.
    #[serde(default)]
    pub materializations: MaterializationMap,
    /// Ask the engine to report missing materializations as soon as one is found.
    #[serde(default)]
    pub fail_fast_on_sticky: bool,
    /// Ask the engine to not apply sticky assignments at all.
    #[serde(default)]
    pub not_process_sticky: bool,
}

impl ResolveRequest {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload,
            ..Default::default()
        }
    }

    /// Build a request which is identical to this one,
    /// except for its `materializations`.
    pub fn with_materializations(self, materializations: MaterializationMap) -> Self {
        Self {
            materializations,
            ..self
        }
    }
}

/// MissingMaterializationItem is a slot which the engine requires but was not supplied.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingMaterializationItem {
    pub materialization: String,
    pub unit: String,
    pub rule: String,
}

/// MaterializationUpdate is an assignment computed by the engine,
/// which should be persisted to keep it sticky.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializationUpdate {
    pub materialization: String,
    pub unit: String,
    pub rule: String,
    pub variant: String,
}

/// ResolvedFlag is one flag assignment produced by the engine.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFlag {
    pub flag: String,
    pub variant: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveSuccess {
    pub assignments: Vec<ResolvedFlag>,
    /// Materializations to persist for future resolutions.
    #[serde(default)]
    pub updates: Vec<MaterializationUpdate>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolveResult {
    Success(ResolveSuccess),
    MissingMaterializations(Vec<MissingMaterializationItem>),
}

/// ResolveResponse is the response of the resolution engine.
/// Its `result` is a oneof: a response without one violates the engine protocol.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub result: Option<ResolveResult>,
}

impl From<ResolveResult> for ResolveResponse {
    fn from(result: ResolveResult) -> Self {
        Self {
            result: Some(result),
        }
    }
}

impl From<&MissingMaterializationItem> for ReadOp {
    fn from(item: &MissingMaterializationItem) -> Self {
        ReadOp {
            materialization: item.materialization.clone(),
            unit: item.unit.clone(),
            rule: item.rule.clone(),
        }
    }
}

impl From<MaterializationUpdate> for WriteOp {
    fn from(update: MaterializationUpdate) -> Self {
        let MaterializationUpdate {
            materialization,
            unit,
            rule,
            variant,
        } = update;

        WriteOp {
            materialization,
            unit,
            rule,
            variant,
        }
    }
}
