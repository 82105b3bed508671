mod memory;
mod null;
mod sqlite;

pub use memory::MemoryStore;
pub use null::NullStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("materialization store is not supported")]
    NotSupported,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl Error {
    /// Returns true if this error signals that no backing store is configured.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Error::NotSupported)
    }
}

/// ReadOp requests the stored assignment of a single slot,
/// identified by its (materialization, unit, rule) triple.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct ReadOp {
    pub materialization: String,
    pub unit: String,
    pub rule: String,
}

/// WriteOp persists the assigned `variant` of a single slot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOp {
    pub materialization: String,
    pub unit: String,
    pub rule: String,
    pub variant: String,
}

/// Lookup is the outcome of reading a slot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "variant")]
pub enum Lookup {
    /// The slot holds an assigned variant.
    Variant(String),
    /// The slot exists but holds no variant.
    Empty,
    /// The slot was never written.
    NotFound,
}

/// ReadResult answers one ReadOp. It carries the slot it answers,
/// as stores may return results in any order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResult {
    pub materialization: String,
    pub unit: String,
    pub rule: String,
    pub lookup: Lookup,
}

impl ReadResult {
    pub fn new(op: ReadOp, lookup: Lookup) -> Self {
        let ReadOp {
            materialization,
            unit,
            rule,
        } = op;

        Self {
            materialization,
            unit,
            rule,
            lookup,
        }
    }

    /// Variant of this result, if the slot holds one.
    pub fn variant(&self) -> Option<&str> {
        match &self.lookup {
            Lookup::Variant(variant) => Some(variant),
            Lookup::Empty | Lookup::NotFound => None,
        }
    }
}

/// MaterializationStore is a pluggable persistence boundary for sticky assignments.
///
/// Implementations are shared across concurrent resolutions and must not assume
/// any coordination between calls: a single call is the only unit of atomicity.
#[async_trait::async_trait]
pub trait MaterializationStore: Send + Sync {
    /// Look up a batch of slots. Exactly one ReadResult is returned per ReadOp,
    /// in no particular order.
    async fn read(&self, ops: Vec<ReadOp>) -> Result<Vec<ReadResult>, Error>;

    /// Persist a batch of newly computed assignments.
    async fn write(&self, ops: Vec<WriteOp>) -> Result<(), Error>;

    /// Release backend resources. Closing more than once is not an error.
    async fn close(&self) -> Result<(), Error>;
}

// Slot key shared by store implementations.
type Slot = (String, String, String);

fn slot_of(materialization: &str, unit: &str, rule: &str) -> Slot {
    (
        materialization.to_string(),
        unit.to_string(),
        rule.to_string(),
    )
}

#[cfg(test)]
pub(crate) fn read_op(materialization: &str, unit: &str, rule: &str) -> ReadOp {
    ReadOp {
        materialization: materialization.to_string(),
        unit: unit.to_string(),
        rule: rule.to_string(),
    }
}

#[cfg(test)]
pub(crate) fn write_op(materialization: &str, unit: &str, rule: &str, variant: &str) -> WriteOp {
    WriteOp {
        materialization: materialization.to_string(),
        unit: unit.to_string(),
        rule: rule.to_string(),
        variant: variant.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_read_result_variant() {
        let found = ReadResult::new(read_op("m1", "u1", "r1"), Lookup::Variant("B".to_string()));
        let empty = ReadResult::new(read_op("m1", "u1", "r2"), Lookup::Empty);
        let missing = ReadResult::new(read_op("m1", "u2", "r1"), Lookup::NotFound);

        assert_eq!(found.variant(), Some("B"));
        assert_eq!(empty.variant(), None);
        assert_eq!(missing.variant(), None);

        insta::assert_json_snapshot!(vec![found, empty, missing], @r###"
        [
          {
            "materialization": "m1",
            "unit": "u1",
            "rule": "r1",
            "lookup": {
              "status": "variant",
              "variant": "B"
            }
          },
          {
            "materialization": "m1",
            "unit": "u1",
            "rule": "r2",
            "lookup": {
              "status": "empty"
            }
          },
          {
            "materialization": "m1",
            "unit": "u2",
            "rule": "r1",
            "lookup": {
              "status": "notFound"
            }
          }
        ]
        "###);
    }

    #[test]
    fn test_not_supported_kind() {
        assert!(Error::NotSupported.is_not_supported());
        assert!(!Error::Backend(anyhow::anyhow!("disk on fire")).is_not_supported());
        assert_eq!(
            Error::NotSupported.to_string(),
            "materialization store is not supported"
        );
    }
}
