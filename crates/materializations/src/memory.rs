use crate::{slot_of, Error, Lookup, MaterializationStore, ReadOp, ReadResult, Slot, WriteOp};
use std::collections::BTreeMap;
use std::sync::Mutex;

// Slots are None while the store is closed.
// A slot mapped to None exists but holds no variant.
type Slots = Option<BTreeMap<Slot, Option<String>>>;

/// MemoryStore keeps sticky assignments in process memory.
/// Assignments last for the lifetime of the store.
pub struct MemoryStore {
    slots: Mutex<Slots>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Some(BTreeMap::new())),
        }
    }

    /// Record a slot which exists but holds no variant.
    /// It reads back as Lookup::Empty until a variant is written.
    pub fn insert_empty(&self, op: ReadOp) -> Result<(), Error> {
        let mut slots = self.slots.lock().unwrap();
        let slots = open(&mut slots)?;

        slots
            .entry(slot_of(&op.materialization, &op.unit, &op.rule))
            .or_insert(None);
        Ok(())
    }

    /// Number of slots currently held by the store.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap()
            .as_ref()
            .map(BTreeMap::len)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn open(slots: &mut Slots) -> Result<&mut BTreeMap<Slot, Option<String>>, Error> {
    slots
        .as_mut()
        .ok_or_else(|| Error::Backend(anyhow::anyhow!("materialization store is closed")))
}

#[async_trait::async_trait]
impl MaterializationStore for MemoryStore {
    async fn read(&self, ops: Vec<ReadOp>) -> Result<Vec<ReadResult>, Error> {
        let mut slots = self.slots.lock().unwrap();
        let slots = open(&mut slots)?;

        Ok(ops
            .into_iter()
            .map(|op| {
                let lookup = match slots.get(&slot_of(&op.materialization, &op.unit, &op.rule)) {
                    Some(Some(variant)) => Lookup::Variant(variant.clone()),
                    Some(None) => Lookup::Empty,
                    None => Lookup::NotFound,
                };
                ReadResult::new(op, lookup)
            })
            .collect())
    }

    async fn write(&self, ops: Vec<WriteOp>) -> Result<(), Error> {
        let mut slots = self.slots.lock().unwrap();
        let slots = open(&mut slots)?;

        for WriteOp {
            materialization,
            unit,
            rule,
            variant,
        } in ops
        {
            slots.insert((materialization, unit, rule), Some(variant));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        if let Some(slots) = self.slots.lock().unwrap().take() {
            tracing::debug!(slots = slots.len(), "closed in-memory materialization store");
        }
        Ok(())
    }
}
