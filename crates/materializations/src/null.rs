use crate::{Error, MaterializationStore, ReadOp, ReadResult, WriteOp};

/// NullStore is used when no local persistence is configured.
/// Reads and writes fail with Error::NotSupported, so that a wrapping
/// resolver may fall back to a remote resolution authority.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

#[async_trait::async_trait]
impl MaterializationStore for NullStore {
    async fn read(&self, _ops: Vec<ReadOp>) -> Result<Vec<ReadResult>, Error> {
        Err(Error::NotSupported)
    }

    async fn write(&self, _ops: Vec<WriteOp>) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    async fn close(&self) -> Result<(), Error> {
        Ok(())
    }
}
