mod config;
mod fallback;
mod merge;
mod model;
mod resolver;

pub use config::Config;
pub use fallback::Fallback;
pub use merge::{is_satisfied, merge_read_results};
pub use model::{
    MaterializationInfo, MaterializationMap, MaterializationUpdate, MissingMaterializationItem,
    ResolveRequest, ResolveResponse, ResolveResult, ResolveSuccess, ResolvedFlag,
};
pub use resolver::StickyResolver;

// Re-export the store crate, as its types are part of this crate's API.
pub use materializations;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] materializations::Error),
    #[error(transparent)]
    Engine(#[from] anyhow::Error),
    #[error("resolution engine protocol error: {0}")]
    Protocol(&'static str),
    #[error("materialization store could not supply missing materializations: {0:?}")]
    Unresolved(Vec<MissingMaterializationItem>),
    #[error("resolution did not settle within {0} engine calls")]
    MaxDepthExceeded(usize),
}

impl Error {
    /// Returns true if resolution failed because no materialization store is configured.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Error::Store(err) if err.is_not_supported())
    }
}

/// Engine is the flag resolution engine which is wrapped by sticky resolution.
/// It evaluates targeting rules and either succeeds, or reports the
/// materializations it requires but which were not supplied.
#[async_trait::async_trait]
pub trait Engine: Send + Sync {
    async fn resolve(&self, request: &ResolveRequest) -> anyhow::Result<ResolveResponse>;
}

/// Resolver produces final flag assignments for a request,
/// hiding any intermediate round-trips from its caller.
#[async_trait::async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve_sticky(&self, request: ResolveRequest) -> Result<ResolveSuccess, Error>;
}
