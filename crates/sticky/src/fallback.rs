use crate::{Error, ResolveRequest, ResolveSuccess, Resolver};
use std::sync::Arc;

/// Fallback resolves through a `primary` Resolver, and hands requests to a
/// `secondary` resolution authority when the primary has no materialization
/// store to consult. Typically the primary is a local StickyResolver over a
/// NullStore, and the secondary is a client of a remote resolution service.
#[derive(Clone)]
pub struct Fallback {
    primary: Arc<dyn Resolver>,
    secondary: Arc<dyn Resolver>,
}

impl Fallback {
    pub fn new(primary: Arc<dyn Resolver>, secondary: Arc<dyn Resolver>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait::async_trait]
impl Resolver for Fallback {
    async fn resolve_sticky(&self, request: ResolveRequest) -> Result<ResolveSuccess, Error> {
        match self.primary.resolve_sticky(request.clone()).await {
            Err(err) if err.is_not_supported() => {
                tracing::debug!("materializations are unavailable locally; resolving with fallback");
                self.secondary.resolve_sticky(request).await
            }
            result => result,
        }
    }
}
