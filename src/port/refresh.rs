//! Refresh provider port.
//!
//! A provider is one UI area's data source. The scheduler only ever asks it
//! to refresh; how it fetches (CLI wrapper, cloud API, cluster API) is the
//! provider's business.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// Result returned by a provider refresh.
pub type ProviderResult = anyhow::Result<()>;

/// A named data-refresh provider.
///
/// Implementations must be cheap to call concurrently; the coordinator may
/// invoke the same provider from an auto-refresh pass and from a cascade wave
/// at the same time.
#[async_trait]
pub trait RefreshProvider: Send + Sync {
    /// Refresh this provider's data. Resolve on success, return an error on
    /// failure.
    async fn refresh(&self) -> ProviderResult;
}

/// Shared handle to a provider, as stored by the registry.
pub type SharedProvider = Arc<dyn RefreshProvider>;

/// Adapts an async closure into a [`RefreshProvider`].
///
/// ```
/// use hyperdash::port::refresh::{FnProvider, RefreshProvider};
///
/// let provider = FnProvider::new(|| async { Ok(()) });
/// # let rt = tokio::runtime::Runtime::new().unwrap();
/// # rt.block_on(async { provider.refresh().await.unwrap() });
/// ```
pub struct FnProvider<F> {
    f: F,
}

impl<F> FnProvider<F> {
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> RefreshProvider for FnProvider<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ProviderResult> + Send + 'static,
{
    async fn refresh(&self) -> ProviderResult {
        (self.f)().await
    }
}

/// Wrap an async closure as a shared provider.
pub fn provider_fn<F, Fut>(f: F) -> SharedProvider
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ProviderResult> + Send + 'static,
{
    Arc::new(FnProvider::new(f))
}
