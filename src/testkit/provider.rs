//! Scripted [`RefreshProvider`] implementations for testing.
//!
//! One provider type, [`ScriptedProvider`], parameterized by a [`Behavior`].
//! Every provider reports into a [`ProviderProbe`] so tests can assert how
//! often it ran and how many runs overlapped. Providers built with
//! [`ScriptedProvider::logging_into`] also append their name to a shared
//! launch log, which is how tests observe launch order.
//!
//! Time-based behaviors use `tokio::time`, so they cooperate with paused-clock
//! tests (`#[tokio::test(start_paused = true)]`).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::port::{ProviderResult, RefreshProvider, SharedProvider};

/// Shared launch log: provider names in the order their calls started.
pub type LaunchLog = Arc<Mutex<Vec<String>>>;

/// Create an empty launch log.
pub fn launch_log() -> LaunchLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// What a scripted provider does when called.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Resolve immediately.
    Succeed,
    /// Resolve after the delay.
    SucceedAfter(Duration),
    /// Return an error immediately.
    Fail(String),
    /// Return an error after the delay.
    FailAfter(Duration, String),
    /// Never settle.
    Hang,
    /// Return an error for the first `n` calls, then resolve.
    FailFirst(u32, String),
    /// Panic with the message.
    Panic(String),
}

/// Call counters shared between a provider and the test that owns it.
#[derive(Debug, Default)]
pub struct ProviderProbe {
    calls: AtomicU32,
    active: AtomicU32,
    max_active: AtomicU32,
    completed: AtomicU32,
}

impl ProviderProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of calls that started.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls currently in progress.
    pub fn active(&self) -> u32 {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously running calls seen.
    pub fn max_active(&self) -> u32 {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Calls that returned (either way). Panics and hangs never count.
    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

/// A provider that follows a fixed [`Behavior`] on every call.
pub struct ScriptedProvider {
    name: String,
    behavior: Behavior,
    probe: Arc<ProviderProbe>,
    launches: Option<LaunchLog>,
    attempts: AtomicU32,
}

impl ScriptedProvider {
    pub fn new(name: impl Into<String>, behavior: Behavior) -> Self {
        Self {
            name: name.into(),
            behavior,
            probe: ProviderProbe::new(),
            launches: None,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn succeed(name: impl Into<String>) -> Self {
        Self::new(name, Behavior::Succeed)
    }

    pub fn succeed_after(name: impl Into<String>, delay: Duration) -> Self {
        Self::new(name, Behavior::SucceedAfter(delay))
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, Behavior::Fail(message.into()))
    }

    pub fn flaky(name: impl Into<String>, failures: u32, message: impl Into<String>) -> Self {
        Self::new(name, Behavior::FailFirst(failures, message.into()))
    }

    pub fn hang(name: impl Into<String>) -> Self {
        Self::new(name, Behavior::Hang)
    }

    pub fn panic(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, Behavior::Panic(message.into()))
    }

    /// Share an existing probe, e.g. to count calls across resubscriptions.
    pub fn with_probe(mut self, probe: Arc<ProviderProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Record every call start into `log`.
    pub fn logging_into(mut self, log: &LaunchLog) -> Self {
        self.launches = Some(Arc::clone(log));
        self
    }

    pub fn probe(&self) -> Arc<ProviderProbe> {
        Arc::clone(&self.probe)
    }

    /// Split into a shareable provider and its probe.
    pub fn shared(self) -> (SharedProvider, Arc<ProviderProbe>) {
        let probe = self.probe();
        (Arc::new(self), probe)
    }
}

#[async_trait]
impl RefreshProvider for ScriptedProvider {
    async fn refresh(&self) -> ProviderResult {
        self.probe.enter();
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.launches {
            log.lock().push(self.name.clone());
        }

        let result = match &self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::SucceedAfter(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(())
            }
            Behavior::Fail(message) => Err(anyhow::anyhow!("{message}")),
            Behavior::FailAfter(delay, message) => {
                tokio::time::sleep(*delay).await;
                Err(anyhow::anyhow!("{message}"))
            }
            Behavior::FailFirst(n, message) if attempt < *n => Err(anyhow::anyhow!("{message}")),
            Behavior::FailFirst(..) => Ok(()),
            Behavior::Hang => std::future::pending().await,
            Behavior::Panic(message) => panic!("{message}"),
        };

        self.probe.exit();
        result
    }
}
