//! Cascade plans: which components an operation refreshes, and when.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::id::ComponentId;

/// Reserved component reference meaning "run a full-registry pass".
pub const ALL_COMPONENTS: &str = "all";

/// A reference to the components a wave should refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentRef {
    /// One specific component.
    Named(ComponentId),
    /// Every enabled component, through the refresh coordinator.
    All,
}

impl ComponentRef {
    /// Shorthand for a named reference.
    pub fn named(id: impl Into<ComponentId>) -> Self {
        Self::Named(id.into())
    }

    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl From<&str> for ComponentRef {
    fn from(s: &str) -> Self {
        if s == ALL_COMPONENTS {
            Self::All
        } else {
            Self::Named(ComponentId::new(s))
        }
    }
}

impl From<String> for ComponentRef {
    fn from(s: String) -> Self {
        if s == ALL_COMPONENTS {
            Self::All
        } else {
            Self::Named(ComponentId::from(s))
        }
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(id) => write!(f, "{id}"),
            Self::All => f.write_str(ALL_COMPONENTS),
        }
    }
}

impl Serialize for ComponentRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Named(id) => serializer.serialize_str(id.as_str()),
            Self::All => serializer.serialize_str(ALL_COMPONENTS),
        }
    }
}

impl<'de> Deserialize<'de> for ComponentRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw))
    }
}

/// A wave fired on its own timer after the immediate wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelayedWave {
    pub components: Vec<ComponentRef>,
    #[serde(rename = "delay_ms", serialize_with = "serialize_millis")]
    pub delay: Duration,
}

impl DelayedWave {
    #[must_use]
    pub fn new(components: Vec<ComponentRef>, delay: Duration) -> Self {
        Self { components, delay }
    }
}

fn serialize_millis<S: Serializer>(delay: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
}

/// Refresh plan for one operation type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadePlan {
    /// Refreshed and awaited as part of the operation trigger.
    pub immediate: Vec<ComponentRef>,
    /// Each wave is scheduled independently relative to the trigger.
    pub delayed: Vec<DelayedWave>,
}

impl CascadePlan {
    #[must_use]
    pub fn new(immediate: Vec<ComponentRef>, delayed: Vec<DelayedWave>) -> Self {
        Self { immediate, delayed }
    }

    /// Every component reference across all waves.
    pub fn references(&self) -> impl Iterator<Item = &ComponentRef> {
        self.immediate
            .iter()
            .chain(self.delayed.iter().flat_map(|wave| wave.components.iter()))
    }
}

/// Operation type to cascade plan, validated at load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CascadeConfig {
    plans: BTreeMap<String, CascadePlan>,
}

impl CascadeConfig {
    #[must_use]
    pub fn new(plans: BTreeMap<String, CascadePlan>) -> Self {
        Self { plans }
    }

    /// Look up the plan configured for an operation type.
    #[must_use]
    pub fn plan(&self, operation_type: &str) -> Option<&CascadePlan> {
        self.plans.get(operation_type)
    }

    /// Operation types in lexical order.
    pub fn operation_types(&self) -> impl Iterator<Item = &str> {
        self.plans.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CascadePlan)> {
        self.plans.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
