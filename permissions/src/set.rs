//! A small set of capabilities.

use rider_types::CapabilityKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The capabilities a flow requires.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<CapabilityKind>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every capability the platform knows about.
    pub fn all() -> Self {
        CapabilityKind::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, capability: CapabilityKind) -> bool {
        self.0.insert(capability)
    }

    pub fn contains(&self, capability: CapabilityKind) -> bool {
        self.0.contains(&capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = CapabilityKind> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<CapabilityKind> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = CapabilityKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
