//! Subnet lookup by name tag.
//!
//! Components that need "the gateway subnet" or "the cluster subnet" look it
//! up by a substring of its configured name. The first entry in declaration
//! order wins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::deferred::Deferred;
use crate::error::NotFound;

/// A configured subnet: name and address prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetSpec {
    pub name: String,
    pub cidr: String,
}

impl SubnetSpec {
    pub fn new(name: impl Into<String>, cidr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cidr: cidr.into(),
        }
    }
}

/// A subnet together with the identifier its descriptor will produce.
#[derive(Debug, Clone)]
pub struct SubnetEntry {
    pub spec: SubnetSpec,
    pub id: Deferred<String>,
}

/// Ordered table of declared subnets.
#[derive(Debug, Clone, Default)]
pub struct SubnetTable {
    entries: Vec<SubnetEntry>,
}

impl SubnetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subnet. Insertion order is lookup order.
    pub fn insert(&mut self, spec: SubnetSpec, id: Deferred<String>) {
        debug!("Subnet table: {} ({})", spec.name, spec.cidr);
        self.entries.push(SubnetEntry { spec, id });
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubnetEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose name contains `tag`.
    pub fn select_entry(&self, tag: &str) -> Result<&SubnetEntry, NotFound> {
        self.entries
            .iter()
            .find(|entry| entry.spec.name.contains(tag))
            .ok_or_else(|| NotFound::new("subnet", tag))
    }

    /// Identifier of the first subnet whose name contains `tag`.
    pub fn select(&self, tag: &str) -> Result<Deferred<String>, NotFound> {
        self.select_entry(tag).map(|entry| entry.id.clone())
    }

    /// Name to identifier map of every subnet, resolved as one value.
    pub fn ids(&self) -> Deferred<BTreeMap<String, String>> {
        let names: Vec<String> = self.entries.iter().map(|e| e.spec.name.clone()).collect();
        Deferred::all(self.entries.iter().map(|e| e.id.clone()))
            .map(move |ids| names.into_iter().zip(ids).collect())
    }
}
