//! Collective-communication attributes: replica groups, channel ids and the
//! group mode that decides how participants are numbered.

use std::fmt;

use itertools::Itertools;
use smallvec::SmallVec;

use crate::module::Module;
use crate::types::ReductionKind;

/// Ordered participant ids of one group.
pub type ReplicaGroup = SmallVec<[usize; 8]>;

/// Group membership of a collective.
///
/// Empty means "every participant of the domain in one group".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ReplicaGroups {
    groups: Vec<ReplicaGroup>,
}

impl ReplicaGroups {
    pub fn new<G, I>(groups: G) -> Self
    where
        G: IntoIterator<Item = I>,
        I: IntoIterator<Item = usize>,
    {
        Self { groups: groups.into_iter().map(|g| g.into_iter().collect()).collect() }
    }

    /// All participants form a single group.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn groups(&self) -> &[ReplicaGroup] {
        &self.groups
    }

    /// Size shared by every group, or `None` if empty or non-uniform.
    pub fn uniform_group_size(&self) -> Option<usize> {
        let first = self.groups.first()?.len();
        self.groups.iter().all(|g| g.len() == first).then_some(first)
    }

    /// True if the groups are uniform and cover `[0, domain)` exactly once.
    pub fn partitions_domain(&self, domain: usize) -> bool {
        if self.uniform_group_size().is_none() {
            return false;
        }
        let mut seen = vec![false; domain];
        for &id in self.groups.iter().flatten() {
            match seen.get_mut(id) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        seen.into_iter().all(|s| s)
    }

    /// Concrete groups over `[0, domain)`.
    ///
    /// Empty membership expands to one group holding the whole domain in
    /// ascending order. Returns `None` when the declared groups do not
    /// partition the domain.
    pub fn resolve(&self, domain: usize) -> Option<Vec<ReplicaGroup>> {
        if domain == 0 {
            return None;
        }
        if self.groups.is_empty() {
            return Some(vec![(0..domain).collect()]);
        }
        self.partitions_domain(domain).then(|| self.groups.clone())
    }
}

impl From<Vec<Vec<usize>>> for ReplicaGroups {
    fn from(groups: Vec<Vec<usize>>) -> Self {
        Self::new(groups)
    }
}

impl<const N: usize, const M: usize> From<[[usize; M]; N]> for ReplicaGroups {
    fn from(groups: [[usize; M]; N]) -> Self {
        Self::new(groups)
    }
}

impl fmt::Display for ReplicaGroups {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups = self.groups.iter().map(|g| format!("{{{}}}", g.iter().join(","))).join(",");
        write!(f, "{{{groups}}}")
    }
}

// =========================================================================
// Channel ids
// =========================================================================

/// Identifier of a cross-program communication channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic source of fresh channel ids.
///
/// Passes create one per run, seeded past every id already present in the
/// module, and thread it through each rewrite that needs an id.
#[derive(Debug, Clone)]
pub struct ChannelIdAllocator {
    next: u64,
}

impl ChannelIdAllocator {
    pub fn starting_at(next: ChannelId) -> Self {
        Self { next: next.0 }
    }

    /// Allocator whose first id is one past the largest id in `module` (1 if none).
    pub fn for_module(module: &Module) -> Self {
        Self { next: module.max_channel_id().map_or(1, |id| id.0 + 1) }
    }

    /// The id the next call to [`allocate`](Self::allocate) returns.
    pub fn peek(&self) -> ChannelId {
        ChannelId(self.next)
    }

    pub fn allocate(&mut self) -> ChannelId {
        let id = ChannelId(self.next);
        self.next += 1;
        id
    }
}

// =========================================================================
// Collective attributes
// =========================================================================

/// How replica group entries are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectiveGroupMode {
    /// Groups hold replica ids; each partition communicates independently.
    CrossReplica,
    /// Groups hold replica ids; every partition of those replicas participates.
    CrossReplicaAndPartition,
    /// Groups hold flattened ids `replica_id * num_partitions + partition_id`.
    FlattenedId,
}

impl CollectiveGroupMode {
    /// Mode of a reduction collective, or `None` for the invalid combination
    /// of global device ids without a channel.
    pub fn from_flags(channel_id: Option<ChannelId>, use_global_device_ids: bool) -> Option<Self> {
        match (channel_id.is_some(), use_global_device_ids) {
            (false, false) => Some(Self::CrossReplica),
            (true, false) => Some(Self::CrossReplicaAndPartition),
            (true, true) => Some(Self::FlattenedId),
            (false, true) => None,
        }
    }
}

/// Attributes shared by all-reduce and reduce-scatter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, bon::Builder)]
pub struct CollectiveAttrs {
    #[builder(default)]
    pub reduction: ReductionKind,
    #[builder(default, into)]
    pub replica_groups: ReplicaGroups,
    #[builder(default)]
    pub constrain_layout: bool,
    pub channel_id: Option<ChannelId>,
    #[builder(default)]
    pub use_global_device_ids: bool,
}

impl CollectiveAttrs {
    pub fn group_mode(&self) -> Option<CollectiveGroupMode> {
        CollectiveGroupMode::from_flags(self.channel_id, self.use_global_device_ids)
    }
}
