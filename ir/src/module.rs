//! Modules: ordered collections of computations plus execution config.

use std::collections::HashMap;

use snafu::ensure;
use tracing::debug;

use crate::collective::ChannelId;
use crate::computation::Computation;
use crate::error::*;

/// Index of a computation inside its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputationId(usize);

impl ComputationId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Distributed execution settings of a module.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct ModuleConfig {
    /// Number of replicas running the program.
    #[builder(default = 1)]
    pub replica_count: usize,
    /// Number of SPMD partitions per replica.
    #[builder(default = 1)]
    pub num_partitions: usize,
    /// Whether the module was produced by SPMD partitioning.
    /// Defaults to `num_partitions > 1`.
    #[builder(default = num_partitions > 1)]
    pub use_spmd_partitioning: bool,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self { replica_count: 1, num_partitions: 1, use_spmd_partitioning: false }
    }
}

#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    config: ModuleConfig,
    computations: Vec<Computation>,
    entry: ComputationId,
}

impl Module {
    /// Create a module whose entry computation is `entry`.
    pub fn new(name: impl Into<String>, config: ModuleConfig, entry: Computation) -> Self {
        Self { name: name.into(), config, computations: vec![entry], entry: ComputationId(0) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn add_computation(&mut self, computation: Computation) -> ComputationId {
        self.computations.push(computation);
        ComputationId(self.computations.len() - 1)
    }

    pub fn entry_id(&self) -> ComputationId {
        self.entry
    }

    pub fn entry_computation(&self) -> &Computation {
        &self.computations[self.entry.0]
    }

    pub fn entry_computation_mut(&mut self) -> &mut Computation {
        &mut self.computations[self.entry.0]
    }

    pub fn computation(&self, id: ComputationId) -> &Computation {
        &self.computations[id.0]
    }

    pub fn computation_mut(&mut self, id: ComputationId) -> &mut Computation {
        &mut self.computations[id.0]
    }

    pub fn computations(&self) -> impl Iterator<Item = &Computation> {
        self.computations.iter()
    }

    /// Ids of every computation that is not a fusion body, in module order.
    pub fn non_fusion_computations(&self) -> Vec<ComputationId> {
        self.computations
            .iter()
            .enumerate()
            .filter(|(_, computation)| !computation.is_fusion())
            .map(|(index, _)| ComputationId(index))
            .collect()
    }

    /// Largest channel id used by any collective in the module.
    pub fn max_channel_id(&self) -> Option<ChannelId> {
        self.computations
            .iter()
            .flat_map(Computation::instructions)
            .filter_map(|inst| inst.op().collective_attrs()?.channel_id)
            .max()
    }

    /// Check structural invariants: roots exist, operand and user edges
    /// mirror each other, and no channel id is shared by two collectives.
    pub fn verify(&self) -> Result<()> {
        let mut channels: HashMap<ChannelId, String> = HashMap::new();
        for computation in &self.computations {
            computation.verify()?;
            for inst in computation.instructions() {
                let Some(channel_id) = inst.op().collective_attrs().and_then(|attrs| attrs.channel_id) else {
                    continue;
                };
                if let Some(first) = channels.insert(channel_id, inst.name().to_string()) {
                    return DuplicateChannelIdSnafu { channel_id, first, second: inst.name().to_string() }.fail();
                }
            }
        }
        debug!(module = %self.name, computations = self.computations.len(), "module verified");
        Ok(())
    }
}

impl Computation {
    /// Check that a root is set and operand/user edges are consistent.
    pub fn verify(&self) -> Result<()> {
        self.root_instruction()?;
        for inst in self.instructions() {
            for &operand in inst.operands() {
                let producer = self.instruction(operand)?;
                ensure!(
                    producer.users().contains(&inst.id()),
                    BrokenUseDefEdgeSnafu { user: inst.name(), operand: producer.name() }
                );
            }
            for &user in inst.users() {
                let consumer = self.instruction(user)?;
                ensure!(
                    consumer.operands().contains(&inst.id()),
                    BrokenUseDefEdgeSnafu { user: consumer.name(), operand: inst.name() }
                );
            }
        }
        Ok(())
    }
}
