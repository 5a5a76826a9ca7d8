//! Reduce-scatter creation.
//!
//! An all-reduce whose only consumer is a dynamic-slice that hands each
//! participant its own chunk wastes bandwidth: every participant receives the
//! whole reduced array and keeps a fraction of it. [`ReduceScatterCreator`]
//! replaces such chains with a single reduce-scatter that only delivers the
//! chunk.
//!
//! ```text
//! %ar = f32[32,8,128] all-reduce(%param), replica_groups={}
//! %ds = f32[4,8,128] dynamic-slice(%ar, %offset, %zero, %zero)
//!   =>
//! %rs = f32[4,8,128] reduce-scatter(%param), dimensions={0}, replica_groups={}
//! ```
//!
//! - [`identity`] - evaluates slice offsets per participant
//! - [`matcher`] - recognizes the chain
//! - [`rewriter`] - performs the substitution

pub mod identity;
pub mod matcher;
pub mod rewriter;

use tracing::debug;

use tessera_ir::{ChannelIdAllocator, Module, ModuleConfig};

pub use matcher::{MatchOptions, ReduceScatterMatch, match_reduce_scatter};
pub use rewriter::rewrite;

use crate::error::*;
use crate::pass::ModulePass;

/// Pass that fuses all-reduce + dynamic-slice into reduce-scatter.
#[derive(Debug, Clone, Default)]
pub struct ReduceScatterCreator {
    options: MatchOptions,
}

impl ReduceScatterCreator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: MatchOptions) -> Self {
        Self { options }
    }

    /// Pass configured from environment variables, see [`MatchOptions::from_env`].
    pub fn from_env() -> Self {
        Self::with_options(MatchOptions::from_env())
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }
}

impl ModulePass for ReduceScatterCreator {
    fn name(&self) -> &'static str {
        "reduce-scatter-creator"
    }

    #[tracing::instrument(skip_all, fields(module = %module.name()))]
    fn run(&self, module: &mut Module) -> Result<bool> {
        let config: ModuleConfig = module.config().clone();
        let mut channels = ChannelIdAllocator::for_module(module);
        let mut changed = false;

        for computation_id in module.non_fusion_computations() {
            let computation = module.computation_mut(computation_id);
            // Fixed before mutation: new instructions are never visited and
            // removed ones are skipped.
            for id in computation.post_order() {
                let is_all_reduce = computation.get(id).is_some_and(|inst| inst.op().is_all_reduce());
                if !is_all_reduce {
                    continue;
                }
                let Some(matched) = match_reduce_scatter(computation, id, &config, &self.options) else {
                    continue;
                };
                rewrite(computation, &matched, &mut channels)?;
                changed = true;
            }
        }

        debug!(changed, next_channel_id = channels.peek().0, "reduce-scatter creation finished");
        Ok(changed)
    }
}
