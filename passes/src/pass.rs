//! The interface a pass pipeline drives.

use tessera_ir::Module;

use crate::error::Result;

/// A transformation over a whole module.
pub trait ModulePass {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// Rewrite `module` in place and report whether anything changed.
    ///
    /// An error aborts the pass; rewrites already applied stay in effect.
    fn run(&self, module: &mut Module) -> Result<bool>;
}
