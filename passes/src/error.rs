use snafu::Snafu;

pub type Result<T, E = PassError> = std::result::Result<T, E>;

/// Internal failures of a pass.
///
/// Every variant means a pass and the graph it inspected disagree; none of
/// them is an ordinary "pattern not found" outcome.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum PassError {
    /// A matched split dimension cannot be divided evenly among the group.
    #[snafu(display("split dimension {dim} of size {size} is not divisible by group size {group_size}"))]
    SplitDimNotDivisible { dim: usize, size: usize, group_size: usize },

    /// A matched instruction is not the kind the rewrite expects.
    #[snafu(display("'{name}' is not {expected}"))]
    UnexpectedInstruction { name: String, expected: &'static str },

    /// Graph mutation failed.
    #[snafu(display("graph mutation failed: {source}"))]
    Ir { source: tessera_ir::Error },
}
