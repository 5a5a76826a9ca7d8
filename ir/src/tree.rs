//! ASCII tree rendering of a computation, rooted at its result.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::io;
use std::rc::Rc;

use ptree::{Style, TreeItem};

use crate::computation::Computation;
use crate::instruction::InstrId;

/// Tree node that prints shared producers once and back-references them afterwards.
#[derive(Clone)]
struct InstructionTree<'a> {
    computation: &'a Computation,
    id: InstrId,
    visited: Rc<RefCell<HashSet<InstrId>>>,
    /// True if this node was already printed when `write_self` ran
    is_backref: RefCell<bool>,
}

impl<'a> InstructionTree<'a> {
    fn new(computation: &'a Computation, id: InstrId, visited: Rc<RefCell<HashSet<InstrId>>>) -> Self {
        Self { computation, id, visited, is_backref: RefCell::new(false) }
    }
}

impl TreeItem for InstructionTree<'_> {
    type Child = Self;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &Style) -> io::Result<()> {
        let Some(inst) = self.computation.get(self.id) else {
            return write!(f, "{} (removed)", self.id);
        };
        if !self.visited.borrow_mut().insert(self.id) {
            *self.is_backref.borrow_mut() = true;
            return write!(f, "%{} (see above)", inst.name());
        }
        write!(f, "%{} = {} {}", inst.name(), inst.shape(), inst.op().name())
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        if *self.is_backref.borrow() {
            return Cow::Borrowed(&[]);
        }
        let Some(inst) = self.computation.get(self.id) else {
            return Cow::Borrowed(&[]);
        };
        let children = inst
            .operands()
            .iter()
            .map(|operand| InstructionTree::new(self.computation, *operand, self.visited.clone()))
            .collect::<Vec<_>>();
        Cow::Owned(children)
    }
}

impl Computation {
    /// Render the graph reachable from the root as an ASCII tree.
    ///
    /// Returns an empty string when no root is set.
    pub fn tree(&self) -> String {
        let Some(root) = self.root() else {
            return String::new();
        };
        let tree = InstructionTree::new(self, root, Rc::new(RefCell::new(HashSet::new())));
        let mut buf = Vec::new();
        if ptree::write_tree(&tree, &mut buf).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}
