//! The pass driver: one sequential read of the input.
//!
//! Every entity is first handed to the pass's kind callback (global
//! bookkeeping such as order checks or parent collection) and then to the
//! per-extract callback once for each extract. Passes are monomorphised, so
//! a strategy pays nothing for callbacks it leaves at their defaults beyond
//! an inlined no-op, and the per-extract loop is skipped entirely for kinds
//! excluded by [`Pass::EXTRACT_KINDS`].

use log::debug;

use crate::{
    Entity, EntitySource, EntityVisitor, ExtractError, KindFilter, Node, Progress, Relation, Way,
};

/// Callbacks for one pass of a strategy.
pub trait Pass {
    /// Per-extract state the pass operates on.
    type Extract;

    /// Kinds for which the per-extract callbacks do any work.
    const EXTRACT_KINDS: KindFilter = KindFilter::ALL;

    /// Called once per node before the per-extract callbacks.
    ///
    /// # Errors
    /// Any error aborts the pass.
    fn node(&mut self, _node: &Node) -> Result<(), ExtractError> {
        Ok(())
    }

    /// Called once per way before the per-extract callbacks.
    ///
    /// # Errors
    /// Any error aborts the pass.
    fn way(&mut self, _way: &Way) -> Result<(), ExtractError> {
        Ok(())
    }

    /// Called once per relation before the per-extract callbacks.
    ///
    /// # Errors
    /// Any error aborts the pass.
    fn relation(&mut self, _relation: &Relation) -> Result<(), ExtractError> {
        Ok(())
    }

    /// Called once per node and extract.
    ///
    /// # Errors
    /// Any error aborts the pass.
    fn enode(&mut self, _extract: &mut Self::Extract, _node: &Node) -> Result<(), ExtractError> {
        Ok(())
    }

    /// Called once per way and extract.
    ///
    /// # Errors
    /// Any error aborts the pass.
    fn eway(&mut self, _extract: &mut Self::Extract, _way: &Way) -> Result<(), ExtractError> {
        Ok(())
    }

    /// Called once per relation and extract.
    ///
    /// # Errors
    /// Any error aborts the pass.
    fn erelation(
        &mut self,
        _extract: &mut Self::Extract,
        _relation: &Relation,
    ) -> Result<(), ExtractError> {
        Ok(())
    }
}

/// Read `source` once, dispatching every entity accepted by `kinds`.
///
/// # Errors
/// Returns the first error raised by the source or by a callback.
pub fn run_pass<P: Pass>(
    source: &dyn EntitySource,
    kinds: KindFilter,
    pass: &mut P,
    extracts: &mut [P::Extract],
    progress: &mut Progress,
) -> Result<(), ExtractError> {
    let mut dispatch = Dispatch {
        pass,
        extracts,
        progress,
        kinds,
        seen: [0; 3],
    };
    source.read(kinds, &mut dispatch)?;
    let [nodes, ways, relations] = dispatch.seen;
    debug!(
        "Pass over {} saw {nodes} nodes, {ways} ways, {relations} relations",
        source.name()
    );
    Ok(())
}

struct Dispatch<'a, P: Pass> {
    pass: &'a mut P,
    extracts: &'a mut [P::Extract],
    progress: &'a mut Progress,
    kinds: KindFilter,
    seen: [u64; 3],
}

impl<P: Pass> EntityVisitor for Dispatch<'_, P> {
    fn visit(&mut self, entity: Entity) -> Result<(), ExtractError> {
        if !self.kinds.accepts(entity.kind()) {
            return Ok(());
        }
        match &entity {
            Entity::Node(node) => {
                self.seen[0] += 1;
                self.pass.node(node)?;
                if P::EXTRACT_KINDS.nodes {
                    for extract in self.extracts.iter_mut() {
                        self.pass.enode(extract, node)?;
                    }
                }
            }
            Entity::Way(way) => {
                self.seen[1] += 1;
                self.pass.way(way)?;
                if P::EXTRACT_KINDS.ways {
                    for extract in self.extracts.iter_mut() {
                        self.pass.eway(extract, way)?;
                    }
                }
            }
            Entity::Relation(relation) => {
                self.seen[2] += 1;
                self.pass.relation(relation)?;
                if P::EXTRACT_KINDS.relations {
                    for extract in self.extracts.iter_mut() {
                        self.pass.erelation(extract, relation)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn bytes_read(&mut self, offset: u64) {
        self.progress.update(offset);
    }
}
