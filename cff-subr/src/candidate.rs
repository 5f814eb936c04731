//! Pick candidate subroutines off the automaton.

use log::debug;

use crate::{
    charstring::{
        is_mask,
        operator::{ENDCHAR, SEPARATOR},
    },
    dawg::{Dawg, NodeId, ROOT},
    subr::{ProfitTable, Subr},
    Format,
};

/// Walk solid edges top-down from the root and turn every profitable node
/// into a candidate subroutine, its content being the node's longest string.
///
/// Nodes with a single outgoing edge are skipped: every occurrence of their
/// string continues the same way, so the longer string is the better
/// candidate. Walks stop at separators, candidates never span glyphs, and
/// at endchar, which makes a tail candidate.
///
/// `dawg.count_paths()` must have run.
pub(crate) fn select_candidates(dawg: &Dawg, corpus: &[u8], format: Format) -> Vec<Subr> {
    let table = ProfitTable::new();
    let mut subrs = vec![];
    // (node, mask tokens on its longest string)
    let mut stack: Vec<(NodeId, u32)> = vec![(ROOT, 0)];
    while let Some((id, masks)) = stack.pop() {
        for e in dawg.node(id).edges.iter() {
            if !dawg.is_solid(id, e) {
                continue;
            }
            let b0 = corpus[e.label as usize];
            if b0 == SEPARATOR {
                continue;
            }
            let masks = masks + is_mask(b0) as u32;
            let tail = b0 == ENDCHAR && format == Format::Cff;
            let child = dawg.node(e.child);
            if tail || child.edges.len() > 1 {
                let len = child.len;
                let has_return = format == Format::Cff && !tail;
                if table.worthwhile(len - masks, child.paths as u32, has_return) {
                    let mut subr = Subr::new(
                        child.end - len,
                        len,
                        masks,
                        child.paths as u32,
                        child.owner,
                    );
                    subr.tail = tail;
                    subrs.push(subr);
                }
            }
            if !tail {
                stack.push((e.child, masks));
            }
        }
    }

    debug!("{} candidate subrs from {} nodes", subrs.len(), dawg.len());
    subrs
}
