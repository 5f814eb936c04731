//! Superior/inferior links between candidate subroutines, and propagation of
//! body length changes along them.
//!
//! A subroutine's body length depends on which of its inferiors are
//! selected: a selected inferior shrinks to a call, an unselected one stays
//! inline with whatever its own selected inferiors saved. Each change is
//! pushed up the superior links, through unselected superiors (their content
//! is inline in their callers) and stopping at selected ones (their callers
//! only see the call).

use log::debug;

use crate::{
    call::call_list,
    subr::{Link, State, Subr, SubrId},
    trie::MatchTrie,
};

/// Link every candidate to the candidates its own content would call.
pub(crate) fn build_relations(trie: &MatchTrie, corpus: &[u8], subrs: &mut [Subr]) {
    let all: &[Subr] = subrs;
    let lists: Vec<_> = all
        .iter()
        .map(|s| call_list(trie, corpus, all, s.span(), false, |_| true))
        .collect();
    let mut links = 0;
    for (id, calls) in lists.into_iter().enumerate() {
        for c in calls {
            subrs[id].inferiors.push(Link {
                subr: c.subr,
                offset: c.offset,
            });
            subrs[c.subr as usize].superiors.push(Link {
                subr: id as SubrId,
                offset: c.offset,
            });
            links += 1;
        }
    }
    debug!("relation graph: {} subrs, {} links", subrs.len(), links);
}

/// Add `delta` to the body length of every superior of `id`, recursively
/// through unselected ones. Each link is one call site, so a superior
/// containing `id` twice gets the delta twice.
fn propagate(subrs: &mut [Subr], id: SubrId, delta: i64) {
    if delta == 0 {
        return;
    }
    let mut stack = vec![id];
    while let Some(id) = stack.pop() {
        for i in 0..subrs[id as usize].superiors.len() {
            let sup = subrs[id as usize].superiors[i].subr;
            let s = &mut subrs[sup as usize];
            s.delta += delta;
            if !s.is_selected() {
                stack.push(sup);
            }
        }
    }
}

pub(crate) fn select(subrs: &mut [Subr], id: SubrId) {
    let s = &mut subrs[id as usize];
    s.state = State::Selected;
    // Occurrences of an inferior inside every copy of this subroutine turn
    // into the one inside its body.
    let collapsed = (s.uses - 1).max(0);
    s.collapsed = collapsed;
    let delta = s.call_size() - s.body_len();
    for i in 0..subrs[id as usize].inferiors.len() {
        let inf = subrs[id as usize].inferiors[i].subr;
        subrs[inf as usize].uses -= collapsed;
    }
    propagate(subrs, id, delta);
}

pub(crate) fn reject(subrs: &mut [Subr], id: SubrId) {
    let s = &mut subrs[id as usize];
    debug_assert_eq!(s.state, State::Unmarked);
    s.state = State::Rejected;
}

/// Undo `select()`, superiors get the inline body back.
pub(crate) fn deselect(subrs: &mut [Subr], id: SubrId) {
    let s = &mut subrs[id as usize];
    debug_assert_eq!(s.state, State::Selected);
    s.state = State::Rejected;
    let collapsed = std::mem::take(&mut s.collapsed);
    let delta = s.body_len() - s.call_size();
    for i in 0..subrs[id as usize].inferiors.len() {
        let inf = subrs[id as usize].inferiors[i].subr;
        subrs[inf as usize].uses += collapsed;
    }
    propagate(subrs, id, delta);
}

#[cfg(test)]
mod tests;
