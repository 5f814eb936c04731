//! Final call lists of glyphs and accepted subroutine bodies.

use std::cmp::Reverse;

use bitvec::prelude::*;
use log::debug;

use crate::{
    call::{call_list, is_well_formed, Call},
    corpus::Corpus,
    dawg::Owner,
    error::{Error, Result},
    subr::{Subr, SubrId, MAX_CALL_DEPTH},
    trie::MatchTrie,
};

/// Holder of a call list.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Site {
    Glyph(u32),
    Subr(SubrId),
}

#[derive(Debug)]
pub(crate) struct Layout {
    /// Calls of each corpus glyph, offsets relative to the glyph start.
    pub glyph_calls: Vec<Vec<Call>>,
    /// Calls of each accepted subroutine body, empty for the others.
    pub subr_calls: Vec<Vec<Call>>,
    pub accepted: BitVec,
    /// Call nesting of each accepted subroutine, 1 for a body without calls.
    pub depth: Vec<u32>,
    /// Calls to each subroutine over all glyphs and accepted bodies.
    pub usage: Vec<u32>,
}

/// A callee is usable from `caller` if both end up in indices the caller
/// can reach: the global one, or its own local one.
fn compatible(caller: Owner, callee: Owner, combined: bool) -> bool {
    combined || matches!(callee, Owner::Shared | Owner::Unset) || callee == caller
}

impl Layout {
    /// Rebuild call lists against the selected subroutines, bodies shortest
    /// first so each callee's depth is known before its callers.
    pub fn build(trie: &MatchTrie, corpus: &Corpus, subrs: &[Subr], combined: bool) -> Result<Self> {
        let n = subrs.len();
        let mut accepted = bitvec![0; n];
        for (id, s) in subrs.iter().enumerate() {
            accepted.set(id, s.is_selected());
        }
        let mut order: Vec<SubrId> = accepted.iter_ones().map(|id| id as SubrId).collect();
        order.sort_by_key(|&id| (subrs[id as usize].len, id));

        let data = &corpus.data;
        let mut depth = vec![0u32; n];
        let mut subr_calls = vec![vec![]; n];
        for id in order {
            let s = &subrs[id as usize];
            let calls = call_list(trie, data, subrs, s.span(), false, |c| {
                accepted[c as usize]
                    && depth[c as usize] < MAX_CALL_DEPTH
                    && compatible(s.owner, subrs[c as usize].owner, combined)
            });
            depth[id as usize] = 1 + calls
                .iter()
                .map(|c| depth[c.subr as usize])
                .max()
                .unwrap_or(0);
            subr_calls[id as usize] = calls;
        }

        let glyph_calls: Vec<Vec<Call>> = corpus
            .glyphs
            .iter()
            .map(|g| {
                call_list(trie, data, subrs, g.span(), true, |c| {
                    accepted[c as usize]
                        && depth[c as usize] <= MAX_CALL_DEPTH
                        && compatible(Owner::Tag(g.tag), subrs[c as usize].owner, combined)
                })
            })
            .collect();

        let mut r = Self {
            glyph_calls,
            subr_calls,
            accepted,
            depth,
            usage: vec![],
        };
        r.usage = r.count_usage(n);
        r.check(corpus, subrs)?;
        debug!(
            "layout: {} subrs accepted, {} glyph calls",
            r.accepted.count_ones(),
            r.glyph_calls.iter().map(Vec::len).sum::<usize>()
        );
        Ok(r)
    }

    fn count_usage(&self, n: usize) -> Vec<u32> {
        let mut usage = vec![0u32; n];
        let bodies = self.accepted.iter_ones().map(|id| &self.subr_calls[id]);
        for calls in self.glyph_calls.iter().chain(bodies) {
            for c in calls {
                usage[c.subr as usize] += 1;
            }
        }
        usage
    }

    fn check(&self, corpus: &Corpus, subrs: &[Subr]) -> Result<()> {
        for (g, calls) in corpus.glyphs.iter().zip(&self.glyph_calls) {
            if !is_well_formed(calls, subrs, g.span().len()) {
                return Err(Error::Internal(format!(
                    "overlapping calls in glyph at {}",
                    g.start
                )));
            }
        }
        for id in self.accepted.iter_ones() {
            if !is_well_formed(&self.subr_calls[id], subrs, subrs[id].len as usize) {
                return Err(Error::Internal(format!("overlapping calls in subr {}", id)));
            }
        }
        Ok(())
    }

    /// Accepted subroutines called at most once.
    pub fn futile(&self) -> Vec<SubrId> {
        self.accepted
            .iter_ones()
            .filter(|&id| self.usage[id] <= 1)
            .map(|id| id as SubrId)
            .collect()
    }

    /// Drop unused subroutines and inline single-use ones into their caller.
    /// Longest first, so a subroutine's callers are final when it is
    /// visited. Returns the number of subroutines removed.
    pub fn remove_single_use(&mut self, subrs: &[Subr]) -> Result<usize> {
        let mut callers: Vec<Vec<Site>> = vec![vec![]; subrs.len()];
        for (g, calls) in self.glyph_calls.iter().enumerate() {
            for c in calls {
                callers[c.subr as usize].push(Site::Glyph(g as u32));
            }
        }
        for id in self.accepted.iter_ones() {
            for c in &self.subr_calls[id] {
                callers[c.subr as usize].push(Site::Subr(id as SubrId));
            }
        }

        let mut order: Vec<SubrId> = self.accepted.iter_ones().map(|id| id as SubrId).collect();
        order.sort_by_key(|&id| (Reverse(subrs[id as usize].len), id));
        let mut removed = 0;
        for id in order {
            match self.usage[id as usize] {
                0 => {
                    self.accepted.set(id as usize, false);
                    for c in std::mem::take(&mut self.subr_calls[id as usize]) {
                        self.usage[c.subr as usize] -= 1;
                    }
                }
                1 => {
                    let site = callers[id as usize]
                        .iter()
                        .copied()
                        .find(|&site| {
                            self.is_live(site) && self.calls(site).iter().any(|c| c.subr == id)
                        })
                        .ok_or_else(|| Error::Internal(format!("caller of subr {} not found", id)))?;
                    self.accepted.set(id as usize, false);
                    let body = std::mem::take(&mut self.subr_calls[id as usize]);
                    for c in &body {
                        callers[c.subr as usize].push(site);
                    }
                    let calls = self.calls_mut(site);
                    let Some(i) = calls.iter().position(|c| c.subr == id) else {
                        return Err(Error::Internal(format!("call to subr {} lost", id)));
                    };
                    let at = calls[i].offset;
                    calls.splice(
                        i..=i,
                        body.into_iter().map(|c| Call {
                            subr: c.subr,
                            offset: c.offset + at,
                        }),
                    );
                }
                _ => continue,
            }
            self.usage[id as usize] = 0;
            removed += 1;
        }
        if removed > 0 {
            debug!("single-use cleanup removed {} subrs", removed);
        }
        Ok(removed)
    }

    fn is_live(&self, site: Site) -> bool {
        match site {
            Site::Glyph(_) => true,
            Site::Subr(id) => self.accepted[id as usize],
        }
    }

    fn calls(&self, site: Site) -> &[Call] {
        match site {
            Site::Glyph(g) => &self.glyph_calls[g as usize],
            Site::Subr(id) => &self.subr_calls[id as usize],
        }
    }

    fn calls_mut(&mut self, site: Site) -> &mut Vec<Call> {
        match site {
            Site::Glyph(g) => &mut self.glyph_calls[g as usize],
            Site::Subr(id) => &mut self.subr_calls[id as usize],
        }
    }

    /// Deepest call nesting starting from any glyph.
    pub fn max_depth(&self) -> u32 {
        self.glyph_calls
            .iter()
            .flatten()
            .map(|c| self.depth[c.subr as usize])
            .max()
            .unwrap_or(0)
    }
}
