//! Group selector: decide which candidates become subroutines.
//!
//! Candidates linked through the relation graph form *social groups*, each
//! group is walked as one chain so a subroutine's saving is judged with its
//! relatives already decided. Then the call depth and index operand size
//! estimates are checked, which may deselect subroutines or re-run the whole
//! selection once.

use std::{cmp::Reverse, collections::BTreeMap};

use bitvec::prelude::*;
use log::{debug, warn};

use crate::{
    charstring::slot_sizes,
    dawg::Owner,
    error::{Error, Result},
    relation::{deselect, reject, select},
    subr::{State, Subr, SubrId, MAX_CALL_DEPTH},
    Format,
};

/// Index a subroutine is written to.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub(crate) enum Dest {
    Global,
    /// Local index of the sub-font tagged so.
    Local(u16),
}

impl Dest {
    /// In combined mode everything lands in one pool, split between the
    /// global and the only local index by rank.
    pub fn of(owner: Owner, combined: bool) -> Self {
        match owner {
            Owner::Tag(t) if !combined => Dest::Local(t),
            _ => Dest::Global,
        }
    }
}

/// Split a ranked combined pool: even ranks go global, odd ranks local.
pub(crate) fn interleave(ranked: &[SubrId]) -> (Vec<SubrId>, Vec<SubrId>) {
    let global = ranked.iter().step_by(2).copied().collect();
    let local = ranked.iter().skip(1).step_by(2).copied().collect();
    (global, local)
}

/// Passes of selection with index size re-estimation.
const TIER_PASSES: usize = 2;

/// Outcome counters of one `Selection::run()`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SelectionStats {
    pub selected: usize,
    pub depth_reductions: usize,
    pub truncated: usize,
}

pub(crate) struct Selection<'a> {
    subrs: &'a mut [Subr],
    format: Format,
    combined: bool,
    /// Maximum subroutines per index.
    max_subrs: usize,
    stats: SelectionStats,
}

impl<'a> Selection<'a> {
    pub fn new(subrs: &'a mut [Subr], format: Format, combined: bool, max_subrs: usize) -> Self {
        Self {
            subrs,
            format,
            combined,
            max_subrs,
            stats: SelectionStats::default(),
        }
    }

    /// Run selection to completion, leaving the chosen subroutines in
    /// `State::Selected`.
    pub fn run(mut self) -> Result<SelectionStats> {
        for s in self.subrs.iter_mut() {
            s.index_size = 1;
        }
        for pass in 0..TIER_PASSES {
            for s in self.subrs.iter_mut() {
                s.reset();
            }
            self.stats.depth_reductions = 0;
            self.select_all();
            self.check_depth()?;
            let changed = self.assign_tiers();
            debug!(
                "selection pass {}: {} selected, tiers changed: {}",
                pass,
                self.selected_count(),
                changed
            );
            if !changed {
                break;
            }
        }
        self.truncate();
        self.stats.selected = self.selected_count();
        Ok(self.stats)
    }

    fn selected_count(&self) -> usize {
        self.subrs.iter().filter(|s| s.is_selected()).count()
    }

    /// Global subroutines first, so local ones are judged knowing which
    /// shared content is already a call.
    fn select_all(&mut self) {
        if self.combined {
            let all: Vec<SubrId> = (0..self.subrs.len() as SubrId).collect();
            self.select_set(&all);
            return;
        }
        let mut sets: BTreeMap<Dest, Vec<SubrId>> = BTreeMap::new();
        for (id, s) in self.subrs.iter().enumerate() {
            sets.entry(Dest::of(s.owner, false))
                .or_default()
                .push(id as SubrId);
        }
        for set in sets.values() {
            self.select_set(set);
        }
    }

    fn select_set(&mut self, set: &[SubrId]) {
        for chain in self.social_groups(set) {
            for id in chain {
                let s = &self.subrs[id as usize];
                if s.state != State::Unmarked {
                    continue;
                }
                if !s.futile && s.saving(self.format) > 0 {
                    select(self.subrs, id);
                } else {
                    reject(self.subrs, id);
                }
            }
        }
    }

    /// Connected components of `set` over superior and inferior links, each
    /// ordered as a selection chain, components ordered by their leader.
    fn social_groups(&self, set: &[SubrId]) -> Vec<Vec<SubrId>> {
        let n = self.subrs.len();
        let mut in_set = bitvec![0; n];
        for &id in set {
            in_set.set(id as usize, true);
        }
        let mut visited = bitvec![0; n];
        let mut groups = vec![];
        for &start in set {
            if visited[start as usize] {
                continue;
            }
            visited.set(start as usize, true);
            let mut group = vec![start];
            let mut i = 0;
            while i < group.len() {
                let s = &self.subrs[group[i] as usize];
                for link in s.superiors.iter().chain(&s.inferiors) {
                    let id = link.subr as usize;
                    if in_set[id] && !visited[id] {
                        visited.set(id, true);
                        group.push(link.subr);
                    }
                }
                i += 1;
            }
            group.sort_by_key(|&id| self.chain_key(id));
            groups.push(group);
        }
        groups.sort_by_cached_key(|g| {
            let leader = g[0];
            (Reverse(self.subrs[leader as usize].saving(self.format)), leader)
        });
        groups
    }

    fn chain_key(&self, id: SubrId) -> (bool, Reverse<i64>, Reverse<u32>, SubrId) {
        let s = &self.subrs[id as usize];
        (
            s.owner != Owner::Shared,
            Reverse(s.saving(self.format)),
            Reverse(s.len),
            id,
        )
    }

    /// Deselect subroutines whose nesting of selected calls would exceed
    /// the call depth limit, shortest first so callees are final.
    fn check_depth(&mut self) -> Result<()> {
        let mut order: Vec<SubrId> = (0..self.subrs.len() as SubrId).collect();
        order.sort_by_key(|&id| (self.subrs[id as usize].len, id));
        let mut level = vec![0u32; self.subrs.len()];
        for id in order {
            let s = &self.subrs[id as usize];
            let mut lvl = 0;
            for link in &s.inferiors {
                let inf = &self.subrs[link.subr as usize];
                if inf.len >= s.len {
                    return Err(Error::Internal(format!(
                        "subr {} calls subr {} of no shorter length",
                        id, link.subr
                    )));
                }
                let l = level[link.subr as usize] + inf.is_selected() as u32;
                lvl = lvl.max(l);
            }
            level[id as usize] = lvl;
            if s.is_selected() && 1 + lvl > MAX_CALL_DEPTH {
                deselect(self.subrs, id);
                self.stats.depth_reductions += 1;
            }
        }
        if self.stats.depth_reductions > 0 {
            warn!(
                "subr stack depth exceeded (reduced): {} subrs deselected",
                self.stats.depth_reductions
            );
        }
        Ok(())
    }

    /// Selection first, then by savings, length and occurrences.
    fn fitness_key(&self, id: SubrId) -> (bool, Reverse<i64>, Reverse<u32>, Reverse<u32>, SubrId) {
        let s = &self.subrs[id as usize];
        (
            !s.is_selected(),
            Reverse(s.saving(self.format)),
            Reverse(s.len),
            Reverse(s.count),
            id,
        )
    }

    /// Candidates of each destination index, ranked by fitness.
    fn destinations(&self) -> BTreeMap<Dest, Vec<SubrId>> {
        let mut r: BTreeMap<Dest, Vec<SubrId>> = BTreeMap::new();
        for (id, s) in self.subrs.iter().enumerate() {
            r.entry(Dest::of(s.owner, self.combined))
                .or_default()
                .push(id as SubrId);
        }
        for ids in r.values_mut() {
            ids.sort_by_cached_key(|&id| self.fitness_key(id));
        }
        r
    }

    /// Set each candidate's call operand size from its rank in the index it
    /// would land in. Returns true if any size changed.
    fn assign_tiers(&mut self) -> bool {
        let mut changed = false;
        for ranked in self.destinations().into_values() {
            let selected = ranked
                .iter()
                .take_while(|&&id| self.subrs[id as usize].is_selected())
                .count();
            let indices = if self.combined {
                let (g, l) = interleave(&ranked[..selected]);
                vec![g, l]
            } else {
                vec![ranked[..selected].to_vec()]
            };
            let mut worst = 1;
            for ids in indices {
                let ids = &ids[..ids.len().min(self.max_subrs)];
                let sizes = slot_sizes(ids.len());
                for (&id, &size) in ids.iter().zip(&sizes) {
                    changed |= self.set_index_size(id, size);
                }
                worst = worst.max(sizes.last().copied().unwrap_or(1));
            }
            for id in ranked {
                let s = &self.subrs[id as usize];
                if !s.is_selected() {
                    changed |= self.set_index_size(id, worst);
                }
            }
        }
        changed
    }

    fn set_index_size(&mut self, id: SubrId, size: u8) -> bool {
        let s = &mut self.subrs[id as usize];
        let changed = s.is_selected() && s.index_size != size;
        s.index_size = size;
        changed
    }

    /// Deselect the lowest ranked subroutines of indices over budget.
    fn truncate(&mut self) {
        let cap = if self.combined {
            self.max_subrs * 2
        } else {
            self.max_subrs
        };
        for ranked in self.destinations().into_values() {
            let selected = ranked
                .iter()
                .take_while(|&&id| self.subrs[id as usize].is_selected())
                .count();
            if selected <= cap {
                continue;
            }
            for &id in ranked[cap..selected].iter().rev() {
                deselect(self.subrs, id);
                self.stats.truncated += 1;
            }
        }
        if self.stats.truncated > 0 {
            warn!(
                "subr count over budget of {}: {} subrs truncated",
                cap, self.stats.truncated
            );
        }
    }
}

#[cfg(test)]
mod tests;
