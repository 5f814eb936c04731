//! Assign subroutine calls to a byte span.

use std::{collections::BTreeMap, ops::Range};

use crate::{
    subr::{Subr, SubrId},
    trie::MatchTrie,
};

/// Call of `subr` replacing the bytes at `offset` of the span being
/// rewritten.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct Call {
    pub subr: SubrId,
    pub offset: u32,
}

/// Pick a maximal set of non-overlapping subroutine occurrences in
/// `corpus[span]`, longest subroutines first, gaps filled by shorter ones.
///
/// Only subroutines passing `accept` are considered. An occurrence covering
/// the whole span is skipped unless `self_match` is set, so a subroutine
/// body never calls itself. The result is sorted by offset.
pub(crate) fn call_list(
    trie: &MatchTrie,
    corpus: &[u8],
    subrs: &[Subr],
    span: Range<usize>,
    self_match: bool,
    accept: impl Fn(SubrId) -> bool,
) -> Vec<Call> {
    let span_len = span.len();
    let len = |id: SubrId| subrs[id as usize].len;
    let mut matches = vec![];
    trie.for_each_match(corpus, span, |subr, offset| {
        if !self_match && offset == 0 && len(subr) as usize == span_len {
            return;
        }
        if accept(subr) {
            matches.push(Call {
                subr,
                offset: offset as u32,
            });
        }
    });
    matches.sort_by(|a, b| {
        len(b.subr)
            .cmp(&len(a.subr))
            .then(a.offset.cmp(&b.offset))
    });

    let mut placed: BTreeMap<u32, Call> = BTreeMap::new();
    for m in matches {
        let end = m.offset + len(m.subr);
        if let Some((_, prev)) = placed.range(..=m.offset).next_back() {
            if prev.offset + len(prev.subr) > m.offset {
                continue;
            }
        }
        if let Some((&next, _)) = placed.range(m.offset..).next() {
            if next < end {
                continue;
            }
        }
        placed.insert(m.offset, m);
    }
    placed.into_values().collect()
}

/// Count every occurrence of every subroutine in the glyph spans, overlapping
/// ones included.
pub(crate) fn count_occurrences(
    trie: &MatchTrie,
    corpus: &[u8],
    glyphs: impl Iterator<Item = Range<usize>>,
    subrs: &mut [Subr],
) {
    let mut counts = vec![0u32; subrs.len()];
    for span in glyphs {
        trie.for_each_match(corpus, span, |subr, _| counts[subr as usize] += 1);
    }
    for (subr, count) in subrs.iter_mut().zip(counts) {
        subr.count = count;
        subr.uses = count as i64;
    }
}

/// Check calls are sorted, disjoint and inside a span of `span_len` bytes.
pub(crate) fn is_well_formed(calls: &[Call], subrs: &[Subr], span_len: usize) -> bool {
    let mut pos = 0;
    for c in calls {
        if (c.offset as usize) < pos {
            return false;
        }
        pos = (c.offset + subrs[c.subr as usize].len) as usize;
    }
    pos <= span_len
}

#[cfg(test)]
mod tests;
