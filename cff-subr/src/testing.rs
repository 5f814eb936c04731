//! Builders shared by unit tests.

use std::ops::Range;

use crate::{
    call::count_occurrences,
    candidate::select_candidates,
    charstring::separator,
    corpus::{Corpus, FontInput},
    dawg::{Dawg, Owner},
    relation::build_relations,
    subr::{Subr, SubrId},
    trie::MatchTrie,
    Format,
};

/// Concatenate glyphs, each followed by a separator, returns data and
/// offsets.
pub(crate) fn font_data(glyphs: &[Vec<u8>]) -> (Vec<u8>, Vec<u32>) {
    let mut data = vec![];
    let mut offsets = vec![0];
    for (i, g) in glyphs.iter().enumerate() {
        data.extend_from_slice(g);
        data.extend_from_slice(&separator(i as u32));
        offsets.push(data.len() as u32);
    }
    (data, offsets)
}

/// Corpus of non CID-keyed fonts.
pub(crate) fn corpus(fonts: &[Vec<Vec<u8>>]) -> Corpus {
    let data: Vec<_> = fonts.iter().map(|glyphs| font_data(glyphs)).collect();
    let inputs: Vec<_> = data.iter().map(|(d, o)| FontInput::new(d, o)).collect();
    Corpus::build(&inputs).unwrap()
}

/// `n` pseudo-random one-byte operands followed by `rlineto`.
pub(crate) fn path(seed: u32, n: u32) -> Vec<u8> {
    let mut r: Vec<u8> = (0..n)
        .map(|i| {
            let h = seed.wrapping_mul(0x9e37_79b9) ^ i.wrapping_mul(0x85eb_ca6b);
            let h = h ^ (h >> 15);
            32 + (h % 200) as u8
        })
        .collect();
    r.push(5);
    r
}

/// Lay out `contents` followed by `text`, returns the corpus, one
/// subroutine per content and the span of `text`.
pub(crate) fn subrs_of(contents: &[&[u8]], text: &[u8]) -> (Vec<u8>, Vec<Subr>, Range<usize>) {
    let mut corpus = vec![];
    let mut subrs = vec![];
    for c in contents {
        subrs.push(Subr::new(corpus.len() as u32, c.len() as u32, 0, 0, Owner::Tag(0)));
        corpus.extend_from_slice(c);
    }
    let start = corpus.len();
    corpus.extend_from_slice(text);
    (corpus, subrs, start..start + text.len())
}

pub(crate) fn concat(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

/// State after candidate selection, occurrence counting and relation
/// building.
pub(crate) struct Fixture {
    pub corpus: Corpus,
    pub subrs: Vec<Subr>,
    pub trie: MatchTrie,
}

impl Fixture {
    pub fn new(fonts: &[Vec<Vec<u8>>], format: Format) -> Self {
        Self::from_corpus(corpus(fonts), format)
    }

    pub fn from_corpus(corpus: Corpus, format: Format) -> Self {
        let dawg = Dawg::build(&corpus);
        let mut subrs = select_candidates(&dawg, &corpus.data, format);
        let trie = MatchTrie::build(&corpus.data, &subrs);
        count_occurrences(
            &trie,
            &corpus.data,
            corpus.glyphs.iter().map(|g| g.span()),
            &mut subrs,
        );
        build_relations(&trie, &corpus.data, &mut subrs);
        Self {
            corpus,
            subrs,
            trie,
        }
    }

    pub fn content(&self, id: SubrId) -> &[u8] {
        &self.corpus.data[self.subrs[id as usize].span()]
    }

    /// Candidate of content `content`.
    pub fn find(&self, content: &[u8]) -> Option<SubrId> {
        (0..self.subrs.len() as SubrId).find(|&id| self.content(id) == content)
    }
}
