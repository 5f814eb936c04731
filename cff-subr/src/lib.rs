//! Subroutinize CFF and CFF2 charstrings.
//!
//! The entry type is `Subroutinizer`: give it the charstrings of one or more
//! fonts sharing a container, in internal form (see `charstring`), and
//! `Subroutinizer::run()` returns the rewritten charstrings together with the
//! global and local subroutine indices.
//!
//! Stages of a run:
//!
//! 1. `Corpus::build()` validates input and concatenates every glyph,
//! 2. a suffix automaton finds all repeated token sequences,
//! 3. profitable ones become candidate subroutines,
//! 4. an Aho-Corasick trie over the candidates finds their occurrences,
//!    which gives exact counts and the caller/callee relation graph,
//! 5. the group selector picks subroutines,
//! 6. call lists are rebuilt against the picked ones, single-use
//!    subroutines are inlined back,
//! 7. subroutines are numbered and all indices written.

pub mod charstring;
mod error;
mod index;

mod build;
mod call;
mod candidate;
mod corpus;
mod dawg;
mod edge;
mod emit;
mod expand;
mod group;
mod relation;
mod subr;
mod trie;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;

use educe::Educe;
use log::{debug, info};

use build::Layout;
use charstring::write_standard;
use corpus::Corpus;
use dawg::Dawg;
use emit::Emitter;
use group::Selection;
use trie::MatchTrie;

pub use corpus::FontInput;
pub use error::{Error, Result};
pub use expand::Expander;
pub use index::{Index, OffSize};

/// Subroutine count limit of an index when `Config::max_subrs` is 0, and the
/// upper bound of any limit: subroutine numbers are 16-bit operands.
pub const DEFAULT_MAX_SUBRS: u32 = 65535;

/// Cap of the extra selection passes excluding futile subroutines.
const MAX_FUTILE_PASSES: usize = 4;

/// Container format the charstrings are written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Educe)]
#[educe(Default)]
pub enum Format {
    /// 2-byte INDEX count, subroutines end with `return`, `endchar` may end
    /// a subroutine.
    #[educe(Default)]
    Cff,
    /// 4-byte INDEX count, no `return` and no `endchar`.
    Cff2,
}

#[derive(Debug, Clone, Educe)]
#[educe(Default)]
pub struct Config {
    /// Maximum subroutines per index, 0 for `DEFAULT_MAX_SUBRS`, larger
    /// values are clamped to it. A single
    /// font with a single FD may use twice as many, split between its local
    /// and the global index.
    pub max_subrs: u32,
    /// Re-run selection without subroutines that end up called at most once.
    #[educe(Default = true)]
    pub eliminate_futile: bool,
    pub format: Format,
    /// Expand every output glyph and compare it with its input.
    pub verify: bool,
    /// Variation regions, to interpret `blend` when verifying CFF2 output.
    pub num_regions: u16,
}

impl Config {
    fn max_subrs(&self) -> usize {
        match self.max_subrs {
            0 => DEFAULT_MAX_SUBRS as usize,
            n => n.min(DEFAULT_MAX_SUBRS) as usize,
        }
    }
}

/// Statistics of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    /// Candidate subroutines offered to selection.
    pub candidates: usize,
    /// Subroutines written.
    pub selected: usize,
    /// Subroutines deselected to keep call nesting within limits.
    pub depth_reductions: usize,
    /// Subroutines dropped to fit the index size limit.
    pub truncated: usize,
    pub futile_passes: usize,
    pub futile_removed: usize,
    /// Accepted subroutines inlined back or dropped as used at most once.
    pub inlined: usize,
    /// Input charstrings size minus output charstrings and subroutines size.
    pub saved_bytes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontOutput {
    pub charstrings: Index,
    /// One index per FD, one for a non CID-keyed font.
    pub local_subrs: Vec<Index>,
}

impl FontOutput {
    pub fn charstrings_size(&self) -> usize {
        self.charstrings.size()
    }

    /// Size of the local subroutine index of `fd`, 0 if there is none.
    pub fn local_subrs_size(&self, fd: usize) -> usize {
        self.local_subrs.get(fd).map_or(0, Index::size)
    }
}

#[derive(Debug, Clone)]
pub struct Output {
    /// In input order.
    pub fonts: Vec<FontOutput>,
    pub global_subrs: Index,
    pub report: Report,
}

impl Output {
    pub fn global_subrs_size(&self) -> usize {
        self.global_subrs.size()
    }

    /// Size of all charstring and subroutine indices.
    pub fn total_size(&self) -> usize {
        self.global_subrs_size()
            + self
                .fonts
                .iter()
                .map(|f| {
                    f.charstrings_size() + f.local_subrs.iter().map(Index::size).sum::<usize>()
                })
                .sum::<usize>()
    }
}

pub struct Subroutinizer {
    config: Config,
}

impl Subroutinizer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run(&self, fonts: &[FontInput]) -> Result<Output> {
        let format = self.config.format;
        let corpus = Corpus::build(fonts)?;
        // A single font with a single FD calls local and global subroutines
        // alike.
        let combined = corpus.single_tag().is_some();

        let dawg = Dawg::build(&corpus);
        let mut subrs = candidate::select_candidates(&dawg, &corpus.data, format);
        drop(dawg);

        let trie = MatchTrie::build(&corpus.data, &subrs);
        call::count_occurrences(
            &trie,
            &corpus.data,
            corpus.glyphs.iter().map(|g| g.span()),
            &mut subrs,
        );
        relation::build_relations(&trie, &corpus.data, &mut subrs);

        let mut report = Report {
            candidates: subrs.len(),
            ..Default::default()
        };
        let max_subrs = self.config.max_subrs();
        let mut layout = loop {
            let stats = Selection::new(&mut subrs, format, combined, max_subrs).run()?;
            report.depth_reductions = stats.depth_reductions;
            report.truncated = stats.truncated;
            let layout = Layout::build(&trie, &corpus, &subrs, combined)?;
            debug!(
                "{} subrs selected, {} accepted",
                stats.selected,
                layout.accepted.count_ones()
            );
            if !self.config.eliminate_futile || report.futile_passes == MAX_FUTILE_PASSES {
                break layout;
            }
            let futile = layout.futile();
            if futile.is_empty() {
                break layout;
            }
            debug!("futile pass {}: {} subrs", report.futile_passes, futile.len());
            for &id in &futile {
                subrs[id as usize].futile = true;
            }
            report.futile_passes += 1;
            report.futile_removed += futile.len();
        };
        report.inlined = layout.remove_single_use(&subrs)?;
        report.selected = layout.accepted.count_ones();
        debug!("max call depth: {}", layout.max_depth());

        let emitter = Emitter::new(&corpus, &subrs, &layout, format, combined);
        let mut output = Output {
            global_subrs: emitter.global_subrs()?,
            fonts: emitter.fonts()?,
            report,
        };

        let inputs: Vec<Index> = (0..corpus.fonts.len())
            .map(|f| standard_charstrings(&corpus, f, format))
            .collect();
        let input_size: usize = inputs.iter().map(Index::size).sum();
        output.report.saved_bytes = input_size as i64 - output.total_size() as i64;
        if self.config.verify {
            self.verify(&corpus, &inputs, &output)?;
        }
        info!(
            "subroutinized {} glyphs: {} of {} candidate subrs, {} bytes saved",
            corpus.glyphs.len(),
            output.report.selected,
            output.report.candidates,
            output.report.saved_bytes
        );
        Ok(output)
    }

    /// Read back the encoded indices and expand every glyph.
    fn verify(&self, corpus: &Corpus, inputs: &[Index], output: &Output) -> Result<()> {
        let format = self.config.format;
        let (_, global) = Index::parse(&output.global_subrs.encode(), format)?;
        for (f, (font, expected)) in output.fonts.iter().zip(inputs).enumerate() {
            let (_, charstrings) = Index::parse(&font.charstrings.encode(), format)?;
            let mut locals = Vec::with_capacity(font.local_subrs.len());
            for index in &font.local_subrs {
                locals.push(Index::parse(&index.encode(), format)?.1);
            }
            let glyphs = &corpus.glyphs[corpus.fonts[f].glyphs.clone()];
            for (i, (g, cs)) in glyphs.iter().zip(charstrings.iter()).enumerate() {
                let fd = corpus.tags[g.tag as usize].1;
                let local = locals.get(fd).ok_or_else(|| {
                    Error::Internal(format!("font {} has no local subrs for FD {}", f, fd))
                })?;
                let expanded = Expander::new(format, &global, local)
                    .with_num_regions(self.config.num_regions as usize)
                    .expand(cs)?;
                if Some(expanded.as_slice()) != expected.get(i) {
                    return Err(Error::VerifyMismatch { font: f, glyph: i });
                }
            }
        }
        debug!("verified {} glyphs", corpus.glyphs.len());
        Ok(())
    }
}

/// Glyphs of `font` in standard form, without any call.
fn standard_charstrings(corpus: &Corpus, font: usize, format: Format) -> Index {
    let mut r = Index::new(format);
    for g in &corpus.glyphs[corpus.fonts[font].glyphs.clone()] {
        let mut out = vec![];
        write_standard(&mut out, &corpus.data[g.span()]);
        r.push(&out);
    }
    r
}
