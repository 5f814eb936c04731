//! Number accepted subroutines and write every index.

use std::{cmp::Reverse, ops::Range};

use crate::{
    build::Layout,
    call::Call,
    charstring::{
        encode_int, int_len,
        operator::{CALL_GLOBAL_SUBROUTINE, CALL_LOCAL_SUBROUTINE, RETURN},
        subr_bias, write_standard,
    },
    corpus::Corpus,
    error::{Error, Result},
    group::{interleave, Dest},
    index::Index,
    subr::{Subr, SubrId},
    Format, FontOutput,
};

/// Slot of a subroutine in its index.
#[derive(Clone, Copy, Debug)]
struct Slot {
    dest: Dest,
    number: u32,
}

pub(crate) struct Emitter<'a> {
    corpus: &'a Corpus,
    subrs: &'a [Subr],
    layout: &'a Layout,
    format: Format,
    slots: Vec<Option<Slot>>,
    global_bias: i32,
    /// By tag.
    local_bias: Vec<i32>,
    global: Vec<SubrId>,
    local: Vec<Vec<SubrId>>,
}

impl<'a> Emitter<'a> {
    pub fn new(
        corpus: &'a Corpus,
        subrs: &'a [Subr],
        layout: &'a Layout,
        format: Format,
        combined: bool,
    ) -> Self {
        let mut global = vec![];
        let mut local = vec![vec![]; corpus.tags.len()];
        let mut ranked: Vec<SubrId> = layout.accepted.iter_ones().map(|id| id as SubrId).collect();
        ranked.sort_by_key(|&id| (Reverse(layout.usage[id as usize]), id));
        if combined {
            let (g, l) = interleave(&ranked);
            global = g;
            let tag = corpus.single_tag().map_or(0, usize::from);
            if let Some(pool) = local.get_mut(tag) {
                *pool = l;
            }
        } else {
            for id in ranked {
                match Dest::of(subrs[id as usize].owner, false) {
                    Dest::Global => global.push(id),
                    Dest::Local(tag) => local[tag as usize].push(id),
                }
            }
        }

        let mut slots = vec![None; subrs.len()];
        place(&mut slots, &global, Dest::Global);
        for (tag, ids) in local.iter().enumerate() {
            place(&mut slots, ids, Dest::Local(tag as u16));
        }
        Self {
            corpus,
            subrs,
            layout,
            format,
            slots,
            global_bias: subr_bias(global.len()),
            local_bias: local.iter().map(|ids| subr_bias(ids.len())).collect(),
            global,
            local,
        }
    }

    pub fn global_subrs(&self) -> Result<Index> {
        self.write_subrs(&self.global, Dest::Global)
    }

    pub fn fonts(&self) -> Result<Vec<FontOutput>> {
        let mut r = Vec::with_capacity(self.corpus.fonts.len());
        for font in &self.corpus.fonts {
            let mut charstrings = Index::new(self.format);
            for gid in font.glyphs.clone() {
                let g = &self.corpus.glyphs[gid];
                let mut out = vec![];
                self.write_span(&mut out, g.span(), &self.layout.glyph_calls[gid])?;
                charstrings.push(&out);
            }
            let mut local_subrs = Vec::with_capacity(font.fd_count);
            for fd in 0..font.fd_count {
                let tag = font.first_tag + fd as u16;
                local_subrs.push(self.write_subrs(&self.local[tag as usize], Dest::Local(tag))?);
            }
            r.push(FontOutput {
                charstrings,
                local_subrs,
            });
        }
        Ok(r)
    }

    fn write_subrs(&self, ids: &[SubrId], dest: Dest) -> Result<Index> {
        let mut by_number = vec![0; ids.len()];
        for &id in ids {
            let slot = self.slot(id)?;
            debug_assert_eq!(slot.dest, dest);
            by_number[slot.number as usize] = id;
        }
        let mut index = Index::new(self.format);
        for id in by_number {
            let s = &self.subrs[id as usize];
            let mut out = vec![];
            self.write_span(&mut out, s.span(), &self.layout.subr_calls[id as usize])?;
            if s.has_return(self.format) {
                out.push(RETURN);
            }
            index.push(&out);
        }
        Ok(index)
    }

    fn slot(&self, id: SubrId) -> Result<Slot> {
        self.slots[id as usize].ok_or_else(|| Error::Internal(format!("subr {} has no slot", id)))
    }

    /// Write `corpus[span]` in standard form, with `calls` replacing their
    /// content.
    fn write_span(&self, out: &mut Vec<u8>, span: Range<usize>, calls: &[Call]) -> Result<()> {
        let data = &self.corpus.data;
        let mut pos = span.start;
        for c in calls {
            let start = span.start + c.offset as usize;
            write_standard(out, &data[pos..start]);
            let slot = self.slot(c.subr)?;
            let (bias, op) = match slot.dest {
                Dest::Global => (self.global_bias, CALL_GLOBAL_SUBROUTINE),
                Dest::Local(tag) => (self.local_bias[tag as usize], CALL_LOCAL_SUBROUTINE),
            };
            out.extend_from_slice(&encode_int(slot.number as i32 - bias));
            out.push(op);
            pos = start + self.subrs[c.subr as usize].len as usize;
        }
        write_standard(out, &data[pos..span.end]);
        Ok(())
    }
}

/// Give the i-th most used subroutine of `ids` the i-th cheapest slot.
fn place(slots: &mut [Option<Slot>], ids: &[SubrId], dest: Dest) {
    let bias = subr_bias(ids.len());
    let mut numbers: Vec<u32> = (0..ids.len() as u32).collect();
    numbers.sort_by_key(|&k| (int_len(k as i32 - bias), k));
    for (&id, number) in ids.iter().zip(numbers) {
        slots[id as usize] = Some(Slot { dest, number });
    }
}
