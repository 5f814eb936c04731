//! Font set input, and the charstring corpus every later stage refers to.

use std::ops::Range;

use log::debug;

use crate::{
    charstring::{
        operator::{CALL_GLOBAL_SUBROUTINE, CALL_LOCAL_SUBROUTINE, RETURN, SEPARATOR},
        separator, token_len,
    },
    error::{Error, Result},
};

/// One font of the set, as produced by the charstring generator.
///
/// `data` holds the internal-form charstrings of all glyphs back to back,
/// glyph `i` is `data[offsets[i]..offsets[i + 1]]` and ends with a separator.
#[derive(Debug, Clone, Copy)]
pub struct FontInput<'a> {
    data: &'a [u8],
    offsets: &'a [u32],
    /// FD index of each glyph, for CID-keyed fonts.
    fd_select: Option<&'a [u8]>,
}

impl<'a> FontInput<'a> {
    pub fn new(data: &'a [u8], offsets: &'a [u32]) -> Self {
        Self {
            data,
            offsets,
            fd_select: None,
        }
    }

    /// CID-keyed font, `fd_select[i]` is the FD index of glyph `i`.
    pub fn cid(data: &'a [u8], offsets: &'a [u32], fd_select: &'a [u8]) -> Self {
        Self {
            data,
            offsets,
            fd_select: Some(fd_select),
        }
    }

    pub fn is_cid(&self) -> bool {
        self.fd_select.is_some()
    }

    pub fn glyph_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Number of FDs, the local subroutine indices produced for this font.
    pub fn fd_count(&self) -> usize {
        self.fd_select
            .and_then(|fds| fds.iter().max())
            .map_or(1, |&max| max as usize + 1)
    }

    fn fd(&self, glyph: usize) -> usize {
        self.fd_select.map_or(0, |fds| fds[glyph] as usize)
    }
}

/// A glyph charstring in the corpus, `start..end` excludes its separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Glyph {
    pub start: u32,
    pub end: u32,
    pub tag: u16,
}

impl Glyph {
    pub fn span(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FontSpan {
    /// Range of `Corpus::glyphs`.
    pub glyphs: Range<usize>,
    /// Tag of FD 0, FD `i` is tagged `first_tag + i`.
    pub first_tag: u16,
    pub fd_count: usize,
}

/// Concatenation of every font's charstrings, with separator serials
/// re-stamped so they are unique over the whole set.
#[derive(Debug)]
pub(crate) struct Corpus {
    pub data: Vec<u8>,
    pub glyphs: Vec<Glyph>,
    pub fonts: Vec<FontSpan>,
    /// `(font, fd)` of each tag.
    pub tags: Vec<(usize, usize)>,
}

impl Corpus {
    pub fn build(fonts: &[FontInput]) -> Result<Self> {
        let mut r = Self {
            data: vec![],
            glyphs: vec![],
            fonts: vec![],
            tags: vec![],
        };
        let mut serial = 0u32;
        for (font_idx, font) in fonts.iter().enumerate() {
            if let Some(fds) = font.fd_select {
                if fds.len() != font.glyph_count() {
                    return Err(Error::FdSelectLength {
                        font: font_idx,
                        expected: font.glyph_count(),
                        actual: fds.len(),
                    });
                }
            }
            let first_tag = u16::try_from(r.tags.len()).map_err(|_| Error::CorpusTooLarge)?;
            let fd_count = font.fd_count();
            r.tags.extend((0..fd_count).map(|fd| (font_idx, fd)));
            if r.tags.len() > u16::MAX as usize {
                return Err(Error::CorpusTooLarge);
            }

            let first_glyph = r.glyphs.len();
            for glyph_idx in 0..font.glyph_count() {
                let range = glyph_range(font, font_idx, glyph_idx)?;
                let cs = &font.data[range];
                let sep = check_glyph(cs, font_idx, glyph_idx)?;
                let start = r.data.len();
                r.data.extend_from_slice(&cs[..sep]);
                r.data.extend_from_slice(&separator(serial));
                serial = serial.wrapping_add(1);
                if r.data.len() > u32::MAX as usize {
                    return Err(Error::CorpusTooLarge);
                }
                r.glyphs.push(Glyph {
                    start: start as u32,
                    end: (start + sep) as u32,
                    tag: first_tag + font.fd(glyph_idx) as u16,
                });
            }
            r.fonts.push(FontSpan {
                glyphs: first_glyph..r.glyphs.len(),
                first_tag,
                fd_count,
            });
        }
        debug!(
            "corpus: {} fonts, {} glyphs, {} bytes, {} tags",
            r.fonts.len(),
            r.glyphs.len(),
            r.data.len(),
            r.tags.len()
        );
        Ok(r)
    }

    /// Tag of the only FD with glyphs, if a single font with a single FD
    /// holds every glyph. Fonts without glyphs do not count.
    pub fn single_tag(&self) -> Option<u16> {
        let mut used = self.fonts.iter().filter(|f| !f.glyphs.is_empty());
        match (used.next(), used.next()) {
            (Some(f), None) if f.fd_count == 1 => Some(f.first_tag),
            _ => None,
        }
    }
}

fn glyph_range(font: &FontInput, font_idx: usize, glyph_idx: usize) -> Result<Range<usize>> {
    let start = font.offsets[glyph_idx] as usize;
    let end = font.offsets[glyph_idx + 1] as usize;
    if start > end || end > font.data.len() {
        log::error!(
            "font {} glyph {}: bad offsets {}..{}",
            font_idx,
            glyph_idx,
            start,
            end
        );
        return Err(Error::InvalidOffsetsData);
    }
    Ok(start..end)
}

/// Tokenize one glyph, returns the offset of its trailing separator.
fn check_glyph(cs: &[u8], font: usize, glyph: usize) -> Result<usize> {
    let mut pos = 0;
    while pos < cs.len() {
        let len = token_len(&cs[pos..]).ok_or(Error::TruncatedToken {
            font,
            glyph,
            offset: pos,
        })?;
        match cs[pos] {
            SEPARATOR if pos + len == cs.len() => return Ok(pos),
            op @ (SEPARATOR | CALL_LOCAL_SUBROUTINE | CALL_GLOBAL_SUBROUTINE | RETURN) => {
                return Err(Error::UnexpectedOperator { font, glyph, op })
            }
            _ => {}
        }
        pos += len;
    }
    Err(Error::MissingSeparator { font, glyph })
}
