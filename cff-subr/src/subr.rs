use std::ops::Range;

use crate::{
    dawg::Owner,
    Format,
};

pub(crate) type SubrId = u32;

/// Estimated bytes of one INDEX offset entry.
pub(crate) const INDEX_ENTRY_SIZE: i64 = 2;

/// Maximum nesting of subroutine calls allowed by Type 2 interpreters.
pub(crate) const MAX_CALL_DEPTH: u32 = 10;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum State {
    Unmarked,
    Selected,
    Rejected,
}

/// Call of `subr` at byte `offset` of the calling subroutine's body.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct Link {
    pub subr: SubrId,
    pub offset: u32,
}

/// Candidate subroutine, a repeated substring of the corpus.
#[derive(Debug, Clone)]
pub(crate) struct Subr {
    /// Content is `corpus[offset..offset + len]`, in internal form.
    pub offset: u32,
    pub len: u32,
    /// Mask tokens in content, each loses its length byte on output.
    pub masks: u32,
    /// Occurrences in the corpus.
    pub count: u32,
    pub owner: Owner,
    /// Content ends with endchar, the body needs no return.
    pub tail: bool,
    pub state: State,
    /// Excluded from selection by an earlier futile pass.
    pub futile: bool,
    /// Subroutines calling this one.
    pub superiors: Vec<Link>,
    /// Subroutines called by this one.
    pub inferiors: Vec<Link>,

    /// Assumed encoded size of this subroutine's call index operand.
    pub index_size: u8,
    /// Occurrences left once selected superiors absorbed theirs.
    pub uses: i64,
    /// Change of body length from selected inferiors.
    pub delta: i64,
    /// Uses taken from each inferior when this subroutine got selected.
    pub collapsed: i64,
}

impl Subr {
    pub fn new(offset: u32, len: u32, masks: u32, count: u32, owner: Owner) -> Self {
        Self {
            offset,
            len,
            masks,
            count,
            owner,
            tail: false,
            state: State::Unmarked,
            futile: false,
            superiors: vec![],
            inferiors: vec![],
            index_size: 1,
            uses: count as i64,
            delta: 0,
            collapsed: 0,
        }
    }

    pub fn span(&self) -> Range<usize> {
        self.offset as usize..(self.offset + self.len) as usize
    }

    pub fn is_selected(&self) -> bool {
        self.state == State::Selected
    }

    /// Content length in standard form.
    pub fn encoded_len(&self) -> i64 {
        (self.len - self.masks) as i64
    }

    /// Body length, counting calls to selected inferiors.
    pub fn body_len(&self) -> i64 {
        self.encoded_len() + self.delta
    }

    /// Bytes of a call: index operand and call operator.
    pub fn call_size(&self) -> i64 {
        self.index_size as i64 + 1
    }

    pub fn has_return(&self, format: Format) -> bool {
        format == Format::Cff && !self.tail
    }

    /// Bytes saved by selecting this subroutine, given the current state of
    /// its relatives.
    pub fn saving(&self, format: Format) -> i64 {
        let body = self.body_len();
        self.uses.max(0) * (body - self.call_size())
            - (INDEX_ENTRY_SIZE + body + self.has_return(format) as i64)
    }

    /// Clear selection state before a new pass.
    pub fn reset(&mut self) {
        self.state = State::Unmarked;
        self.uses = self.count as i64;
        self.delta = 0;
        self.collapsed = 0;
    }
}

/// Minimum occurrence count for a substring to be a candidate, by encoded
/// length, assuming the cheapest call.
pub(crate) struct ProfitTable {
    /// `min_count[ret][len]`, `ret` is 1 if the body needs a return.
    min_count: [[u32; ProfitTable::LEN]; 2],
}

impl ProfitTable {
    const LEN: usize = 32;

    pub fn new() -> Self {
        let mut min_count = [[0; Self::LEN]; 2];
        for (ret, row) in min_count.iter_mut().enumerate() {
            for (len, v) in row.iter_mut().enumerate().skip(3) {
                *v = Self::compute(len as i64, ret as i64);
            }
        }
        Self { min_count }
    }

    /// Smallest `n >= 2` with `n * (len - 2) > INDEX_ENTRY_SIZE + len + ret`.
    fn compute(len: i64, ret: i64) -> u32 {
        let overhead = INDEX_ENTRY_SIZE + len + ret;
        let per_call = len - 2;
        (overhead / per_call + 1).max(2) as u32
    }

    /// Substrings of 2 bytes or less never pay for a call.
    pub fn worthwhile(&self, len: u32, count: u32, has_return: bool) -> bool {
        if len <= 2 {
            return false;
        }
        let min = match self.min_count[has_return as usize].get(len as usize) {
            Some(&v) => v,
            None => 2,
        };
        count >= min
    }
}
