//! Type 2 charstring tokens, in the internal form the charstring generator
//! hands to the subroutinizer.
//!
//! The internal form differs from a standard Type 2 charstring in two ways:
//!
//! | token | internal form | standard form |
//! |-------|---------------|---------------|
//! | hintmask/cntrmask | op, n, n mask bytes | op, n mask bytes |
//! | separator | 0, serial (u32 BE) | not present |
//!
//! Every glyph ends with a separator, so that no repeated substring found by
//! the automaton ever spans two glyphs.

use nom::{
    bytes::complete::take,
    combinator::fail,
    number::complete::{be_i16, be_i32},
    IResult,
};
use tinyvec::ArrayVec;

pub type ParseResult<'a, O> = IResult<&'a [u8], O>;

/// Charstring operator bytes the subroutinizer cares about.
pub mod operator {
    /// Reserved operator, used as glyph separator in internal form.
    pub const SEPARATOR: u8 = 0;
    pub const HORIZONTAL_STEM: u8 = 1;
    pub const VERTICAL_STEM: u8 = 3;
    pub const CALL_LOCAL_SUBROUTINE: u8 = 10;
    pub const RETURN: u8 = 11;
    pub const ESCAPE: u8 = 12;
    pub const ENDCHAR: u8 = 14;
    pub const VS_INDEX: u8 = 15;
    pub const BLEND: u8 = 16;
    pub const HORIZONTAL_STEM_HINT_MASK: u8 = 18;
    pub const HINT_MASK: u8 = 19;
    pub const COUNTER_MASK: u8 = 20;
    pub const VERTICAL_STEM_HINT_MASK: u8 = 23;
    pub const SHORT_INT: u8 = 28;
    pub const CALL_GLOBAL_SUBROUTINE: u8 = 29;
    pub const FIXED_16_16: u8 = 255;
}

use operator::*;

/// Byte length of a separator token.
pub const SEPARATOR_LEN: usize = 5;

/// Build the separator token that terminates a glyph in internal form.
pub fn separator(serial: u32) -> [u8; SEPARATOR_LEN] {
    let b = serial.to_be_bytes();
    [SEPARATOR, b[0], b[1], b[2], b[3]]
}

pub fn is_mask(b0: u8) -> bool {
    b0 == HINT_MASK || b0 == COUNTER_MASK
}

/// Length of the internal-form token starting at `buf[0]`.
///
/// Returns None if `buf` is empty or the token is truncated.
pub fn token_len(buf: &[u8]) -> Option<usize> {
    let b0 = *buf.first()?;
    let len = match b0 {
        SEPARATOR => SEPARATOR_LEN,
        ESCAPE | 247..=254 => 2,
        SHORT_INT => 3,
        HINT_MASK | COUNTER_MASK => 2 + *buf.get(1)? as usize,
        FIXED_16_16 => 5,
        _ => 1,
    };
    (len <= buf.len()).then_some(len)
}

/// Token length at `pos` of data already validated by the input checks.
pub(crate) fn token_at(buf: &[u8], pos: usize) -> usize {
    token_len(&buf[pos..]).unwrap_or(buf.len() - pos)
}

/// Iterate `(offset, len)` of the tokens in validated data.
pub(crate) fn tokens(buf: &[u8]) -> impl Iterator<Item = (usize, usize)> + '_ {
    let mut pos = 0;
    std::iter::from_fn(move || {
        if pos >= buf.len() {
            return None;
        }
        let len = token_at(buf, pos);
        let r = (pos, len);
        pos += len;
        Some(r)
    })
}

/// Append `span` converted to standard form: mask length bytes and
/// separators are dropped.
pub(crate) fn write_standard(out: &mut Vec<u8>, span: &[u8]) {
    for (pos, len) in tokens(span) {
        match span[pos] {
            SEPARATOR => {}
            b0 if is_mask(b0) => {
                out.push(b0);
                out.extend_from_slice(&span[pos + 2..pos + len]);
            }
            _ => out.extend_from_slice(&span[pos..pos + len]),
        }
    }
}

/// Byte length of `v` encoded as a Type 2 integer operand.
pub fn int_len(v: i32) -> u8 {
    match v {
        -107..=107 => 1,
        -1131..=1131 => 2,
        _ => 3,
    }
}

/// Encode `v` as a Type 2 integer operand. `v` must fit in i16.
pub fn encode_int(v: i32) -> ArrayVec<[u8; 3]> {
    let mut r = ArrayVec::new();
    match v {
        -107..=107 => r.push((v + 139) as u8),
        108..=1131 => {
            let v = v - 108;
            r.push(((v >> 8) + 247) as u8);
            r.push((v & 0xff) as u8);
        }
        -1131..=-108 => {
            let v = -v - 108;
            r.push(((v >> 8) + 251) as u8);
            r.push((v & 0xff) as u8);
        }
        _ => {
            debug_assert!(i16::try_from(v).is_ok());
            let b = (v as i16).to_be_bytes();
            r.push(SHORT_INT);
            r.push(b[0]);
            r.push(b[1]);
        }
    }
    r
}

/// Bias added to a call operand to get the subroutine number, for an index
/// of `count` subroutines.
pub fn subr_bias(count: usize) -> i32 {
    match count {
        0..=1239 => 107,
        1240..=33899 => 1131,
        _ => 32768,
    }
}

/// Encoded operand size of the call to each slot of an index of `count`
/// subroutines, cheapest first.
pub fn slot_sizes(count: usize) -> Vec<u8> {
    let bias = subr_bias(count);
    let mut sizes: Vec<u8> = (0..count as i32).map(|k| int_len(k - bias)).collect();
    sizes.sort_unstable();
    sizes
}

/// Operand of a standard-form charstring.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Number {
    Integer(i32),
    /// 16.16 fixed point, raw bits.
    Fixed(i32),
}

impl Number {
    /// Integer value, fixed values are truncated toward zero.
    pub fn int(&self) -> i32 {
        match *self {
            Number::Integer(v) => v,
            Number::Fixed(v) => v / 0x10000,
        }
    }
}

/// Parse one Type 2 operand. Fails if `buf` does not start with an operand.
pub fn parse_number(buf: &[u8]) -> ParseResult<'_, Number> {
    let (buf, b0) = take(1usize)(buf)?;
    let b0 = b0[0];
    match b0 {
        32..=246 => Ok((buf, Number::Integer(b0 as i32 - 139))),
        247..=250 => {
            let (buf, b1) = take(1usize)(buf)?;
            Ok((
                buf,
                Number::Integer((b0 as i32 - 247) * 256 + b1[0] as i32 + 108),
            ))
        }
        251..=254 => {
            let (buf, b1) = take(1usize)(buf)?;
            Ok((
                buf,
                Number::Integer(-(b0 as i32 - 251) * 256 - b1[0] as i32 - 108),
            ))
        }
        SHORT_INT => {
            let (buf, v) = be_i16(buf)?;
            Ok((buf, Number::Integer(v as i32)))
        }
        FIXED_16_16 => {
            let (buf, v) = be_i32(buf)?;
            Ok((buf, Number::Fixed(v)))
        }
        _ => fail(buf),
    }
}
