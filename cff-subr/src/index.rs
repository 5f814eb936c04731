use std::ops::Range;

use nom::{
    bytes::complete::take,
    combinator::fail,
    error::Error as NomError,
    number::complete::{be_u16, be_u24, be_u32, be_u8},
    Parser,
};

use crate::{
    charstring::ParseResult,
    error::{Error, Result},
    Format,
};

/// Byte length of offset data type.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
#[repr(u8)]
pub enum OffSize {
    One = 1u8,
    Two = 2u8,
    Three = 3u8,
    Four = 4u8,
}

impl OffSize {
    /// Return byte length of offset data type.
    pub fn len(&self) -> usize {
        *self as usize
    }

    /// Smallest offset size that can hold `max_offset`.
    pub fn for_offset(max_offset: usize) -> Self {
        match max_offset {
            0..=0xff => OffSize::One,
            0x100..=0xffff => OffSize::Two,
            0x1_0000..=0xff_ffff => OffSize::Three,
            _ => OffSize::Four,
        }
    }

    fn write(&self, out: &mut Vec<u8>, v: u32) {
        let b = v.to_be_bytes();
        out.extend_from_slice(&b[4 - self.len()..]);
    }
}

fn parse_off_size(buf: &[u8]) -> ParseResult<'_, OffSize> {
    let (buf, b0) = be_u8(buf)?;
    match b0 {
        1 => Ok((buf, OffSize::One)),
        2 => Ok((buf, OffSize::Two)),
        3 => Ok((buf, OffSize::Three)),
        4 => Ok((buf, OffSize::Four)),
        _ => fail(buf),
    }
}

fn parse_count(buf: &[u8], format: Format) -> ParseResult<'_, usize> {
    match format {
        Format::Cff => be_u16.map(|v| v as usize).parse(buf),
        Format::Cff2 => be_u32.map(|v| v as usize).parse(buf),
    }
}

fn take_bytes(buf: &[u8], n: usize) -> ParseResult<'_, &[u8]> {
    take(n)(buf)
}

/// Offsets is a sequence of n + 1 off_size bytes, where n is the number of
/// items in the index. The first offset is always 1.
#[derive(Debug, Clone, Copy)]
struct Offsets<'a>(OffSize, &'a [u8]);

impl<'a> Offsets<'a> {
    /// Return `Error::InvalidOffsetsData` if first offset is not 1.
    /// Assume data byte length is multiple of off_size.
    fn new(off_size: OffSize, data: &'a [u8]) -> Result<Self> {
        let r = Self(off_size, data);
        if r.get(0)? != 0 {
            return Err(Error::InvalidOffsetsData);
        }
        Ok(r)
    }

    /// Return data offset range of specific index.
    fn range(&self, ith: usize) -> Result<Range<usize>> {
        let (start, end) = (self.get(ith)?, self.get(ith + 1)?);
        if start > end {
            return Err(Error::InvalidOffsetsData);
        }
        Ok(start..end)
    }

    /// Return data offset of specific index. The offset is 0-based.
    /// `ith` can be length of offsets, which means the end offset of last element.
    fn get(&self, ith: usize) -> Result<usize> {
        let buf = self
            .1
            .get(ith * self.0.len()..)
            .ok_or(Error::InvalidOffsetsData)?;
        let (_, r) = Self::offset_parser(self.0).parse(buf)?;
        (r as usize).checked_sub(1).ok_or(Error::InvalidOffsetsData)
    }

    fn offset_parser<'b>(off_size: OffSize) -> impl Parser<&'b [u8], u32, NomError<&'b [u8]>> {
        move |buf: &'b [u8]| -> ParseResult<'b, u32> {
            match off_size {
                OffSize::One => be_u8.map(|v| v as u32).parse(buf),
                OffSize::Two => be_u16.map(|v| v as u32).parse(buf),
                OffSize::Three => be_u24.parse(buf),
                OffSize::Four => be_u32(buf),
            }
        }
    }
}

/// An INDEX of byte strings: subroutines or charstrings, ready to be written
/// into a CFF or CFF2 table.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Index {
    format: Format,
    data: Vec<u8>,
    /// End offset in `data` of each item.
    ends: Vec<u32>,
}

impl Index {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            data: vec![],
            ends: vec![],
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// Get item by index. Return None if `idx` is out of range.
    pub fn get(&self, idx: usize) -> Option<&[u8]> {
        let end = *self.ends.get(idx)? as usize;
        let start = match idx {
            0 => 0,
            _ => self.ends[idx - 1] as usize,
        };
        Some(&self.data[start..end])
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    pub fn push(&mut self, item: &[u8]) {
        self.data.extend_from_slice(item);
        self.ends.push(self.data.len() as u32);
    }

    fn count_size(&self) -> usize {
        match self.format {
            Format::Cff => 2,
            Format::Cff2 => 4,
        }
    }

    fn off_size(&self) -> OffSize {
        OffSize::for_offset(self.data.len() + 1)
    }

    /// Exact byte size of `encode()` result.
    pub fn size(&self) -> usize {
        if self.is_empty() {
            return self.count_size();
        }
        self.count_size() + 1 + (self.len() + 1) * self.off_size().len() + self.data.len()
    }

    /// Encode to INDEX format:
    ///
    /// ---+-----------------------+------------------------------------------
    /// 0 | count  | The number of index entries, u16 in CFF, u32 in CFF2
    /// ---+-----------------------+------------------------------------------
    /// 1 | off_size              | The size in bytes of each offset
    /// ---+-----------------------+------------------------------------------
    /// 2 | offset array          | Offset array, count + 1 elements
    /// ---+-----------------------+------------------------------------------
    /// 3 | data                  | Data
    /// ---+-----------------------+------------------------------------------
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        let n = self.len() as u32;
        match self.format {
            Format::Cff => out.extend_from_slice(&(n as u16).to_be_bytes()),
            Format::Cff2 => out.extend_from_slice(&n.to_be_bytes()),
        }
        if self.is_empty() {
            return out;
        }
        let off_size = self.off_size();
        out.push(off_size as u8);
        off_size.write(&mut out, 1);
        for &end in &self.ends {
            off_size.write(&mut out, end + 1);
        }
        out.extend_from_slice(&self.data);
        out
    }

    /// Decode an INDEX from the start of `buf`, returns the index and the
    /// remaining bytes.
    pub fn parse(buf: &[u8], format: Format) -> Result<(&[u8], Index)> {
        let (buf, n) = parse_count(buf, format)?;
        let mut r = Index::new(format);
        if n == 0 {
            return Ok((buf, r));
        }

        let (buf, off_size) = parse_off_size(buf)?;
        let offset_data_len = (n + 1) * off_size.len();
        let (buf, offset_data) = take_bytes(buf, offset_data_len)?;
        let offsets = Offsets::new(off_size, offset_data)?;
        let data_len = offsets.get(n)?;
        let (buf, data) = take_bytes(buf, data_len)?;
        for i in 0..n {
            let range = offsets.range(i)?;
            let item = data.get(range).ok_or(Error::InvalidOffsetsData)?;
            r.push(item);
        }
        Ok((buf, r))
    }
}
