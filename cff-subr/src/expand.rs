//! Inline subroutine calls of standard-form charstrings.

use crate::{
    charstring::{operator::*, parse_number, subr_bias, Number},
    error::{Error, Result},
    index::Index,
    subr::MAX_CALL_DEPTH,
    Format,
};

/// Operand on the stack, with the output position its bytes start at.
#[derive(Debug, Clone, Copy)]
struct Operand {
    value: Number,
    pos: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No stem hint seen.
    Start,
    Stems,
    /// After the first hintmask, operands before a mask are no stems.
    Masks,
}

#[derive(Debug)]
struct State {
    out: Vec<u8>,
    stack: Vec<Operand>,
    stems: usize,
    phase: Phase,
    ended: bool,
}

/// Expands calls of a charstring against its global and local subroutine
/// indices, giving back the charstring as if it were never subroutinized.
///
/// Operator and operand bytes are copied verbatim. Hint masks are sized by
/// counting stem hints, so their stem hints must be consistent.
#[derive(Debug, Clone, Copy)]
pub struct Expander<'a> {
    format: Format,
    global: &'a Index,
    local: &'a Index,
    num_regions: usize,
}

impl<'a> Expander<'a> {
    pub fn new(format: Format, global: &'a Index, local: &'a Index) -> Self {
        Self {
            format,
            global,
            local,
            num_regions: 0,
        }
    }

    /// Region count `blend` operands are interpreted with.
    pub fn with_num_regions(self, num_regions: usize) -> Self {
        Self {
            num_regions,
            ..self
        }
    }

    pub fn expand(&self, charstring: &[u8]) -> Result<Vec<u8>> {
        let mut state = State {
            out: Vec::with_capacity(charstring.len()),
            stack: vec![],
            stems: 0,
            phase: Phase::Start,
            ended: false,
        };
        self.run(&mut state, charstring, 0)?;
        Ok(state.out)
    }

    fn subr(&self, index: &'a Index, n: Number) -> Result<&'a [u8]> {
        let n = n.int() + subr_bias(index.len());
        usize::try_from(n)
            .ok()
            .and_then(|i| index.get(i))
            .ok_or(Error::InvalidSubroutine(n))
    }

    fn run(&self, state: &mut State, mut buf: &[u8], depth: u32) -> Result<()> {
        while let Some(&b0) = buf.first() {
            if state.ended {
                break;
            }
            if let Ok((rest, value)) = parse_number(buf) {
                state.stack.push(Operand {
                    value,
                    pos: state.out.len(),
                });
                state.out.extend_from_slice(&buf[..buf.len() - rest.len()]);
                buf = rest;
                continue;
            }
            buf = &buf[1..];
            match b0 {
                CALL_LOCAL_SUBROUTINE | CALL_GLOBAL_SUBROUTINE => {
                    let arg = state.stack.pop().ok_or(Error::StackUnderflow(b0))?;
                    state.out.truncate(arg.pos);
                    if depth >= MAX_CALL_DEPTH {
                        return Err(Error::CallDepthExceeded);
                    }
                    let index = match b0 {
                        CALL_LOCAL_SUBROUTINE => self.local,
                        _ => self.global,
                    };
                    let body = self.subr(index, arg.value)?;
                    self.run(state, body, depth + 1)?;
                }
                RETURN => return Ok(()),
                ENDCHAR if self.format == Format::Cff => {
                    state.out.push(b0);
                    state.ended = true;
                }
                HORIZONTAL_STEM | VERTICAL_STEM | HORIZONTAL_STEM_HINT_MASK
                | VERTICAL_STEM_HINT_MASK => {
                    state.stems += state.stack.len() / 2;
                    state.phase = Phase::Stems;
                    state.stack.clear();
                    state.out.push(b0);
                }
                HINT_MASK | COUNTER_MASK => {
                    if state.phase != Phase::Masks {
                        state.stems += state.stack.len() / 2;
                    }
                    state.phase = Phase::Masks;
                    state.stack.clear();
                    let n = (state.stems + 7) / 8;
                    if buf.len() < n {
                        return Err(Error::ParseError(format!("truncated mask of {}", b0)));
                    }
                    state.out.push(b0);
                    state.out.extend_from_slice(&buf[..n]);
                    buf = &buf[n..];
                }
                BLEND if self.format == Format::Cff2 => {
                    let n = state.stack.last().ok_or(Error::StackUnderflow(b0))?.value.int();
                    let n = usize::try_from(n).map_err(|_| Error::StackUnderflow(b0))?;
                    let pops = n * (self.num_regions + 1) + 1;
                    let keep = state
                        .stack
                        .len()
                        .checked_sub(pops)
                        .ok_or(Error::StackUnderflow(b0))?;
                    let results: Vec<Operand> = state.stack[keep..keep + n].to_vec();
                    state.stack.truncate(keep);
                    state.stack.extend(results);
                    state.out.push(b0);
                }
                ESCAPE => {
                    let (&b1, rest) = buf
                        .split_first()
                        .ok_or_else(|| Error::ParseError("truncated escape operator".to_owned()))?;
                    buf = rest;
                    state.stack.clear();
                    state.out.extend_from_slice(&[b0, b1]);
                }
                _ => {
                    state.stack.clear();
                    state.out.push(b0);
                }
            }
        }
        Ok(())
    }
}
