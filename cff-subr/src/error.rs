use thiserror::Error as ThisError;

/// Error may returned in this crate.
#[derive(PartialEq, Eq, Debug, Clone, ThisError)]
pub enum Error {
    #[error("Invalid offsets data")]
    InvalidOffsetsData,

    #[error("font {font} glyph {glyph}: truncated token at {offset}")]
    TruncatedToken {
        font: usize,
        glyph: usize,
        offset: usize,
    },

    #[error("font {font} glyph {glyph}: missing charstring separator")]
    MissingSeparator { font: usize, glyph: usize },

    #[error("font {font} glyph {glyph}: unexpected subroutine operator {op}")]
    UnexpectedOperator { font: usize, glyph: usize, op: u8 },

    #[error("font {font}: FDSelect has {actual} entries, expect {expected}")]
    FdSelectLength {
        font: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Charstring data too large")]
    CorpusTooLarge,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid subroutine number {0}")]
    InvalidSubroutine(i32),

    #[error("Subroutine nested too deeply")]
    CallDepthExceeded,

    #[error("Operand stack underflow at operator {0}")]
    StackUnderflow(u8),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("font {font} glyph {glyph}: subroutinized charstring differs from input")]
    VerifyMismatch { font: usize, glyph: usize },
}

impl<E: std::fmt::Debug> From<nom::Err<E>> for Error {
    fn from(e: nom::Err<E>) -> Self {
        Self::ParseError(format!("{:?}", e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
