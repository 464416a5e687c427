//! Error interface for this crate.
//!
//! Each stage of the pipeline has its own error type:
//! - [`LexErr`]: errors from tokenizing assembly source
//! - [`AsmErr`]: errors and diagnostics from assembling
//! - [`SimErr`]: conditions reported while executing
//!
//! All of them implement this module's [`Error`] trait, which
//! exposes optional source location and help information.
//!
//! [`LexErr`]: crate::parse::lex::LexErr
//! [`AsmErr`]: crate::asm::AsmErr
//! [`SimErr`]: crate::sim::SimErr
use std::borrow::Cow;
use std::ops::Range;

pub use crate::parse::lex::LexErr;
pub use crate::asm::{AsmErr, AsmErrKind};
pub use crate::sim::SimErr;

/// Unified error interface for all errors in this crate.
pub trait Error: std::error::Error {
    /// The range in source that this error is associated with, if any.
    fn span(&self) -> Option<ErrSpan> {
        None
    }

    /// A help message to assist in resolving the error, if any.
    fn help(&self) -> Option<Cow<str>>;
}

/// The source location(s) of an error.
///
/// Most errors point at one place in source,
/// but some errors (such as a redefined label) point at several.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrSpan {
    /// One contiguous range.
    One(Range<usize>),
    /// Several ranges, ordered by position in source.
    Many(Vec<Range<usize>>),
}
impl ErrSpan {
    /// The first range of this span.
    pub fn first(&self) -> Range<usize> {
        match self {
            ErrSpan::One(r) => r.clone(),
            ErrSpan::Many(rs) => rs.first().cloned().unwrap_or(0..0),
        }
    }
}
impl From<Range<usize>> for ErrSpan {
    fn from(value: Range<usize>) -> Self {
        ErrSpan::One(value)
    }
}
impl<const N: usize> From<[Range<usize>; N]> for ErrSpan {
    fn from(value: [Range<usize>; N]) -> Self {
        Self::from(Vec::from(value))
    }
}
impl From<Vec<Range<usize>>> for ErrSpan {
    fn from(mut value: Vec<Range<usize>>) -> Self {
        match value.len() {
            1 => ErrSpan::One(value.remove(0)),
            _ => {
                value.sort_by_key(|r| r.start);
                ErrSpan::Many(value)
            }
        }
    }
}
