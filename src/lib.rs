use std::fs::read_to_string;
use std::io;
use std::path::Path;

use thiserror::Error;

pub mod eval;
pub mod syntax;


pub use eval::{
    is_normalized, is_normalized_with, judgmentally_equal, normalize, normalize_with, Hook,
};
pub use syntax::surf::parse_text;
pub use syntax::{Expr, Loc};

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error")]
    IO(#[from] io::Error),
    #[error("{0}")]
    Parsing(#[from] Box<pest::error::Error<syntax::surf::Rule>>),
    #[error("duplicate label at {0}")]
    DuplicateLabel(Loc),
    #[error("union literal with a second active alternative at {0}")]
    ExtraUnionActive(Loc),
    #[error("optional literal with more than one element at {0}")]
    ExtraOptionalElement(Loc),
}

/// Parse a source file into an expression.
pub fn load(path: &Path) -> Result<Expr, Error> {
    parse_text(read_to_string(path)?.as_str())
}

/// Grow the stack before the recursive passes descend into pathologically
/// nested input.
pub(crate) fn maybe_grow<T>(f: impl FnOnce() -> T) -> T {
    stacker::maybe_grow(512 * 1024, 4 * 1024 * 1024, f)
}
