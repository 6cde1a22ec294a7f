//! Edit-line parsing.
//!
//! [`parse`] is a pure function from one feed line to an [`EditRecord`]. Lines
//! that are not edit notifications yield [`NotAnEdit`], which callers are
//! expected to skip quietly.
//!
//! The accepted line shape is versioned by [`EDIT_LINE_GRAMMAR_VERSION`]; see
//! the [`parser`] module for the grammar.

pub mod parser;
pub mod record;

pub use {
    parser::{EDIT_LINE_GRAMMAR_VERSION, NotAnEdit, parse},
    record::{EditFlags, EditRecord},
};
