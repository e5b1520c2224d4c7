//! Solves generalized Sudoku puzzles of order N by reduction to SAT.
//!
//! The pipeline first prunes candidates with human-style deduction rules,
//! then encodes whatever is left as DIMACS CNF using a commander-variable
//! at-most-one encoding over compacted atom numbers, hands the formula to a
//! SAT solver, and finally decodes the model back into a filled grid.

pub mod config;
pub mod encode;
pub mod grid;
pub mod sat;

mod amo;
mod decode;
mod rules;

pub use config::EncoderConfig;
pub use encode::Encoder;
pub use grid::Grid;

use std::io;
use thiserror::Error;

/// Everything that can go wrong between reading a puzzle and decoding a
/// model. Infeasibility is a first-class signal, not a panic.
#[derive(Debug, Error)]
pub enum SudokuError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid puzzle format: {0}")]
    InvalidFormat(String),
    #[error("no possible number for cell at position {x}, {y}")]
    Unsolvable {
        /// 1-based column of the contradicting cell.
        x: usize,
        /// 1-based row of the contradicting cell.
        y: usize,
    },
    #[error("failed to run solver `{command}`: {message}")]
    Solver { command: String, message: String },
}
