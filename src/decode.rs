//! Decoding a solver model back into the grid.
//!
//! The solver's output contains `v`-lines of space-separated signed
//! literals. Positive literals up to the atom count name surviving
//! candidates through the inverse lookup table and are written back through
//! the assignment operator; commander auxiliaries (positive literals beyond
//! the atom count), negative literals and the terminating 0 carry no
//! assignment information.

use crate::SudokuError;
use crate::encode::Encoder;
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

impl Encoder {
    /// Reads a model file as produced by a DIMACS solver.
    pub fn read_model_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SudokuError> {
        let file = File::open(path)?;
        self.read_model(BufReader::new(file))
    }

    /// Applies every decoded assignment of the model to the grid. Only
    /// valid after the lookup table has been built.
    pub fn read_model<R: BufRead>(&mut self, reader: R) -> Result<(), SudokuError> {
        let mut applied = 0;
        for line in reader.lines() {
            let line = line?;
            let Some(rest) = line.trim_start().strip_prefix('v') else {
                continue;
            };
            for token in rest.split_whitespace() {
                let Ok(literal) = token.parse::<isize>() else {
                    break;
                };
                if literal > 0 && literal <= self.atom_count {
                    let (x, y, digit) = self.position_of(literal);
                    if self.grid.set_field(x, y, digit) {
                        applied += 1;
                    }
                }
            }
        }
        debug!("applied {applied} assignments from the model");
        Ok(())
    }

    /// Maps a compact atom id back to its candidate triple.
    fn position_of(&self, atom: isize) -> (usize, usize, usize) {
        let size = self.grid.size();
        let mut raw = (self.inverse[atom as usize] - 1) as usize;
        let digit = raw % size;
        raw /= size;
        let y = raw % size;
        raw /= size;
        (raw, y, digit)
    }
}
