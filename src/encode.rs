//! CNF encoding of a propagated puzzle.
//!
//! Raw atom numbers are `x * size^2 + y * size + digit + 1`; a lookup table
//! renumbers the candidates that survived propagation contiguously from 1 so
//! the emitted formula stays compact. Clauses stream to a temporary file
//! while they are counted; the DIMACS header can only be written once the
//! commander encoding has allocated its last auxiliary atom, so the final
//! file is assembled afterwards from the header and the temp stream.

use crate::SudokuError;
use crate::config::EncoderConfig;
use crate::grid::Grid;
use log::debug;
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Owns the candidate tensor of one puzzle for the encoding phase, together
/// with the atom lookup tables and the clause stream.
pub struct Encoder {
    pub(crate) grid: Grid,
    pub(crate) config: EncoderConfig,
    /// Commander group size resolved for this puzzle's order; 0 disables the
    /// commander encoding.
    pub(crate) group_size: usize,
    /// Raw atom number to compact atom id; 0 means "not encoded".
    pub(crate) lut: Vec<isize>,
    /// Compact atom id back to raw atom number; entry 0 is a placeholder.
    pub(crate) inverse: Vec<isize>,
    /// Number of surviving candidates A; compact ids are 1..=A.
    pub(crate) atom_count: isize,
    /// Next free atom for commander auxiliaries, starts at A+1.
    pub(crate) next_extra: isize,
    pub(crate) clause_count: usize,
    stream: Option<BufWriter<NamedTempFile>>,
}

impl Encoder {
    pub fn new(grid: Grid, config: EncoderConfig) -> Self {
        let group_size = if config.commander_encoding {
            config.group_size(grid.n())
        } else {
            0
        };
        Encoder {
            grid,
            config,
            group_size,
            lut: Vec::new(),
            inverse: Vec::new(),
            atom_count: 0,
            next_extra: 0,
            clause_count: 0,
            stream: None,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn into_grid(self) -> Grid {
        self.grid
    }

    /// Number of surviving candidates, the largest non-auxiliary atom id.
    pub fn atom_count(&self) -> isize {
        self.atom_count
    }

    pub fn clause_count(&self) -> usize {
        self.clause_count
    }

    /// The V of the DIMACS header: the last atom id handed out, commander
    /// auxiliaries included.
    pub fn variable_count(&self) -> isize {
        self.next_extra - 1
    }

    /// Commander group size in use; 0 when the puzzle order has no useful
    /// group size or the commander encoding is off.
    pub fn commander_group_size(&self) -> usize {
        self.group_size
    }

    fn raw_atom(&self, x: usize, y: usize, digit: usize) -> isize {
        let size = self.grid.size() as isize;
        x as isize * size * size + y as isize * size + digit as isize + 1
    }

    fn lut_atom(&self, x: usize, y: usize, digit: usize) -> isize {
        self.lut[self.raw_atom(x, y, digit) as usize]
    }

    /// Builds the forward and inverse lookup tables over the candidates that
    /// survived propagation, scanning `(y, x, digit)` so the numbering is
    /// reproducible. Also primes the extra-atom counter with A+1.
    pub fn build_lut(&mut self) {
        let size = self.grid.size();
        self.lut = vec![0; size * size * size + 1];
        self.inverse = vec![0];

        let mut counter = 0;
        for y in 0..size {
            for x in 0..size {
                for digit in 0..size {
                    if self.grid.candidate(x, y, digit) {
                        counter += 1;
                        let raw = self.raw_atom(x, y, digit);
                        self.lut[raw as usize] = counter;
                        self.inverse.push(raw);
                    }
                }
            }
        }

        self.atom_count = counter;
        self.next_extra = counter + 1;
        debug!("lookup table holds {counter} atoms");
    }

    /// Hands out the next auxiliary atom id.
    pub(crate) fn next_extra_atom(&mut self) -> isize {
        let atom = self.next_extra;
        self.next_extra += 1;
        atom
    }

    pub(crate) fn open_clause_stream(&mut self) -> Result<(), SudokuError> {
        self.stream = Some(BufWriter::new(NamedTempFile::new()?));
        Ok(())
    }

    /// Appends one clause line to the temp stream and counts it. The
    /// terminating 0 is added here; `literals` holds only the literals.
    pub(crate) fn write_clause(&mut self, literals: &[isize]) -> Result<(), SudokuError> {
        let writer = self
            .stream
            .as_mut()
            .ok_or_else(|| io::Error::other("clause stream is not open"))?;
        for literal in literals {
            write!(writer, "{literal} ")?;
        }
        writeln!(writer, "0")?;
        self.clause_count += 1;
        Ok(())
    }

    /// Emits all eight clause families over the surviving candidates in a
    /// fixed order: definedness before uniqueness, scopes ordered cell, row,
    /// column, block.
    pub fn generate_all_clauses(&mut self) -> Result<(), SudokuError> {
        if let Some((x, y)) = self.grid.unsolvable_cell() {
            return Err(SudokuError::Unsolvable { x: x + 1, y: y + 1 });
        }
        self.open_clause_stream()?;

        let mut total = 0;
        total += self.add_cell_definedness_clauses()?;
        total += self.add_cell_uniqueness_clauses()?;
        total += self.add_row_definedness_clauses()?;
        total += self.add_row_uniqueness_clauses()?;
        total += self.add_column_definedness_clauses()?;
        total += self.add_column_uniqueness_clauses()?;
        total += self.add_block_definedness_clauses()?;
        total += self.add_block_uniqueness_clauses()?;

        debug!("generated {total} clauses in total");
        Ok(())
    }

    /// Every cell holds at least one of its surviving digits. Fixed cells
    /// contribute their unit clause.
    fn add_cell_definedness_clauses(&mut self) -> Result<usize, SudokuError> {
        let size = self.grid.size();
        let mut generated = 0;
        for y in 0..size {
            for x in 0..size {
                let clause: Vec<isize> = (0..size)
                    .filter(|&digit| self.grid.candidate(x, y, digit))
                    .map(|digit| self.lut_atom(x, y, digit))
                    .collect();
                self.write_clause(&clause)?;
                generated += 1;
            }
        }
        debug!("generated {generated} cell definedness clauses");
        Ok(generated)
    }

    /// Every cell holds at most one digit.
    fn add_cell_uniqueness_clauses(&mut self) -> Result<usize, SudokuError> {
        let size = self.grid.size();
        let mut generated = 0;
        for y in 0..size {
            for x in 0..size {
                let literals: Vec<isize> = (0..size)
                    .filter(|&digit| self.grid.candidate(x, y, digit))
                    .map(|digit| self.lut_atom(x, y, digit))
                    .collect();
                generated += self.encode_at_most_one(&literals)?;
            }
        }
        debug!("generated {generated} cell uniqueness clauses");
        Ok(generated)
    }

    /// Every digit appears somewhere in every row. Length-1 disjunctions are
    /// skipped, the matching cell clause already forces them.
    fn add_row_definedness_clauses(&mut self) -> Result<usize, SudokuError> {
        let size = self.grid.size();
        let mut generated = 0;
        for y in 0..size {
            for digit in 0..size {
                let clause: Vec<isize> = (0..size)
                    .filter(|&x| self.grid.candidate(x, y, digit))
                    .map(|x| self.lut_atom(x, y, digit))
                    .collect();
                if clause.len() > 1 {
                    self.write_clause(&clause)?;
                    generated += 1;
                }
            }
        }
        debug!("generated {generated} row definedness clauses");
        Ok(generated)
    }

    /// Every digit appears at most once in every row.
    fn add_row_uniqueness_clauses(&mut self) -> Result<usize, SudokuError> {
        let size = self.grid.size();
        let mut generated = 0;
        for y in 0..size {
            for digit in 0..size {
                let literals: Vec<isize> = (0..size)
                    .filter(|&x| self.grid.candidate(x, y, digit))
                    .map(|x| self.lut_atom(x, y, digit))
                    .collect();
                generated += self.encode_at_most_one(&literals)?;
            }
        }
        debug!("generated {generated} row uniqueness clauses");
        Ok(generated)
    }

    /// Every digit appears somewhere in every column.
    fn add_column_definedness_clauses(&mut self) -> Result<usize, SudokuError> {
        let size = self.grid.size();
        let mut generated = 0;
        for x in 0..size {
            for digit in 0..size {
                let clause: Vec<isize> = (0..size)
                    .filter(|&y| self.grid.candidate(x, y, digit))
                    .map(|y| self.lut_atom(x, y, digit))
                    .collect();
                if clause.len() > 1 {
                    self.write_clause(&clause)?;
                    generated += 1;
                }
            }
        }
        debug!("generated {generated} column definedness clauses");
        Ok(generated)
    }

    /// Every digit appears at most once in every column.
    fn add_column_uniqueness_clauses(&mut self) -> Result<usize, SudokuError> {
        let size = self.grid.size();
        let mut generated = 0;
        for x in 0..size {
            for digit in 0..size {
                let literals: Vec<isize> = (0..size)
                    .filter(|&y| self.grid.candidate(x, y, digit))
                    .map(|y| self.lut_atom(x, y, digit))
                    .collect();
                generated += self.encode_at_most_one(&literals)?;
            }
        }
        debug!("generated {generated} column uniqueness clauses");
        Ok(generated)
    }

    /// Every digit appears somewhere in every block.
    fn add_block_definedness_clauses(&mut self) -> Result<usize, SudokuError> {
        let n = self.grid.n();
        let size = self.grid.size();
        let mut generated = 0;
        for digit in 0..size {
            for block_x in 0..n {
                for block_y in 0..n {
                    let mut clause = Vec::new();
                    for x in block_x * n..(block_x + 1) * n {
                        for y in block_y * n..(block_y + 1) * n {
                            if self.grid.candidate(x, y, digit) {
                                clause.push(self.lut_atom(x, y, digit));
                            }
                        }
                    }
                    if clause.len() > 1 {
                        self.write_clause(&clause)?;
                        generated += 1;
                    }
                }
            }
        }
        debug!("generated {generated} block definedness clauses");
        Ok(generated)
    }

    /// Every digit appears at most once in every block.
    fn add_block_uniqueness_clauses(&mut self) -> Result<usize, SudokuError> {
        let n = self.grid.n();
        let size = self.grid.size();
        let mut generated = 0;
        for digit in 0..size {
            for block_x in 0..n {
                for block_y in 0..n {
                    let mut literals = Vec::new();
                    for x in block_x * n..(block_x + 1) * n {
                        for y in block_y * n..(block_y + 1) * n {
                            if self.grid.candidate(x, y, digit) {
                                literals.push(self.lut_atom(x, y, digit));
                            }
                        }
                    }
                    generated += self.encode_at_most_one(&literals)?;
                }
            }
        }
        debug!("generated {generated} block uniqueness clauses");
        Ok(generated)
    }

    /// Saves the lookup table so a model from an earlier run can still be
    /// decoded: a size line, an atom-count line, then one `compact raw` pair
    /// per surviving candidate.
    pub fn write_lut<P: AsRef<Path>>(&self, path: P) -> Result<(), SudokuError> {
        let mut output = BufWriter::new(File::create(path)?);
        writeln!(output, "{}", self.grid.size())?;
        writeln!(output, "{}", self.atom_count)?;
        for (raw, &compact) in self.lut.iter().enumerate() {
            if compact != 0 {
                writeln!(output, "{compact} {raw}")?;
            }
        }
        output.flush()?;
        Ok(())
    }

    /// Rebuilds a decode-only encoder from a saved lookup table: an empty
    /// grid of the recorded size plus both atom tables, enough to read a
    /// model back in.
    pub fn from_lut_file<P: AsRef<Path>>(
        path: P,
        config: EncoderConfig,
    ) -> Result<Self, SudokuError> {
        let content = std::fs::read_to_string(path)?;
        let mut lines = content.lines();
        let size: usize = lines
            .next()
            .and_then(|line| line.trim().parse().ok())
            .ok_or_else(|| SudokuError::InvalidFormat("missing size in lookup table".into()))?;
        let atom_count: isize = lines
            .next()
            .and_then(|line| line.trim().parse().ok())
            .ok_or_else(|| {
                SudokuError::InvalidFormat("missing atom count in lookup table".into())
            })?;

        let n = (size as f64).sqrt() as usize;
        if !(2..=15).contains(&n) || n * n != size {
            return Err(SudokuError::InvalidFormat(format!(
                "unsupported grid size {size} in lookup table"
            )));
        }

        let mut encoder = Encoder::new(Grid::new(n), config);
        encoder.lut = vec![0; size * size * size + 1];
        encoder.inverse = vec![0; atom_count as usize + 1];
        for line in lines {
            let mut tokens = line.split_whitespace();
            let (Some(compact), Some(raw)) = (tokens.next(), tokens.next()) else {
                continue;
            };
            let compact: isize = compact
                .parse()
                .map_err(|_| SudokuError::InvalidFormat(format!("bad lookup entry `{line}`")))?;
            let raw: usize = raw
                .parse()
                .map_err(|_| SudokuError::InvalidFormat(format!("bad lookup entry `{line}`")))?;
            encoder.lut[raw] = compact;
            encoder.inverse[compact as usize] = raw as isize;
        }
        encoder.atom_count = atom_count;
        encoder.next_extra = atom_count + 1;
        Ok(encoder)
    }

    /// Writes the final CNF file: the `p cnf V C` header followed by the
    /// buffered clauses. Consumes the temp stream; its file is removed once
    /// the output is assembled.
    pub fn write_cnf<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SudokuError> {
        let Some(stream) = self.stream.take() else {
            return Err(io::Error::other("no clauses have been generated").into());
        };
        let mut temp = stream.into_inner().map_err(|e| e.into_error())?;
        temp.as_file_mut().seek(SeekFrom::Start(0))?;

        let mut output = BufWriter::new(File::create(path)?);
        writeln!(
            output,
            "p cnf {} {}",
            self.variable_count(),
            self.clause_count
        )?;
        io::copy(temp.as_file_mut(), &mut output)?;
        output.flush()?;
        Ok(())
    }
}
