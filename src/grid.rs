//! The candidate tensor of a generalized Sudoku puzzle.
//!
//! A puzzle of order `n` has a grid of side `size = n * n`. For every cell
//! `(x, y)` the grid tracks which digits are still possible; fixing a cell
//! through [`Grid::set_field`] removes the digit from all peers in the same
//! row, column and block. All solver rules and the model decoder go through
//! `set_field`, so the consequences of an assignment always propagate.

use crate::SudokuError;
use log::debug;
use std::fmt;
use std::fs;
use std::path::Path;

/// Candidate tensor plus per-cell fixed flags. `x` is the column index and
/// `y` the row index, both 0-based; digits are 0-based internally and
/// 1-based in all text formats.
#[derive(Debug, Clone)]
pub struct Grid {
    n: usize,
    size: usize,
    /// `size * size * size` booleans, indexed `(x * size + y) * size + digit`.
    candidates: Vec<bool>,
    /// `size * size` booleans, indexed `x * size + y`.
    fixed: Vec<bool>,
    /// First cell observed with an empty candidate set; set at most once.
    blame: Option<(usize, usize)>,
}

impl Grid {
    /// An empty puzzle of order `n`: every digit possible in every cell.
    pub fn new(n: usize) -> Self {
        let size = n * n;
        Grid {
            n,
            size,
            candidates: vec![true; size * size * size],
            fixed: vec![false; size * size],
            blame: None,
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn idx(&self, x: usize, y: usize, digit: usize) -> usize {
        (x * self.size + y) * self.size + digit
    }

    pub fn is_fixed(&self, x: usize, y: usize) -> bool {
        self.fixed[x * self.size + y]
    }

    pub(crate) fn candidate(&self, x: usize, y: usize, digit: usize) -> bool {
        self.candidates[self.idx(x, y, digit)]
    }

    /// Candidate set of one cell as a slice of `size` booleans.
    pub(crate) fn cell(&self, x: usize, y: usize) -> &[bool] {
        let start = (x * self.size + y) * self.size;
        &self.candidates[start..start + self.size]
    }

    /// Removes a candidate and reports whether it was still present.
    pub(crate) fn clear_candidate(&mut self, x: usize, y: usize, digit: usize) -> bool {
        let k = self.idx(x, y, digit);
        let was_possible = self.candidates[k];
        self.candidates[k] = false;
        was_possible
    }

    /// Fixes cell `(x, y)` to `digit` and applies the consequences: the cell
    /// keeps only `digit`, and `digit` disappears from every peer in the same
    /// row, column and block. Returns `false` without touching anything if
    /// the cell is already fixed or a parameter is out of range.
    pub fn set_field(&mut self, x: usize, y: usize, digit: usize) -> bool {
        let size = self.size;
        if x >= size || y >= size || digit >= size {
            return false;
        }
        if self.fixed[x * size + y] {
            return false;
        }
        self.fixed[x * size + y] = true;

        let idx = |x: usize, y: usize, d: usize| (x * size + y) * size + d;

        for i in 0..size {
            self.candidates[idx(x, y, i)] = i == digit;
            if i != x {
                self.candidates[idx(i, y, digit)] = false;
            }
            if i != y {
                self.candidates[idx(x, i, digit)] = false;
            }
        }

        let block_x = x / self.n * self.n;
        let block_y = y / self.n * self.n;
        for xi in block_x..block_x + self.n {
            for yi in block_y..block_y + self.n {
                // cells sharing the row or column were cleared above
                if xi != x && yi != y {
                    self.candidates[idx(xi, yi, digit)] = false;
                }
            }
        }

        true
    }

    /// The digit decided for `(x, y)`, or `None` while two or more
    /// candidates remain. A cell with an empty candidate set is a
    /// contradiction: the first one seen is recorded as the blame cell and
    /// the puzzle becomes unsolvable.
    pub fn number_at(&mut self, x: usize, y: usize) -> Option<usize> {
        if x >= self.size || y >= self.size {
            return None;
        }
        let mut found = None;
        for digit in 0..self.size {
            if self.candidates[self.idx(x, y, digit)] {
                if found.is_some() {
                    return None;
                }
                found = Some(digit);
            }
        }
        if found.is_none() && self.blame.is_none() {
            debug!("cell ({x}, {y}) has no possible digit left");
            self.blame = Some((x, y));
        }
        found
    }

    /// Read-only variant of [`Grid::number_at`] that never records blame;
    /// used for rendering.
    pub fn decided_digit(&self, x: usize, y: usize) -> Option<usize> {
        let mut found = None;
        for digit in 0..self.size {
            if self.candidates[self.idx(x, y, digit)] {
                if found.is_some() {
                    return None;
                }
                found = Some(digit);
            }
        }
        found
    }

    /// Number of decided cells. Scanning every cell doubles as the
    /// infeasibility check: an emptied cell flips the puzzle to unsolvable.
    pub fn solved_cells(&mut self) -> usize {
        let mut count = 0;
        for y in 0..self.size {
            for x in 0..self.size {
                if self.number_at(x, y).is_some() {
                    count += 1;
                }
            }
        }
        count
    }

    pub fn is_solvable(&self) -> bool {
        self.blame.is_none()
    }

    /// The first cell observed with an empty candidate set, 0-based.
    pub fn unsolvable_cell(&self) -> Option<(usize, usize)> {
        self.blame
    }

    /// Parse a puzzle from text.
    ///
    /// Three header layouts are understood:
    /// - a line starting with `experiment:` opens a four-line header whose
    ///   last line carries a `<size>x<size>` token;
    /// - a line starting with `+` is already the first ruler line of a
    ///   9x9 grid;
    /// - anything else is the two-line header of the external reader, which
    ///   only produces 9x9 puzzles.
    ///
    /// Grid rows are whitespace-separated 1-based numbers with `|` column
    /// separators and optional `+---` ruler lines in between; an empty cell
    /// is an underscore string as wide as the widest digit.
    pub fn from_text(text: &str) -> Result<Self, SudokuError> {
        let mut lines = text.lines();
        let first = lines
            .next()
            .ok_or_else(|| SudokuError::InvalidFormat("empty puzzle file".into()))?;

        let size = if first.starts_with("experiment:") {
            lines.next();
            lines.next();
            let size_line = lines
                .next()
                .ok_or_else(|| SudokuError::InvalidFormat("truncated puzzle header".into()))?;
            parse_size(size_line)?
        } else if first.starts_with('+') {
            // no header, the grid starts right away
            9
        } else {
            // reader format, two header lines and always a 9x9 grid
            lines.next();
            9
        };

        let n = (size as f64).sqrt() as usize;
        if !(2..=15).contains(&n) || n * n != size {
            return Err(SudokuError::InvalidFormat(format!(
                "unsupported grid size {size}"
            )));
        }

        let mut grid = Grid::new(n);
        let empty_field = "_".repeat(digit_width(size));

        for y in 0..size {
            let mut row = lines
                .next()
                .ok_or_else(|| SudokuError::InvalidFormat(format!("missing grid row {}", y + 1)))?;
            if row.contains('+') {
                row = lines.next().ok_or_else(|| {
                    SudokuError::InvalidFormat(format!("missing grid row {}", y + 1))
                })?;
            }
            let mut tokens = row.split_whitespace().filter(|token| *token != "|");
            for x in 0..size {
                let token = tokens.next().ok_or_else(|| {
                    SudokuError::InvalidFormat(format!("grid row {} is too short", y + 1))
                })?;
                if token == empty_field {
                    continue;
                }
                let value: usize = token.parse().map_err(|_| {
                    SudokuError::InvalidFormat(format!("invalid cell token `{token}`"))
                })?;
                // a 0 means "no number here" in the reader format
                if value != 0 {
                    grid.set_field(x, y, value - 1);
                }
            }
        }

        Ok(grid)
    }

    /// Read a puzzle from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SudokuError> {
        let content = fs::read_to_string(path)?;
        Self::from_text(&content)
    }

    /// Write the rendered grid to a file.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), SudokuError> {
        fs::write(path, format!("{self}\n"))?;
        Ok(())
    }
}

/// Width of the widest digit of the grid, which is also the width of the
/// underscore placeholder for empty cells.
pub(crate) fn digit_width(size: usize) -> usize {
    let mut width = 0;
    let mut i = 1;
    while i <= size {
        width += 1;
        i *= 10;
    }
    width
}

/// First integer before the `x` of the `<size>x<size>` token.
fn parse_size(line: &str) -> Result<usize, SudokuError> {
    let head = line.split('x').next().unwrap_or("");
    head.split_whitespace()
        .find_map(|token| token.parse().ok())
        .ok_or_else(|| SudokuError::InvalidFormat(format!("no grid size in header line `{line}`")))
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = digit_width(self.size);

        let mut ruler = String::new();
        for _ in 0..self.n {
            ruler.push('+');
            for _ in 0..(width + 1) * self.n + 1 {
                ruler.push('-');
            }
        }
        ruler.push('+');

        for y in 0..self.size {
            if y % self.n == 0 {
                writeln!(f, "{ruler}")?;
            }
            for x in 0..self.size {
                if x % self.n == 0 {
                    write!(f, "| ")?;
                }
                match self.decided_digit(x, y) {
                    Some(digit) => write!(f, "{:>width$} ", digit + 1)?,
                    None => write!(f, "{} ", "_".repeat(width))?,
                }
            }
            writeln!(f, "|")?;
        }
        write!(f, "{ruler}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_field_clears_all_peers() {
        let mut grid = Grid::new(3);
        assert!(grid.set_field(0, 0, 4));

        assert!(grid.is_fixed(0, 0));
        for digit in 0..9 {
            assert_eq!(grid.candidate(0, 0, digit), digit == 4);
        }
        // row, column and block peers lose digit 4
        for i in 1..9 {
            assert!(!grid.candidate(i, 0, 4));
            assert!(!grid.candidate(0, i, 4));
        }
        assert!(!grid.candidate(1, 1, 4));
        assert!(!grid.candidate(2, 2, 4));
        // an unrelated cell keeps it
        assert!(grid.candidate(3, 3, 4));
    }

    #[test]
    fn set_field_refuses_fixed_cells_and_bad_arguments() {
        let mut grid = Grid::new(3);
        assert!(grid.set_field(2, 3, 7));
        assert!(!grid.set_field(2, 3, 5));
        assert!(!grid.set_field(9, 0, 0));
        assert!(!grid.set_field(0, 9, 0));
        assert!(!grid.set_field(0, 0, 9));
    }

    #[test]
    fn duplicate_givens_flip_solvability() {
        let mut grid = Grid::new(3);
        grid.set_field(0, 0, 4);
        // the second 5 in the block empties the first cell
        grid.set_field(2, 2, 4);
        assert!(grid.is_solvable());

        let solved = grid.solved_cells();
        assert!(!grid.is_solvable());
        assert_eq!(grid.unsolvable_cell(), Some((0, 0)));
        // the second given still counts as decided
        assert!(solved >= 1);
    }

    #[test]
    fn number_at_is_none_while_undecided() {
        let mut grid = Grid::new(3);
        assert_eq!(grid.number_at(4, 4), None);
        grid.set_field(4, 4, 8);
        assert_eq!(grid.number_at(4, 4), Some(8));
        assert!(grid.is_solvable());
    }

    #[test]
    fn parses_experiment_format() {
        let text = "experiment: extable9-1\n\
                    author: test\n\
                    comment: none\n\
                    size: 9x9\n\
                    _ _ 3 _ 2 _ 6 _ _\n\
                    9 _ _ 3 _ 5 _ _ 1\n\
                    _ _ 1 8 _ 6 4 _ _\n\
                    _ _ 8 1 _ 2 9 _ _\n\
                    7 _ _ _ _ _ _ _ 8\n\
                    _ _ 6 7 _ 8 2 _ _\n\
                    _ _ 2 6 _ 9 5 _ _\n\
                    8 _ _ 2 _ 3 _ _ 9\n\
                    _ _ 5 _ 1 _ 3 _ _\n";
        let mut grid = Grid::from_text(text).unwrap();
        assert_eq!(grid.size(), 9);
        assert_eq!(grid.decided_digit(2, 0), Some(2));
        assert_eq!(grid.decided_digit(0, 1), Some(8));
        assert_eq!(grid.decided_digit(8, 4), Some(7));
        // 32 givens; eliminations may already decide further cells
        assert!(grid.solved_cells() >= 32);
        assert!(grid.is_solvable());
    }

    #[test]
    fn parses_grid_with_rulers_and_separators() {
        let text = "experiment: ruled\n\
                    .\n\
                    .\n\
                    size: 4x4\n\
                    +-----+-----+\n\
                    | 1 _ | _ _ |\n\
                    | _ _ | _ 3 |\n\
                    +-----+-----+\n\
                    | _ 4 | _ _ |\n\
                    | _ _ | 2 _ |\n\
                    +-----+-----+\n";
        let grid = Grid::from_text(text).unwrap();
        assert_eq!(grid.n(), 2);
        assert_eq!(grid.decided_digit(0, 0), Some(0));
        assert_eq!(grid.decided_digit(3, 1), Some(2));
        assert_eq!(grid.decided_digit(1, 2), Some(3));
        assert_eq!(grid.decided_digit(2, 3), Some(1));
    }

    #[test]
    fn reader_format_is_always_nine_by_nine() {
        let mut text = String::from("sudoku nr. 17\nscanned\n");
        for _ in 0..9 {
            text.push_str("_ _ _ _ _ _ _ _ _\n");
        }
        let grid = Grid::from_text(&text).unwrap();
        assert_eq!(grid.size(), 9);
    }

    #[test]
    fn leading_ruler_means_bare_grid() {
        let mut text = String::from("+-------+-------+-------+\n");
        for y in 0..9 {
            if y > 0 && y % 3 == 0 {
                text.push_str("+-------+-------+-------+\n");
            }
            if y == 0 {
                text.push_str("| 1 _ _ | _ _ _ | _ _ _ |\n");
            } else {
                text.push_str("| _ _ _ | _ _ _ | _ _ _ |\n");
            }
        }
        let grid = Grid::from_text(&text).unwrap();
        assert_eq!(grid.size(), 9);
        assert_eq!(grid.decided_digit(0, 0), Some(0));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Grid::from_text("").is_err());
        assert!(Grid::from_text("experiment: x\na\nb\nsize: 10x10\n").is_err());
        let text = "experiment: x\na\nb\nsize: 4x4\n1 2 3\n";
        assert!(matches!(
            Grid::from_text(text),
            Err(SudokuError::InvalidFormat(_))
        ));
    }

    #[test]
    fn wide_grids_use_wide_placeholders() {
        assert_eq!(digit_width(9), 1);
        assert_eq!(digit_width(16), 2);
        assert_eq!(digit_width(225), 3);

        let mut text = String::from("experiment: wide\n.\n.\nsize: 16x16\n");
        for _ in 0..16 {
            text.push_str(&"__ ".repeat(16));
            text.push('\n');
        }
        let grid = Grid::from_text(&text).unwrap();
        assert_eq!(grid.n(), 4);
    }

    #[test]
    fn renders_like_the_input_format() {
        let mut grid = Grid::new(2);
        grid.set_field(0, 0, 0);
        grid.set_field(2, 1, 3);
        let rendered = format!("{grid}");
        let expected = "\
+-----+-----+
| 1 _ | _ _ |
| _ _ | 4 _ |
+-----+-----+
| _ _ | _ _ |
| _ _ | _ _ |
+-----+-----+";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn write_to_renders_the_same_text() {
        let mut grid = Grid::new(2);
        grid.set_field(1, 1, 2);
        let file = tempfile::NamedTempFile::new().unwrap();
        grid.write_to(file.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(file.path()).unwrap(),
            format!("{grid}\n")
        );
    }

    #[test]
    fn rendered_grid_parses_back() {
        let mut grid = Grid::new(3);
        grid.set_field(0, 0, 0);
        grid.set_field(4, 4, 4);
        grid.set_field(8, 8, 8);
        let mut reparsed = Grid::from_text(&format!("{grid}\n")).unwrap();
        assert_eq!(reparsed.size(), 9);
        assert_eq!(reparsed.decided_digit(0, 0), Some(0));
        assert_eq!(reparsed.decided_digit(4, 4), Some(4));
        assert_eq!(reparsed.decided_digit(8, 8), Some(8));
        assert_eq!(reparsed.solved_cells(), 3);
    }
}
