//! Constraint-propagation rules applied before encoding.
//!
//! [`Grid::simple_solve`] iterates the rules until a fixed point. Every rule
//! reports whether it changed anything; cheap rules run first and expensive
//! ones only when the cheap ones are exhausted. Candidates only ever
//! disappear, so a rule that empties a cell proves the puzzle infeasible.

use crate::config::EncoderConfig;
use crate::grid::Grid;
use log::debug;

impl Grid {
    /// Applies the propagation rules until none of them makes progress.
    pub fn simple_solve(&mut self, config: &EncoderConfig) {
        let mut iteration = 0;
        loop {
            iteration += 1;
            debug!("simple solve iteration {iteration}");

            let mut progress = false;
            progress |= self.naked_singles();
            progress |= self.naked_subsets();
            progress |= self.hidden_singles_columns();
            progress |= self.hidden_singles_rows();
            progress |= self.hidden_singles_blocks();

            // intersection removal is more expensive, try the cheap rules first
            if progress {
                continue;
            }
            if config.pointing_candidates {
                progress |= self.pointing_candidates();
            }
            if config.box_line_reduction {
                progress |= self.box_line_reduction();
            }

            // x-wings cost the most, only look when everything else stalled
            if progress {
                continue;
            }
            if config.x_wing {
                progress |= self.x_wing();
            }

            if !progress {
                break;
            }
        }
    }

    /// A cell with a single remaining candidate that is not yet fixed gets
    /// fixed, which propagates to its peers.
    fn naked_singles(&mut self) -> bool {
        let size = self.size();
        let mut progress = false;
        for x in 0..size {
            for y in 0..size {
                if let Some(digit) = self.number_at(x, y) {
                    if !self.is_fixed(x, y) {
                        self.set_field(x, y, digit);
                        progress = true;
                    }
                }
            }
        }
        progress
    }

    /// If k cells of a line carry the identical candidate set of size k,
    /// those digits cannot appear anywhere else in the line. Only exact
    /// duplicates along a single row or column are detected, never proper
    /// subsets and never the block direction.
    fn naked_subsets(&mut self) -> bool {
        let size = self.size();
        let mut progress = false;

        for x in 0..size {
            for y in 0..size {
                if self.is_fixed(x, y) {
                    continue;
                }
                let mask = self.cell(x, y).to_vec();
                let cardinality = mask.iter().filter(|&&possible| possible).count();

                // duplicates across the rest of the row
                let mut members = vec![x];
                for xi in x + 1..size {
                    if self.cell(xi, y) == mask.as_slice() {
                        members.push(xi);
                    }
                }
                if members.len() == cardinality {
                    for xi in 0..size {
                        if members.contains(&xi) {
                            continue;
                        }
                        for (digit, &possible) in mask.iter().enumerate() {
                            if possible {
                                progress |= self.clear_candidate(xi, y, digit);
                            }
                        }
                    }
                }

                // duplicates down the rest of the column
                let mut members = vec![y];
                for yi in y + 1..size {
                    if self.cell(x, yi) == mask.as_slice() {
                        members.push(yi);
                    }
                }
                if members.len() == cardinality {
                    for yi in 0..size {
                        if members.contains(&yi) {
                            continue;
                        }
                        for (digit, &possible) in mask.iter().enumerate() {
                            if possible {
                                progress |= self.clear_candidate(x, yi, digit);
                            }
                        }
                    }
                }
            }
        }

        progress
    }

    /// A digit with a single possible position in a column is placed there.
    fn hidden_singles_columns(&mut self) -> bool {
        let size = self.size();
        let mut progress = false;
        for x in 0..size {
            for digit in 0..size {
                let mut position = None;
                for y in 0..size {
                    if self.candidate(x, y, digit) {
                        if position.is_some() {
                            position = None;
                            break;
                        }
                        position = Some(y);
                    }
                }
                if let Some(y) = position {
                    if self.number_at(x, y) != Some(digit) {
                        self.set_field(x, y, digit);
                        progress = true;
                    }
                }
            }
        }
        progress
    }

    /// A digit with a single possible position in a row is placed there.
    fn hidden_singles_rows(&mut self) -> bool {
        let size = self.size();
        let mut progress = false;
        for y in 0..size {
            for digit in 0..size {
                let mut position = None;
                for x in 0..size {
                    if self.candidate(x, y, digit) {
                        if position.is_some() {
                            position = None;
                            break;
                        }
                        position = Some(x);
                    }
                }
                if let Some(x) = position {
                    if self.number_at(x, y) != Some(digit) {
                        self.set_field(x, y, digit);
                        progress = true;
                    }
                }
            }
        }
        progress
    }

    /// A digit with a single possible position in a block is placed there.
    fn hidden_singles_blocks(&mut self) -> bool {
        let n = self.n();
        let size = self.size();
        let mut progress = false;
        for block_x in 0..n {
            for block_y in 0..n {
                for digit in 0..size {
                    let mut position = None;
                    'scan: for x in block_x * n..(block_x + 1) * n {
                        for y in block_y * n..(block_y + 1) * n {
                            if self.candidate(x, y, digit) {
                                if position.is_some() {
                                    position = None;
                                    break 'scan;
                                }
                                position = Some((x, y));
                            }
                        }
                    }
                    if let Some((x, y)) = position {
                        if self.number_at(x, y) != Some(digit) {
                            self.set_field(x, y, digit);
                            progress = true;
                        }
                    }
                }
            }
        }
        progress
    }

    /// If all occurrences of a digit within a block line up in one column
    /// (or row), the digit cannot appear in that column (row) outside the
    /// block.
    fn pointing_candidates(&mut self) -> bool {
        let n = self.n();
        let size = self.size();
        let mut progress = false;

        for digit in 0..size {
            for block_x in 0..n {
                for block_y in 0..n {
                    let mut xs = Vec::new();
                    let mut ys = Vec::new();
                    for x in block_x * n..(block_x + 1) * n {
                        for y in block_y * n..(block_y + 1) * n {
                            if self.candidate(x, y, digit) {
                                xs.push(x);
                                ys.push(y);
                            }
                        }
                    }
                    // a single occurrence is an already-placed digit
                    if xs.len() <= 1 {
                        continue;
                    }

                    if xs.iter().all(|&x| x == xs[0]) {
                        for y in (0..size).filter(|&y| y / n != block_y) {
                            progress |= self.clear_candidate(xs[0], y, digit);
                        }
                    }
                    if ys.iter().all(|&y| y == ys[0]) {
                        for x in (0..size).filter(|&x| x / n != block_x) {
                            progress |= self.clear_candidate(x, ys[0], digit);
                        }
                    }
                }
            }
        }

        progress
    }

    /// If all occurrences of a digit within a column (or row) fall into one
    /// block, the digit cannot appear elsewhere in that block. Only applied
    /// when the line holds at least two occurrences.
    fn box_line_reduction(&mut self) -> bool {
        let n = self.n();
        let size = self.size();
        let mut progress = false;

        for digit in 0..size {
            for x in 0..size {
                let block_x = x / n;
                let mut block_y = None;
                let mut confined = true;
                let mut count = 0;
                for y in 0..size {
                    if !self.candidate(x, y, digit) {
                        continue;
                    }
                    match block_y {
                        None => block_y = Some(y / n),
                        Some(b) if b != y / n => {
                            confined = false;
                            break;
                        }
                        _ => {}
                    }
                    count += 1;
                }
                if confined && count > 1 {
                    if let Some(block_y) = block_y {
                        for xi in block_x * n..(block_x + 1) * n {
                            if xi == x {
                                continue;
                            }
                            for yi in block_y * n..(block_y + 1) * n {
                                progress |= self.clear_candidate(xi, yi, digit);
                            }
                        }
                    }
                }
            }

            for y in 0..size {
                let block_y = y / n;
                let mut block_x = None;
                let mut confined = true;
                let mut count = 0;
                for x in 0..size {
                    if !self.candidate(x, y, digit) {
                        continue;
                    }
                    match block_x {
                        None => block_x = Some(x / n),
                        Some(b) if b != x / n => {
                            confined = false;
                            break;
                        }
                        _ => {}
                    }
                    count += 1;
                }
                if confined && count > 1 {
                    if let Some(block_x) = block_x {
                        for xi in block_x * n..(block_x + 1) * n {
                            for yi in block_y * n..(block_y + 1) * n {
                                if yi == y {
                                    continue;
                                }
                                progress |= self.clear_candidate(xi, yi, digit);
                            }
                        }
                    }
                }
            }
        }

        progress
    }

    /// If a digit appears exactly twice in two columns at the same pair of
    /// rows, the digit disappears from those rows everywhere else; symmetric
    /// for rows.
    fn x_wing(&mut self) -> bool {
        let size = self.size();
        let mut progress = false;

        for digit in 0..size {
            let mut pairs: Vec<(usize, usize, usize)> = Vec::new();
            for x in 0..size {
                let Some((y1, y2)) = self.digit_pair_in_column(x, digit) else {
                    continue;
                };
                for &(p1, p2, other_x) in &pairs {
                    if p1 == y1 && p2 == y2 {
                        for xr in 0..size {
                            if xr == x || xr == other_x {
                                continue;
                            }
                            progress |= self.clear_candidate(xr, y1, digit);
                            progress |= self.clear_candidate(xr, y2, digit);
                        }
                    }
                }
                pairs.push((y1, y2, x));
            }

            let mut pairs: Vec<(usize, usize, usize)> = Vec::new();
            for y in 0..size {
                let Some((x1, x2)) = self.digit_pair_in_row(y, digit) else {
                    continue;
                };
                for &(p1, p2, other_y) in &pairs {
                    if p1 == x1 && p2 == x2 {
                        for yr in 0..size {
                            if yr == y || yr == other_y {
                                continue;
                            }
                            progress |= self.clear_candidate(x1, yr, digit);
                            progress |= self.clear_candidate(x2, yr, digit);
                        }
                    }
                }
                pairs.push((x1, x2, y));
            }
        }

        progress
    }

    /// The two row positions of a digit in a column, if there are exactly two.
    fn digit_pair_in_column(&self, x: usize, digit: usize) -> Option<(usize, usize)> {
        let mut first = None;
        let mut second = None;
        for y in 0..self.size() {
            if !self.candidate(x, y, digit) {
                continue;
            }
            match (first, second) {
                (None, _) => first = Some(y),
                (_, None) => second = Some(y),
                _ => return None,
            }
        }
        first.zip(second)
    }

    /// The two column positions of a digit in a row, if there are exactly two.
    fn digit_pair_in_row(&self, y: usize, digit: usize) -> Option<(usize, usize)> {
        let mut first = None;
        let mut second = None;
        for x in 0..self.size() {
            if !self.candidate(x, y, digit) {
                continue;
            }
            match (first, second) {
                (None, _) => first = Some(x),
                (_, None) => second = Some(x),
                _ => return None,
            }
        }
        first.zip(second)
    }
}
