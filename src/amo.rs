//! At-most-one encodings over positive literals.
//!
//! The naive encoding spends a clause on every pair of literals. The
//! commander encodings trade most of those pairs for auxiliary atoms: each
//! group of literals gets a commander with one-directional links
//! `(c OR NOT lit)`, and the at-most-one constraint recurses over the
//! commanders. The links alone would not force a commander false when its
//! group is empty, so the scheme is sound for at-most-one only because the
//! surrounding definedness clauses supply the at-least-one side; adding the
//! reverse links would change the formula's meaning.

use crate::SudokuError;
use crate::encode::Encoder;
use itertools::Itertools;

impl Encoder {
    /// Emits clauses forcing at most one of `literals` to be true and
    /// returns how many clauses that took.
    pub fn encode_at_most_one(&mut self, literals: &[isize]) -> Result<usize, SudokuError> {
        if !self.config.encode_extra_commanders && literals.len() <= 1 {
            return Ok(0);
        }
        // group sizes below 2 (orders outside the table) cannot terminate
        // the recursion, so they mean naive encoding
        if self.config.commander_encoding && self.group_size >= 2 {
            if self.config.commander_binary {
                let (clauses, _commander) = self.commander_encode_binary(literals)?;
                Ok(clauses)
            } else {
                self.commander_encode(literals)
            }
        } else {
            self.naive_at_most_one(literals)
        }
    }

    /// One binary clause per unordered pair of literals.
    pub(crate) fn naive_at_most_one(&mut self, literals: &[isize]) -> Result<usize, SudokuError> {
        let mut generated = 0;
        for (a, b) in literals.iter().copied().tuple_combinations::<(_, _)>() {
            self.write_clause(&[-a, -b])?;
            generated += 1;
        }
        Ok(generated)
    }

    /// The k-ary commander encoding: consecutive chunks of the group size
    /// get a pairwise encoding plus a commander linked to every chunk
    /// literal, then the commanders are encoded recursively.
    fn commander_encode(&mut self, literals: &[isize]) -> Result<usize, SudokuError> {
        if literals.len() <= 1 {
            return Ok(0);
        }

        let mut generated = 0;
        let mut commanders = Vec::new();
        for chunk in literals.chunks(self.group_size) {
            generated += self.naive_at_most_one(chunk)?;

            let commander = self.next_extra_atom();
            for &literal in chunk {
                self.write_clause(&[commander, -literal])?;
                generated += 1;
            }
            commanders.push(commander);
        }

        generated += self.commander_encode(&commanders)?;
        Ok(generated)
    }

    /// The binary-tree commander variant: the literal list is halved until a
    /// group fits the group size, each level contributing one commander, the
    /// links to its two children and the pairwise clause over them.
    fn commander_encode_binary(
        &mut self,
        literals: &[isize],
    ) -> Result<(usize, isize), SudokuError> {
        let commander = self.next_extra_atom();
        let mut generated = 0;

        if literals.len() <= self.group_size {
            for &literal in literals {
                self.write_clause(&[commander, -literal])?;
                generated += 1;
            }
            generated += self.naive_at_most_one(literals)?;
            return Ok((generated, commander));
        }

        let (left, right) = literals.split_at(literals.len() / 2);
        let (clauses, left_commander) = self.commander_encode_binary(left)?;
        generated += clauses;
        let (clauses, right_commander) = self.commander_encode_binary(right)?;
        generated += clauses;

        generated += self.naive_at_most_one(&[left_commander, right_commander])?;
        self.write_clause(&[commander, -left_commander])?;
        self.write_clause(&[commander, -right_commander])?;
        generated += 2;

        Ok((generated, commander))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::EncoderConfig;
    use crate::encode::Encoder;
    use crate::grid::Grid;
    use std::fs;
    use tempfile::NamedTempFile;
    use varisat::{ExtendFormula, Lit, Solver};

    /// Runs one at-most-one encoding in isolation and parses the clauses
    /// back out of the written file.
    fn amo_clauses(config: EncoderConfig, literals: &[isize]) -> (Encoder, Vec<Vec<isize>>) {
        let mut encoder = Encoder::new(Grid::new(3), config);
        encoder.build_lut();
        encoder.open_clause_stream().unwrap();
        encoder.encode_at_most_one(literals).unwrap();

        let out = NamedTempFile::new().unwrap();
        encoder.write_cnf(out.path()).unwrap();
        let text = fs::read_to_string(out.path()).unwrap();
        let clauses = text
            .lines()
            .skip(1)
            .map(|line| {
                line.split_whitespace()
                    .map(|token| token.parse().unwrap())
                    .take_while(|&literal| literal != 0)
                    .collect()
            })
            .collect();
        (encoder, clauses)
    }

    /// True when the clauses plus the given unit assumptions are satisfiable.
    fn satisfiable_with(clauses: &[Vec<isize>], assumptions: &[isize]) -> bool {
        let mut solver = Solver::new();
        for clause in clauses {
            let lits: Vec<Lit> = clause.iter().map(|&l| Lit::from_dimacs(l)).collect();
            solver.add_clause(&lits);
        }
        for &assumption in assumptions {
            solver.add_clause(&[Lit::from_dimacs(assumption)]);
        }
        solver.solve().unwrap_or(false)
    }

    fn naive_config() -> EncoderConfig {
        EncoderConfig {
            commander_encoding: false,
            ..EncoderConfig::default()
        }
    }

    #[test]
    fn naive_encoding_emits_all_pairs() {
        let literals = [1, 2, 3, 4, 5];
        let (encoder, clauses) = amo_clauses(naive_config(), &literals);
        assert_eq!(clauses.len(), 10);
        assert_eq!(clauses[0], vec![-1, -2]);
        assert_eq!(clauses[9], vec![-4, -5]);
        // no auxiliaries
        assert_eq!(encoder.variable_count(), encoder.atom_count());
    }

    #[test]
    fn singleton_and_empty_groups_cost_nothing() {
        let (encoder, clauses) = amo_clauses(EncoderConfig::default(), &[7]);
        assert!(clauses.is_empty());
        assert_eq!(encoder.clause_count(), 0);

        let (_, clauses) = amo_clauses(EncoderConfig::default(), &[]);
        assert!(clauses.is_empty());
    }

    #[test]
    fn commander_encoding_rejects_any_two_true_literals() {
        let literals: Vec<isize> = (1..=9).collect();
        let (_, clauses) = amo_clauses(EncoderConfig::default(), &literals);

        for a in 1..=9isize {
            assert!(satisfiable_with(&clauses, &[a]), "single literal {a}");
            for b in a + 1..=9 {
                assert!(!satisfiable_with(&clauses, &[a, b]), "pair {a}, {b}");
            }
        }
    }

    #[test]
    fn binary_commander_encoding_is_also_sound() {
        let config = EncoderConfig {
            commander_binary: true,
            ..EncoderConfig::default()
        };
        let literals: Vec<isize> = (1..=9).collect();
        let (_, clauses) = amo_clauses(config, &literals);

        for a in 1..=9isize {
            assert!(satisfiable_with(&clauses, &[a]), "single literal {a}");
            for b in a + 1..=9 {
                assert!(!satisfiable_with(&clauses, &[a, b]), "pair {a}, {b}");
            }
        }
    }

    #[test]
    fn kary_commander_clause_and_atom_counts() {
        // 9 literals, groups of 3: three chunks of 3 pairwise + 3 links,
        // then the same again over the three commanders
        let literals: Vec<isize> = (1..=9).collect();
        let (encoder, clauses) = amo_clauses(EncoderConfig::default(), &literals);
        assert_eq!(clauses.len(), 24);
        assert_eq!(encoder.variable_count(), encoder.atom_count() + 4);
    }

    #[test]
    fn commander_allocation_interleaves_with_chunk_clauses() {
        let literals: Vec<isize> = (1..=6).collect();
        let (encoder, clauses) = amo_clauses(EncoderConfig::default(), &literals);
        let a = encoder.atom_count();

        // first chunk: pairs over 1..3, then links to the first commander
        assert_eq!(clauses[0], vec![-1, -2]);
        assert_eq!(clauses[3], vec![a + 1, -1]);
        // second chunk follows with the second commander
        assert_eq!(clauses[6], vec![-4, -5]);
        assert_eq!(clauses[9], vec![a + 2, -4]);
        // the two commanders get their own pairwise clause, a commander of
        // their own and the links to it
        assert_eq!(clauses[12], vec![-(a + 1), -(a + 2)]);
        assert_eq!(clauses[13], vec![a + 3, -(a + 1)]);
        assert_eq!(clauses[14], vec![a + 3, -(a + 2)]);
        assert_eq!(clauses.len(), 15);
        assert_eq!(encoder.variable_count(), a + 3);
    }
}
