//! Running a SAT solver over the emitted CNF.
//!
//! The solver is normally an external program invoked as a child process
//! with the CNF path as its argument and its standard output redirected
//! into the model file. The reserved solver name [`INTERNAL_SOLVER`] selects
//! an embedded varisat backend instead, which writes a model file of the
//! same `v`-line shape so decoding does not care where the model came from.

use crate::SudokuError;
use log::debug;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use varisat::Solver;

/// Solver name selecting the embedded varisat backend.
pub const INTERNAL_SOLVER: &str = "internal";

/// Solves the CNF at `cnf_path` and leaves the model at `model_path`.
///
/// The exit status of an external solver is not interpreted; SAT solvers
/// traditionally exit with 10 or 20. A missing or unsatisfiable result shows
/// up as a model file without `v`-lines, which decodes to nothing.
pub fn run_solver(solver: &str, cnf_path: &Path, model_path: &Path) -> Result<(), SudokuError> {
    if solver == INTERNAL_SOLVER {
        return solve_internal(cnf_path, model_path);
    }

    let model_file = File::create(model_path)?;
    let child = Command::new(solver)
        .arg(cnf_path)
        .stdin(Stdio::null())
        .stdout(model_file)
        .spawn()
        .map_err(|e| SudokuError::Solver {
            command: solver.to_string(),
            message: e.to_string(),
        })?;

    let mut child = ChildGuard(child);
    let status = child.wait().map_err(|e| SudokuError::Solver {
        command: solver.to_string(),
        message: e.to_string(),
    })?;
    debug!("solver `{solver}` exited with {status}");
    Ok(())
}

/// Kills the child if the parent leaves the scope without having waited for
/// it, so an aborted run never leaves a solver behind.
struct ChildGuard(Child);

impl ChildGuard {
    fn wait(&mut self) -> io::Result<ExitStatus> {
        self.0.wait()
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// Embedded backend: parse the CNF, solve it in-process and write a model
/// file in the usual solver output format.
fn solve_internal(cnf_path: &Path, model_path: &Path) -> Result<(), SudokuError> {
    let input = File::open(cnf_path)?;
    let mut solver = Solver::new();
    solver
        .add_dimacs_cnf(BufReader::new(input))
        .map_err(|e| SudokuError::Solver {
            command: INTERNAL_SOLVER.to_string(),
            message: e.to_string(),
        })?;

    // a solver failure decodes the same as an UNSAT result
    let satisfiable = solver.solve().unwrap_or(false);
    debug!("internal solver result: {satisfiable}");

    let mut output = BufWriter::new(File::create(model_path)?);
    if satisfiable {
        writeln!(output, "s SATISFIABLE")?;
        if let Some(model) = solver.model() {
            write!(output, "v")?;
            for literal in model {
                let var = literal.var().to_dimacs();
                write!(output, " {}", if literal.is_positive() { var } else { -var })?;
            }
            writeln!(output, " 0")?;
        }
    } else {
        writeln!(output, "s UNSATISFIABLE")?;
    }
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn internal_solver_writes_a_model() {
        let dir = tempdir().unwrap();
        let cnf = dir.path().join("formula.cnf");
        let model = dir.path().join("model.txt");
        fs::write(&cnf, "p cnf 2 2\n1 2 0\n-1 0\n").unwrap();

        run_solver(INTERNAL_SOLVER, &cnf, &model).unwrap();
        let output = fs::read_to_string(&model).unwrap();
        assert!(output.starts_with("s SATISFIABLE"));
        let v_line = output.lines().find(|l| l.starts_with('v')).unwrap();
        assert!(v_line.contains(" 2 "));
        assert!(v_line.contains(" -1 "));
    }

    #[test]
    fn internal_solver_reports_unsat_without_v_lines() {
        let dir = tempdir().unwrap();
        let cnf = dir.path().join("formula.cnf");
        let model = dir.path().join("model.txt");
        fs::write(&cnf, "p cnf 1 2\n1 0\n-1 0\n").unwrap();

        run_solver(INTERNAL_SOLVER, &cnf, &model).unwrap();
        let output = fs::read_to_string(&model).unwrap();
        assert!(output.starts_with("s UNSATISFIABLE"));
        assert!(!output.lines().any(|l| l.starts_with('v')));
    }

    #[test]
    fn missing_solver_command_is_reported() {
        let dir = tempdir().unwrap();
        let cnf = dir.path().join("formula.cnf");
        let model = dir.path().join("model.txt");
        fs::write(&cnf, "p cnf 1 1\n1 0\n").unwrap();

        let result = run_solver("surely-not-a-sat-solver", &cnf, &model);
        assert!(matches!(result, Err(SudokuError::Solver { .. })));
    }

    #[test]
    fn external_solver_output_lands_in_the_model_file() {
        let dir = tempdir().unwrap();
        let cnf = dir.path().join("formula.cnf");
        let model = dir.path().join("model.txt");
        fs::write(&cnf, "v 1 2 0\n").unwrap();

        // `cat` stands in for a solver that echoes a model
        run_solver("cat", &cnf, &model).unwrap();
        assert_eq!(fs::read_to_string(&model).unwrap(), "v 1 2 0\n");
    }
}
