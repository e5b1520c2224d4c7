use anyhow::Result;
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use sudokusat::{Encoder, EncoderConfig, Grid, sat};

/// Grids beyond this side length are unreadable on a console.
const MAX_PRINT_SIZE: usize = 36;

const CNF_FILENAME: &str = "clauses_out.cnf";
const MODEL_FILENAME: &str = "model.txt";

#[derive(Parser)]
#[command(author, version, about = "Generalized Sudoku solver by reduction to SAT")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Report progress while solving
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Omit printing the solved grid
    #[arg(short = 'd', long = "no-grid", global = true)]
    omit_grid: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a puzzle, run a SAT solver on it and print the solved grid
    Solve {
        /// Path to the puzzle file
        path: PathBuf,
        /// SAT solver command, or `internal` for the built-in backend
        solver: String,
    },
    /// Solve every puzzle in a folder and record timings as CSV
    Benchmark {
        /// Folder holding `extable{size}-{count}.txt` puzzles
        folder: PathBuf,
        /// SAT solver command, or `internal` for the built-in backend
        solver: String,
        /// CSV output path
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Solve { path, solver } => {
            solve_sudoku(path, solver, None, cli.verbose, cli.omit_grid)?;
        }
        Commands::Benchmark {
            folder,
            solver,
            output,
        } => {
            benchmark_sudokus(folder, solver, output)?;
        }
    }

    println!("Execution took {} seconds", seconds(start.elapsed()));
    Ok(())
}

/// The full pipeline for one puzzle: parse, propagate, encode, solve,
/// decode, report. An infeasible puzzle is reported and skipped, it is not
/// an error of the run.
fn solve_sudoku(
    path: &Path,
    solver: &str,
    benchmark_csv: Option<&Path>,
    verbose: bool,
    omit_grid: bool,
) -> Result<()> {
    let start = Instant::now();
    let config = EncoderConfig::default();

    if verbose {
        println!("Solving Sudoku at \"{}\"", path.display());
    }

    let mut grid = Grid::from_file(path)?;
    let size = grid.size();

    if verbose {
        println!("Sudoku of type {size}x{size}.");
        if config.commander_encoding && config.group_size(grid.n()) > 0 {
            println!(
                "Using commander encoding with max group size {}.",
                config.group_size(grid.n())
            );
        }
        print_grid(&grid);
    }

    let known_before = grid.solved_cells();
    if report_unsolvable(&grid) {
        return Ok(());
    }

    if verbose {
        println!("{known_before} of {} cells are filled.", size * size);
    }

    if config.simple_solve {
        grid.simple_solve(&config);
    }

    let known_after = grid.solved_cells();
    if report_unsolvable(&grid) {
        return Ok(());
    }

    if verbose {
        println!(
            "Simple Solve found {} new numbers.",
            known_after - known_before
        );
        println!("Now {known_after} of {} cells are filled.", size * size);
        print_grid(&grid);
    }

    let mut encoder = Encoder::new(grid, config);
    encoder.build_lut();
    encoder.generate_all_clauses()?;
    encoder.write_cnf(CNF_FILENAME)?;

    if verbose {
        println!("Using solver {solver}...");
    }

    let solver_start = Instant::now();
    sat::run_solver(solver, Path::new(CNF_FILENAME), Path::new(MODEL_FILENAME))?;
    let solver_time = solver_start.elapsed();

    if verbose {
        println!("Reading solution...");
    }
    encoder.read_model_file(MODEL_FILENAME)?;

    if !omit_grid {
        println!("{}", encoder.grid());
    }

    let total = start.elapsed();
    println!(
        "Encoding took {} seconds",
        seconds(total.saturating_sub(solver_time))
    );

    if let Some(csv) = benchmark_csv {
        let mut file = OpenOptions::new().append(true).create(true).open(csv)?;
        writeln!(
            file,
            "{},{},{},{},{},{}",
            path.display(),
            size,
            encoder.commander_group_size(),
            encoder.variable_count(),
            encoder.clause_count(),
            seconds(total)
        )?;
    }

    Ok(())
}

/// Walks `extable{size}-{count}.txt` files for every order from 3 to 15,
/// advancing to the next order at the first missing count, and appends one
/// CSV row per solved puzzle.
fn benchmark_sudokus(folder: &Path, solver: &str, output: &Path) -> Result<()> {
    println!(
        "Benchmarking at {} with solver {}...",
        folder.display(),
        solver
    );
    std::fs::write(output, "Sudoku,Size,CE-Size,No. Atoms,No. Clauses,Seconds\n")?;

    for n in 3..=15 {
        let size = n * n;
        for count in 1.. {
            let path = folder.join(format!("extable{size}-{count}.txt"));
            if !path.exists() {
                break;
            }
            println!("Solving Sudoku at {}", path.display());
            solve_sudoku(&path, solver, Some(output), false, true)?;
        }
    }

    Ok(())
}

fn report_unsolvable(grid: &Grid) -> bool {
    let Some((x, y)) = grid.unsolvable_cell() else {
        return false;
    };
    eprintln!("This Sudoku is unsolvable!");
    eprintln!(
        "There's no possible number for cell at position {}, {}.",
        x + 1,
        y + 1
    );
    eprintln!("Exiting...");
    true
}

fn print_grid(grid: &Grid) {
    if grid.size() <= MAX_PRINT_SIZE {
        println!("{grid}");
    } else {
        println!("Sudoku too big to print...");
    }
}

fn seconds(duration: Duration) -> f64 {
    duration.as_millis() as f64 / 1000.0
}
