use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use murs::mu_parse;
use murs::{MuError, MuValue};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "mu",
    about = "Parse Mu literals and print them in canonical form",
    version
)]
struct Options {
    /// Literal to evaluate (repeatable)
    #[arg(short, long = "eval", value_name = "LITERAL")]
    eval: Vec<String>,

    /// Nesting depth to expand tables to
    #[arg(short, long, default_value_t = 8)]
    depth: usize,

    /// Print JSON instead of literals (needs the `serde` feature)
    #[arg(long)]
    json: bool,

    /// More logging (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// File with one literal per line, stdin when absent
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[cfg(feature = "serde")]
fn render_json(value: &MuValue) -> Result<String, String> {
    murs::serde::mu_to_json_string(value, true).map_err(|e| e.to_string())
}

#[cfg(not(feature = "serde"))]
fn render_json(_value: &MuValue) -> Result<String, String> {
    Err("JSON output needs the 'serde' feature".to_string())
}

fn render(literal: &str, opts: &Options) -> Result<String, String> {
    let value = mu_parse::parse(literal).map_err(|e| format!("{}: {:?}", e, literal))?;
    if opts.json {
        return render_json(&value);
    }
    value.repr(opts.depth).map_err(|e: MuError| e.to_string())
}

fn run_lines(lines: impl Iterator<Item = io::Result<String>>, opts: &Options) -> Result<(), String> {
    for (number, line) in lines.enumerate() {
        let line = line.map_err(|e| e.to_string())?;
        if line.trim().is_empty() {
            continue;
        }
        debug!(target: "murs::cli", line = number + 1, "literal");
        println!("{}", render(&line, opts).map_err(|e| format!("line {}: {}", number + 1, e))?);
    }
    Ok(())
}

fn run(opts: &Options) -> Result<(), String> {
    if !opts.eval.is_empty() {
        for literal in &opts.eval {
            println!("{}", render(literal, opts)?);
        }
        return Ok(());
    }

    match &opts.file {
        Some(path) => {
            info!(target: "murs::cli", path = %path.display(), "reading file");
            let text = fs::read_to_string(path)
                .map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
            run_lines(text.lines().map(|line| Ok(line.to_string())), opts)
        }
        None => run_lines(io::stdin().lock().lines(), opts),
    }
}

fn main() {
    let opts = Options::parse();
    init_logging(opts.verbose);

    if let Err(e) = run(&opts) {
        eprintln!("mu: {}", e);
        process::exit(1);
    }
}
