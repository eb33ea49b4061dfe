use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use clap_stdin::FileOrStdin;
use log::LevelFilter;
use simple_logger::SimpleLogger;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum Emit {
    Tokens,
    Ast,
    #[default]
    Cpp,
}

/// Compile a Python subset to C++.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Python source file, or `-` for stdin
    input: FileOrStdin,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stage to print
    #[arg(long, value_enum, default_value_t)]
    emit: Emit,

    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let source = cli
        .input
        .contents()
        .context("failed to read the input program")?;

    let tokens = py2cpp::tokenize(&source)?;
    let text: String = match cli.emit {
        Emit::Tokens => tokens
            .iter()
            .map(|t| format!("{}:{} {:?}\n", t.line, t.column, t.kind))
            .collect(),
        Emit::Ast => format!("{:#?}\n", py2cpp::parse(tokens)?),
        Emit::Cpp => py2cpp::compile(&source)?,
    };

    match cli.output {
        Some(path) => fs::write(&path, text)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{text}"),
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if let Err(err) = SimpleLogger::new().with_level(level).env().init() {
        eprintln!("{err}");
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
