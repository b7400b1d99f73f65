use std::{
    error::Error,
    fs,
    io,
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use regasm::Assembler;
use tracing::Level;

#[derive(Parser)]
#[command(version, about = "Assembler for the 32-register VM", long_about = None)]
struct Args {
    /// Assembly source file
    input: PathBuf,

    /// Output binary (length-prefixed code)
    output: PathBuf,

    /// Also write a human-readable listing to this file
    #[arg(short, long)]
    listing: Option<PathBuf>,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(long, default_value_t = Level::WARN)]
    log_level: Level,
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = main_real(args) {
        tracing::error!("{e}");
        eprintln!("Error: {e}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn main_real(args: Args) -> Result<(), Box<dyn Error>> {
    let source = fs::read_to_string(&args.input)
        .map_err(|e| format!("cant read {}: {e}", args.input.display()))?;

    let mut assembler = Assembler::new();
    let (code, lines) = assembler.assemble_full(&source)?;
    tracing::debug!(
        bytes = code.len(),
        labels = assembler.symbols().len(),
        "assembled {}",
        args.input.display()
    );

    // Nothing touches the output path until encoding succeeded.
    let mut artifact = Vec::with_capacity(code.len() + 4);
    Assembler::write_bin(&code, &mut artifact)?;
    fs::write(&args.output, &artifact)
        .map_err(|e| format!("cant write {}: {e}", args.output.display()))?;

    if let Some(path) = &args.listing {
        tracing::trace!("writing listing to {}", path.display());
        assembler.save_listing(&lines, path)?;
    }

    println!(
        "Assembled {} bytes of code to {}",
        code.len(),
        args.output.display()
    );
    Ok(())
}
