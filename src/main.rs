use std::process::ExitCode;

use clap::Parser;
use color_print::ceprintln;

/// Compiler for the X language; emits a C translation unit next to the
/// input file.
#[derive(Parser, Debug)]
#[command(name = "xc", version, about)]
struct Args {
    /// Source file to compile
    target: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match xc::compile(&args.target) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            ceprintln!("xc: <red,bold>error</>: {}", error);
            ExitCode::FAILURE
        }
    }
}
