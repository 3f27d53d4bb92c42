//! The `protogen` CLI: compiles a `.proto`-subset schema file into Rust
//! source implementing [`pbstream::message::StreamMessage`] for each
//! message it declares.
//!
//! Grounded on `examples/vimana-cloud-vimana/cli/main.rs`'s `clap::Parser`
//! + `Subcommand` shape; the subcommand tree itself is this crate's own.

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about = "Compiles .proto schemas into streaming codec bindings.")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a `.proto` file and render Rust bindings to stdout (or `--out`).
    Generate {
        /// Path to the `.proto`-subset source file.
        input: PathBuf,

        /// Write the rendered source here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Parse a `.proto` file and print its schema without rendering code.
    Check { input: PathBuf },
}

fn main() -> ExitCode {
    pbstream::logging::init(&pbstream::config::Config::load().unwrap_or_default().logging);
    pbstream::banner::print();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("protogen: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        Command::Generate { input, out } => {
            let file = File::open(&input)?;
            let pb = pbstream::protogen::parse(file)?;
            let rendered = pbstream::protogen::render(&pb);
            match out {
                Some(path) => std::fs::write(path, rendered)?,
                None => print!("{rendered}"),
            }
            Ok(())
        }
        Command::Check { input } => {
            let file = File::open(&input)?;
            let pb = pbstream::protogen::parse(file)?;
            println!("package {}", pb.package);
            for message in &pb.messages {
                println!("message {} ({} fields)", message.name, message.fields.len());
            }
            Ok(())
        }
    }
}
