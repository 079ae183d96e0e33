use std::io::Read;
use std::{fs, io, process};

use clap::{Parser, Subcommand};

use aspen::{normalize, parse_text};

#[derive(Parser)]
#[command(about = "Aspen configuration language", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Parse a source file and print the expression back
    Parse {
        /// Input source file, or `-` for stdin
        file: String,
    },
    /// Parse and normalize a source file, printing the normal form
    Norm {
        /// Input source file, or `-` for stdin
        file: String,
    },
}

fn read_source(file: &str) -> String {
    match file {
        "-" => {
            let mut buf = String::new();
            match io::stdin().read_to_string(&mut buf) {
                Ok(_) => buf,
                Err(e) => {
                    eprintln!("-: {e}");
                    process::exit(1)
                }
            }
        }
        _ => fs::read_to_string(file).unwrap_or_else(|e| {
            eprintln!("{file}: {e}");
            process::exit(1)
        }),
    }
}

fn main() {
    let (file, norm) = match Cli::parse().cmd {
        Cmd::Parse { file } => (file, false),
        Cmd::Norm { file } => (file, true),
    };
    match parse_text(&read_source(&file)) {
        Ok(e) => println!("{}", if norm { normalize(e) } else { e }),
        Err(msg) => {
            eprintln!("{file}: {msg}");
            process::exit(1);
        }
    }
}
