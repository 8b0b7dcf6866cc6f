//! kmk-cc command line tool.

use kmkc::commands::{check_command, dump_command, eval_command, expand_command, stats_command, Options};

fn main() {
    kmkc::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = args[1].as_str();
    let run: fn(&Options) -> bool = match command {
        "expand" => expand_command,
        "eval" => eval_command,
        "dump" => dump_command,
        "stats" => stats_command,
        "check" => check_command,
        "help" | "--help" | "-h" => {
            print_usage();
            return;
        }
        "version" | "--version" | "-V" => {
            println!("kmk-cc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        _ => {
            eprintln!("error: unknown command '{command}'");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    let options = match Options::parse(&args[2..]) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(2);
        }
    };

    if !run(&options) {
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("kmk-cc - compile and evaluate kmk makefiles");
    println!();
    println!("Usage: kmk-cc <command> [options] [NAME=value]... [args]");
    println!();
    println!("Commands:");
    println!("  expand <text>...      Expand text (variables from -f makefiles)");
    println!("  eval <makefile>...    Evaluate makefiles, print variables and rules");
    println!("  dump <makefile>...    Print the compiled program of each makefile");
    println!("  stats <makefile>...   Evaluate makefiles, print compiler statistics");
    println!("  check <makefile>...   Compile makefiles in parallel, report errors");
    println!("  help                  Show this message");
    println!("  version               Show the version");
    println!();
    println!("Options:");
    println!("  -f <file>                     Read a makefile");
    println!("  --warn-undefined-variables    Warn when an undefined variable is referenced");
    println!("  --max-include-depth=<n>       Limit include nesting (default 32)");
    println!("  --no-environment              Do not import environment variables");
    println!("  --color=<auto|always|never>   Colorize diagnostics");
    println!();
    println!("Logging: RUST_LOG=kmk_cc=debug, add KMK_LOG_TREE=1 for span trees.");
}
