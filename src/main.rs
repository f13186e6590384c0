use std::io::{self, BufRead, IsTerminal, Read, Write};

use vau::error::VauResult;
use vau::eval::Machine;
use vau::reader;
use vau::value::Value;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut load_files: Vec<String> = Vec::new();
    let mut with_prelude = true;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--load" => {
                if i + 1 < args.len() {
                    load_files.push(args[i + 1].clone());
                    i += 2;
                } else {
                    eprintln!("--load requires a file path");
                    std::process::exit(1);
                }
            }
            "--no-prelude" => {
                with_prelude = false;
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: vau [OPTIONS]");
                println!();
                println!("Options:");
                println!("  --load <file>    Evaluate a source file before starting the REPL");
                println!("  --no-prelude     Start from the bare primitives, without the prelude");
                println!("  --help, -h       Show this help message");
                println!();
                println!("Environment variables:");
                println!("  RUST_LOG=vau=trace    Enable evaluation tracing");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                eprintln!("Try 'vau --help' for usage information.");
                std::process::exit(1);
            }
        }
    }

    let mut machine = if with_prelude {
        match Machine::bootstrap() {
            Ok(machine) => machine,
            Err(e) => {
                eprintln!("Failed to load prelude: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Machine::new()
    };

    for path in &load_files {
        load_file(&mut machine, path);
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        if load_files.is_empty() {
            println!("vau interpreter");
        } else {
            println!("vau interpreter (loaded: {})", load_files.join(", "));
        }
        println!(
            "  Heap: {} cells, Symbols: {} interned, Environments: {} frames",
            machine.heap.total_cells(),
            machine.symbols.count(),
            machine.envs.frame_count()
        );
        println!("Ready.\n");
        run_interactive(&mut machine);
    } else {
        run_piped(&mut machine);
    }
}

/// Evaluate a source file, stopping at the first failure.
fn load_file(machine: &mut Machine, path: &str) {
    let input = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading {}: {}", path, e);
            std::process::exit(1);
        }
    };

    let mut pos = 0;
    let mut count = 0;
    loop {
        match read_next(machine, &input, pos) {
            Ok(Some((expr, new_pos))) => {
                pos = new_pos;
                count += 1;
                let root = machine.root;
                if let Err(e) = machine.eval(expr, root) {
                    eprintln!("Error at expression {} of {}: {}", count, path, e);
                    std::process::exit(1);
                }
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("Read error in {} at position {}: {}", path, pos, e);
                std::process::exit(1);
            }
        }
    }
}

/// Interactive REPL: accumulate lines until parens are balanced.
fn run_interactive(machine: &mut Machine) {
    let stdin = io::stdin();
    let mut buf = String::new();
    let mut depth: i32 = 0;

    loop {
        if depth == 0 {
            print!("> ");
        } else {
            print!("  ");
        }
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("Read error: {}", e);
                break;
            }
        }

        // Track paren depth (naive but sufficient for well-formed input).
        for ch in line.chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
        }

        buf.push_str(&line);

        if depth <= 0 {
            depth = 0;
            let input = buf.trim().to_string();
            buf.clear();

            if input.is_empty() {
                continue;
            }

            eval_and_print(&input, machine);
        }
    }
}

/// Piped mode: read all input, then evaluate one expression at a time,
/// printing each result.
fn run_piped(machine: &mut Machine) {
    let mut input = String::new();
    if io::stdin().read_to_string(&mut input).is_err() {
        eprintln!("Failed to read input");
        std::process::exit(1);
    }

    let input = input.trim().to_string();
    if input.is_empty() {
        return;
    }

    eval_and_print(&input, machine);
}

/// Evaluate every expression in a string, printing results and errors.
fn eval_and_print(input: &str, machine: &mut Machine) {
    let mut pos = 0;
    loop {
        match read_next(machine, input, pos) {
            Ok(Some((expr, new_pos))) => {
                pos = new_pos;
                let root = machine.root;
                match machine.eval(expr, root) {
                    Ok(val) => println!("{}", machine.show(val)),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("{}", e);
                break;
            }
        }
    }
}

fn read_next(
    machine: &mut Machine,
    input: &str,
    pos: usize,
) -> VauResult<Option<(Value, usize)>> {
    reader::read_one_at(
        input,
        pos,
        &mut machine.heap,
        &mut machine.symbols,
        &mut machine.strings,
    )
}
