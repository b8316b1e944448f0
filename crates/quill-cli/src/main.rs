//! Quill command-line interface.
//!
//! `quill <script>` runs a file; `quill` with no arguments starts a REPL.
//! Exit codes follow sysexits: 64 for usage errors, 65 for static
//! (lex/parse/resolve) errors, 70 for runtime errors.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use quill_eval::{CoordinateTable, Interpreter, Resolver};
use quill_parser::Parser;
use quill_types::ast::Program;
use quill_types::{Diagnostics, SourceFile};

const EXIT_USAGE: u8 = 64;
const EXIT_STATIC_ERROR: u8 = 65;
const EXIT_RUNTIME_ERROR: u8 = 70;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    match args.len() {
        1 => repl(),
        2 => run_file(&args[1]),
        _ => {
            eprintln!("usage: quill [script]");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

// ── File Mode ─────────────────────────────────────────────────────────────────

fn run_file(path: &str) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("quill: cannot read '{path}': {err}");
            return ExitCode::from(EXIT_USAGE);
        }
    };
    let source_file = SourceFile::new(path, &source);

    let (program, table) = match front_end(&source_file, 0) {
        Ok((program, table, _)) => (program, table),
        Err(errors) => {
            report_diagnostics(&errors);
            return ExitCode::from(EXIT_STATIC_ERROR);
        }
    };

    let mut interp = Interpreter::new(Box::new(io::stdout()));
    interp.extend_locals(table);
    if let Err(err) = interp.run(&program) {
        eprintln!("{}", err.to_diagnostic(&source_file));
        return ExitCode::from(EXIT_RUNTIME_ERROR);
    }
    ExitCode::SUCCESS
}

// ── REPL ──────────────────────────────────────────────────────────────────────

/// Read-eval-print loop. One evaluator lives for the whole session, so
/// globals persist; the reference-id sequence is threaded through every
/// parse so coordinates never collide.
fn repl() -> ExitCode {
    let stdin = io::stdin();
    let mut interp = Interpreter::new(Box::new(io::stdout()));
    let mut next_ref = 0;
    let mut line_no = 0usize;

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if line.trim().is_empty() {
            continue;
        }
        line_no += 1;

        let name = format!("repl:{line_no}");
        let source_file = SourceFile::new(&name, &line);
        match front_end(&source_file, next_ref) {
            Ok((program, table, next)) => {
                next_ref = next;
                interp.extend_locals(table);
                if let Err(err) = interp.run(&program) {
                    eprintln!("{}", err.to_diagnostic(&source_file));
                }
            }
            Err(errors) => report_diagnostics(&errors),
        }
    }
    ExitCode::SUCCESS
}

// ── Front End ─────────────────────────────────────────────────────────────────

/// Lex, parse, and resolve. Returns the program, its coordinate table, and
/// the next unissued reference id, or every static diagnostic found.
fn front_end(
    source_file: &SourceFile,
    next_ref: u32,
) -> Result<(Program, CoordinateTable, u32), Diagnostics> {
    let lexed = quill_lexer::Lexer::new(source_file).lex();
    let mut errors = lexed.errors;

    let parsed = Parser::with_ref_start(lexed.tokens, source_file, next_ref).parse();
    errors.extend(parsed.errors);
    if errors.has_errors() {
        return Err(errors);
    }

    let resolution = Resolver::new(source_file).resolve(&parsed.program);
    if resolution.errors.has_errors() {
        return Err(resolution.errors);
    }
    Ok((parsed.program, resolution.table, parsed.next_ref))
}

fn report_diagnostics(errors: &Diagnostics) {
    for diagnostic in &errors.errors {
        eprintln!("{diagnostic}");
        if !diagnostic.source_line.is_empty() {
            eprintln!("    {}", diagnostic.source_line);
        }
    }
    let shown = errors.errors.len();
    if errors.total_errors > shown {
        eprintln!("... and {} more error(s)", errors.total_errors - shown);
    }
}
