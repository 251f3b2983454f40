// obschema2mysql: rewrites OceanBase mydumper schema dumps into stock
// MySQL compatible SQL. Convert mode rewrites the schema files in a
// dump dir and keeps the originals in a backup dir; recovery mode moves
// them back.

mod error;
mod lifecycle;
mod logger;
mod progress;
mod rewrite;

use clap::{CommandFactory, Parser};
use lifecycle::SchemaKind;
use rewrite::rowsize::DEFAULT_MAX_ROW_SIZE;
use rewrite::SchemaRewriter;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

// Exit codes, one per operator-visible failure class.
const EC_HELP: i32 = 1;
const EC_ARGS: i32 = 2;
const EC_FLAGS: i32 = 3;
const EC_WORKDIR: i32 = 4;
const EC_RUN: i32 = 5;

// Command-line flags and positional arguments.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Convert schema files in place, backing up the originals.
    #[arg(short = 'c', long)]
    convert: bool,

    /// Move the backed up schema files back into the work dir.
    #[arg(short = 'r', long)]
    recover: bool,

    /// Enable debug logging (disables progress bars).
    #[arg(long)]
    debug: bool,

    /// Max estimated row size in bytes for a converted table.
    #[arg(long, default_value_t = DEFAULT_MAX_ROW_SIZE)]
    max_row_size: u64,

    /// Dump dir holding the *-schema.sql and *-schema-create.sql files.
    work_dir: PathBuf,

    /// Write a JSON run report to file.
    #[arg(long)]
    report_json: Option<PathBuf>,
}

fn main() {
    let wall_start = Instant::now();
    if std::env::args().len() == 1 {
        let _ = Args::command().print_help();
        eprintln!();
        process::exit(EC_HELP);
    }
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = match e.kind() {
                clap::error::ErrorKind::DisplayHelp => EC_HELP,
                clap::error::ErrorKind::DisplayVersion => 0,
                _ => EC_ARGS,
            };
            let _ = e.print();
            process::exit(code);
        }
    };

    // Initialize logging based on --debug.
    logger::set_debug(args.debug);

    // The two modes share flags, so the conflict check is done here to
    // keep its own exit code.
    if args.convert == args.recover {
        logger::error("exactly one of -c/--convert or -r/--recover is required");
        process::exit(EC_FLAGS);
    }
    if !args.work_dir.is_dir() {
        logger::error(&format!(
            "work dir is not a directory: {}",
            args.work_dir.display()
        ));
        process::exit(EC_WORKDIR);
    }

    logger::debug("main: Starting schema conversion run");
    logger::debug(&format!("main: Work dir: {}", args.work_dir.display()));
    logger::debug(&format!("main: Max row size: {}", args.max_row_size));

    // Progress bars are disabled in debug mode to avoid mangled output.
    let progress = progress::ProgressManager::new(!args.debug);

    let result = if args.convert {
        let rewriter = SchemaRewriter::new(args.max_row_size);
        lifecycle::run_convert(&args.work_dir, &rewriter, &progress)
    } else {
        lifecycle::run_recover(&args.work_dir, &progress)
    };

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            logger::error(&e.to_string());
            process::exit(EC_RUN);
        }
    };

    if let Some(path) = args.report_json.as_ref() {
        let json = match serde_json::to_string_pretty(&report) {
            Ok(json) => json,
            Err(e) => {
                logger::error(&format!("couldn't serialize run report: {}", e));
                process::exit(EC_RUN);
            }
        };
        if let Err(e) = std::fs::write(path, json) {
            logger::error(&format!(
                "couldn't write run report to {}: {}",
                path.display(),
                e
            ));
            process::exit(EC_RUN);
        }
    }

    // Print summary in the same style as the rest of our dump tooling.
    let tables = report
        .files
        .iter()
        .filter(|f| f.kind == SchemaKind::Table)
        .count();
    let databases = report.files.len() - tables;
    let sep = "=".repeat(60);
    eprintln!("\n{}\nSUMMARY\n{}", sep, sep);
    eprintln!("Mode:      {}", report.mode);
    eprintln!("Tables:    {}", tables);
    eprintln!("Databases: {}", databases);
    if report.mode == "convert" {
        eprintln!(
            "Backups:   {}",
            args.work_dir.join(lifecycle::BACKUP_DIR_NAME).display()
        );
    }
    eprintln!("Duration:  {:?}", wall_start.elapsed());
    eprintln!("{}", sep);

    logger::info(&format!(
        "{} complete: {} file(s) in {}",
        report.mode,
        report.files.len(),
        report.work_dir
    ));
}
