//! SchemaVer CLI
//!
//! Command-line interface for comparing schema revisions and computing the
//! next SchemaVer version.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use schemaver::{
    diff, load_schema_auto, ClassifiedChange, CompareError, CompareOptions, Release, RuleEngine,
    SchemaNode, SchemaVersion,
};

#[derive(Parser)]
#[command(name = "schemaver")]
#[command(about = "Classify JSON Schema changes and compute SchemaVer versions")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two schemas and compute the next version
    Compare {
        /// Previous schema: file path, URL, or inline JSON
        #[arg(long)]
        old: String,

        /// New schema: file path, URL, or inline JSON
        #[arg(long)]
        new: String,

        /// Version of the previous schema (e.g. 1-0-0)
        #[arg(long)]
        version: SchemaVersion,

        /// What to print
        #[arg(long, value_enum, default_value_t = OutputFormat::Version)]
        format: OutputFormat,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Treat changes to this keyword as metadata (repeatable)
        #[arg(long = "annotation", value_name = "KEYWORD")]
        annotations: Vec<String>,

        /// Exit with code 1 when the schemas are equivalent
        #[arg(long)]
        fail_if_unchanged: bool,
    },

    /// List every change between two schemas with its severity
    Diff {
        /// Previous schema: file path, URL, or inline JSON
        #[arg(long)]
        old: String,

        /// New schema: file path, URL, or inline JSON
        #[arg(long)]
        new: String,

        /// Treat changes to this keyword as metadata (repeatable)
        #[arg(long = "annotation", value_name = "KEYWORD")]
        annotations: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Next version only
    Version,
    /// Markdown release summary
    Markdown,
    /// Full release record as JSON
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compare {
            old,
            new,
            version,
            format,
            output,
            annotations,
            fail_if_unchanged,
        } => run_compare(CompareArgs {
            old,
            new,
            version,
            format,
            output,
            options: CompareOptions::new().annotation_keywords(annotations),
            fail_if_unchanged,
        }),

        Commands::Diff {
            old,
            new,
            annotations,
            json,
        } => run_diff(
            &old,
            &new,
            &CompareOptions::new().annotation_keywords(annotations),
            json,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Install a stderr subscriber; `RUST_LOG` takes precedence over `-v`.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

struct CompareArgs {
    old: String,
    new: String,
    version: SchemaVersion,
    format: OutputFormat,
    output: Option<PathBuf>,
    options: CompareOptions,
    fail_if_unchanged: bool,
}

fn run_compare(args: CompareArgs) -> Result<(), u8> {
    let old = load("--old", &args.old)?;
    let new = load("--new", &args.new)?;

    let release =
        Release::compare_with(&old, &new, args.version, &args.options).map_err(report)?;

    let text = match args.format {
        OutputFormat::Version => release.next.to_string(),
        OutputFormat::Markdown => release.summarize(),
        OutputFormat::Json => serde_json::to_string_pretty(&release).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?,
    };

    match args.output {
        Some(path) => {
            std::fs::write(&path, &text).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => println!("{}", text.trim_end()),
    }

    if release.is_unchanged() {
        eprintln!("No changes detected; version remains {}", release.previous);
        if args.fail_if_unchanged {
            return Err(1);
        }
    }
    Ok(())
}

fn run_diff(old: &str, new: &str, options: &CompareOptions, json_output: bool) -> Result<(), u8> {
    let old = parse("old", &load("--old", old)?)?;
    let new = parse("new", &load("--new", new)?)?;

    let engine = RuleEngine::from_options(options);
    let changes = diff(&old, &new)
        .into_iter()
        .map(|change| -> Result<ClassifiedChange, CompareError> {
            let severity = engine.classify(&change)?;
            Ok(ClassifiedChange { change, severity })
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(report)?;

    if json_output {
        let text = serde_json::to_string_pretty(&changes).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", text);
        return Ok(());
    }

    if changes.is_empty() {
        println!("No changes detected");
    }
    for entry in &changes {
        println!("{:<8} {}", entry.severity, entry.change);
    }
    Ok(())
}

fn load(flag: &str, source: &str) -> Result<Value, u8> {
    load_schema_auto(source).map_err(|e| {
        eprintln!("Error: cannot load {} schema: {}", flag, e);
        e.exit_code() as u8
    })
}

fn parse(side: &'static str, value: &Value) -> Result<SchemaNode, u8> {
    SchemaNode::from_value(value).map_err(|source| report(CompareError::Parse { side, source }))
}

fn report(e: CompareError) -> u8 {
    eprintln!("Error: {}", e);
    e.exit_code() as u8
}
