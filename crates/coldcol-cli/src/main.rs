use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use coldcol_core::{Config, Diagnostic, DiagnosticCode, Location, Report, Severity};
use coldcol_sql::{Outcome, Session, SessionError};

/// coldcol - output columns of SQL queries without a database
#[derive(Parser)]
#[command(name = "coldcol")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: coldcol.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Additional schema files or directories, loaded after the config's
    #[arg(short, long = "schema", global = true)]
    schemas: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the output columns of one query
    Columns {
        /// SQL text of the query
        #[arg(conflicts_with = "file", required_unless_present = "file")]
        sql: Option<String>,

        /// Read the query from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print the columns as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Run SQL scripts in order and report every statement's columns
    Check {
        /// SQL files; tables and views they create are visible to later statements
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file for report.json
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// Also output markdown report
        #[arg(short, long)]
        markdown: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = load_config(cli.config.as_deref(), cli.verbose)?;
    let session = Session::from_config(config).context("Failed to load schema files from config")?;

    for path in &cli.schemas {
        let tables = if path.is_dir() {
            session.load_schema_dir(path)
        } else {
            session.load_schema(path)
        }
        .with_context(|| format!("Failed to load schema {}", path.display()))?;

        if cli.verbose {
            eprintln!("{} {} ({} tables)", "Loaded schema:".cyan(), path.display(), tables);
        }
    }

    match cli.command {
        Commands::Columns { sql, file, json } => columns_command(&session, sql, file.as_deref(), json),
        Commands::Check { files, output, markdown } => {
            check_command(&session, &files, &output, markdown.as_deref(), cli.verbose)
        }
    }
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    let config = if let Some(config_path) = path {
        Config::from_file(config_path)?
    } else if Path::new("coldcol.toml").exists() {
        Config::from_file(Path::new("coldcol.toml"))?
    } else {
        if verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    if verbose {
        eprintln!("{} dialect: {:?}, quoting: {:?}", "Using".cyan(), config.dialect, config.quoting);
    }

    Ok(config)
}

/// Columns command - resolve one query
fn columns_command(session: &Session, sql: Option<String>, file: Option<&Path>, json: bool) -> Result<()> {
    let sql = match (sql, file) {
        (Some(sql), _) => sql,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => anyhow::bail!("Provide a query or --file"),
    };

    match session.columns_for_sql(&sql) {
        Ok(columns) if json => {
            println!("{}", serde_json::to_string(&columns)?);
            Ok(())
        }
        Ok(columns) => {
            for column in columns {
                println!("{}", column);
            }
            Ok(())
        }
        Err(e) => {
            print_error(&e);
            std::process::exit(1);
        }
    }
}

/// Check command - run scripts and write a report
fn check_command(session: &Session, files: &[PathBuf], output: &Path, markdown: Option<&Path>, verbose: bool) -> Result<()> {
    let mut report = Report::new();
    tracing::info!(files = files.len(), "checking SQL scripts");

    for path in files {
        if verbose {
            eprintln!("  {} {}...", "Checking".cyan(), path.display());
        }

        let sql = match std::fs::read_to_string(path) {
            Ok(sql) => sql,
            Err(e) => {
                report.add_failure(
                    Diagnostic::new(
                        DiagnosticCode::SqlParseError,
                        Severity::Error,
                        format!("Failed to read SQL file {}: {}", path.display(), e),
                    )
                    .with_location(Location::new(path.display().to_string())),
                );
                continue;
            }
        };

        let results = match session.execute_script(&sql, Some(path)) {
            Ok(results) => results,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "script failed to parse");
                report.add_failure(e.to_diagnostic());
                continue;
            }
        };

        for (index, result) in results.into_iter().enumerate() {
            let source = format!("{}#{}", path.display(), index + 1);
            match result {
                Ok(Outcome::Columns(columns)) => report.add_resolved(source, columns),
                Ok(Outcome::Created { literal, columns }) => {
                    report.add_resolved(format!("{} ({})", source, literal), columns)
                }
                Err(e) => report.add_failure(
                    e.to_diagnostic()
                        .with_location(Location::new(source)),
                ),
            }
        }
    }

    report.save_to_file(output)?;
    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    if let Some(md_path) = markdown {
        std::fs::write(md_path, report.to_markdown())?;
        if verbose {
            eprintln!("{} {}", "Markdown report saved to:".green(), md_path.display());
        }
    }

    print_report_summary(&report);

    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_error(error: &SessionError) {
    let diag = error.to_diagnostic();
    eprintln!("{} [{}] {}", "error:".red().bold(), diag.code, diag.message);
}

fn print_report_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Column Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("{}", "Summary:".bold());
    println!("  Statements checked: {}", report.summary.queries_checked);
    println!("  Resolved:           {}", report.summary.queries_resolved.to_string().green());

    if report.summary.errors > 0 {
        println!("  Errors:             {}", report.summary.errors.to_string().red().bold());
    } else {
        println!("  Errors:             {}", report.summary.errors.to_string().green());
    }
    println!();

    for query in &report.resolved {
        println!("  {} {}", query.source.bold(), query.columns.join(", "));
    }

    if !report.diagnostics.is_empty() {
        println!();
        println!("{}", "Diagnostics:".bold());
        for diag in &report.diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "ERROR".red().bold(),
                Severity::Warn => "WARN".yellow().bold(),
                Severity::Info => "INFO".cyan(),
            };

            let location = diag
                .location
                .as_ref()
                .map(|l| format!(" {}", l.file))
                .unwrap_or_default();
            println!("  [{}]{} {}: {}", severity_str, location, diag.code, diag.message);
        }
    }
}
