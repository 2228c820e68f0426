use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use kanso::{
    expand_target, format_text, lex_tokens, load_config, parse_target, render_diagnostics,
    KansoConfig, KansoError,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kanso")]
#[command(about = "Layout-sensitive parser front end for Kanso sources")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the nearest kanso.toml above the target)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the layout-processed token stream of a file
    Lex {
        file: PathBuf,
    },
    /// Parse a file, a directory, or `dir/...` recursively and print the CST as JSON
    Parse {
        target: String,
    },
    /// Pretty-print a file
    Fmt {
        file: PathBuf,
    },
    /// Print the names each file exports
    Exports {
        target: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(KansoError::Diagnostics) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), KansoError> {
    match &cli.command {
        Commands::Lex { file } => {
            let config = config_for(&cli, file)?;
            let content = std::fs::read_to_string(file)?;
            let (tokens, diagnostics) = lex_tokens(&content, config.parse.tab_width);
            for token in &tokens {
                let start = token.span.start;
                let kind = format!("{:?}", token.kind).to_lowercase();
                println!("{}:{} {kind} {}", start.line, start.column, token.text);
            }
            report(&file.display().to_string(), &diagnostics)
        }
        Commands::Parse { target } => {
            let config = config_for(&cli, &target_base(target))?;
            let bundle = parse_target(target, &config)?;
            let output = serde_json::to_string_pretty(&bundle)?;
            println!("{output}");
            let mut had_errors = false;
            for file in &bundle.files {
                let rendered = render_diagnostics(&file.path, &file.diagnostics);
                if !rendered.is_empty() {
                    eprintln!("{rendered}");
                }
                had_errors |= file.has_errors();
            }
            if had_errors {
                return Err(KansoError::Diagnostics);
            }
            Ok(())
        }
        Commands::Fmt { file } => {
            let config = config_for(&cli, file)?;
            let content = std::fs::read_to_string(file)?;
            match format_text(&content, &config) {
                Ok(formatted) => {
                    print!("{formatted}");
                    Ok(())
                }
                Err(diagnostics) => report(&file.display().to_string(), &diagnostics),
            }
        }
        Commands::Exports { target } => {
            let config = config_for(&cli, &target_base(target))?;
            let bundle = parse_target(target, &config)?;
            for file in &bundle.files {
                println!("{}", file.path);
                for name in &file.exports {
                    println!("  {name}");
                }
            }
            if bundle.has_errors() {
                eprintln!("some files have parse errors; exports may be incomplete");
            }
            Ok(())
        }
    }
}

fn config_for(cli: &Cli, target: &Path) -> Result<KansoConfig, KansoError> {
    load_config(cli.config.as_deref(), target)
}

/// Directory or file a target string points at, for config discovery.
fn target_base(target: &str) -> PathBuf {
    match expand_target(target) {
        Ok(paths) if paths.len() == 1 => paths[0].clone(),
        _ => PathBuf::from(target.strip_suffix("/...").unwrap_or(target)),
    }
}

fn report(path: &str, diagnostics: &[kanso::Diagnostic]) -> Result<(), KansoError> {
    let rendered = render_diagnostics(path, diagnostics);
    if !rendered.is_empty() {
        eprintln!("{rendered}");
    }
    if diagnostics.iter().any(kanso::Diagnostic::is_error) {
        return Err(KansoError::Diagnostics);
    }
    Ok(())
}
