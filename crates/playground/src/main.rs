//! `ctp-playground`: the compile-time printer playground on the command line.
//!
//! ```bash
//! ctp-playground run example.cpp
//! ctp-playground --compiler g93 --flags="-std=c++2a" watch example.cpp
//! ctp-playground share example.cpp --long
//! ctp-playground open 'https://viatorus.github.io/compile-time-printer/#MYewtgDglgNg...' -o shared.cpp
//! ```
//!
//! Logs go to stderr (`RUST_LOG` controls the level); program output goes to stdout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use ctp_playground::services::{http_client, parse_service, CompilerExplorer, HttpShortener};
use ctp_playground::shell::{LinkLength, Session, SessionOrigin, SharePanel};
use ctp_playground::state::{COMPILERS, DEFAULT_COMPILER};
use ctp_playground::storage::{self, FileStorage, MemoryStorage, Storage};
use ctp_playground::terminal::TerminalView;
use ctp_playground::{Playground, PlaygroundConfig, PlaygroundState, Services, Status, Timing};

#[derive(Parser, Debug)]
#[command(author, version, about = "Compile-time printer playground", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Compiler Explorer compiler id (see `compilers`)
    #[arg(long, global = true)]
    compiler: Option<String>,

    /// Compiler flags, e.g. --flags="-std=c++2a -O2"
    #[arg(long, global = true, allow_hyphen_values = true)]
    flags: Option<String>,

    /// Hide compiler output that is not an error or warning
    #[arg(long, short, global = true, default_value_t = false)]
    quiet: bool,

    /// Do not write the state back to local storage
    #[arg(long, global = true, default_value_t = false)]
    no_save: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile once and print the output
    Run {
        /// Source file; the stored code is used when omitted
        file: Option<PathBuf>,
    },
    /// Recompile whenever the file changes
    Watch {
        file: PathBuf,
        /// How often the file is checked for changes
        #[arg(long, default_value_t = 250)]
        poll_ms: u64,
    },
    /// Print a share link for the current state
    Share {
        file: Option<PathBuf>,
        /// Print the full link instead of a shortened one
        #[arg(long, default_value_t = false)]
        long: bool,
    },
    /// Decode a share link
    Open {
        url: String,
        /// Write the shared code to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Reset the stored state to the defaults
    Reset,
    /// List the known compilers
    Compilers,
}

impl Cli {
    /// State keys set on the command line, applied on top of the stored state.
    fn overrides(&self, code: Option<String>) -> HashMap<String, String> {
        let mut data = HashMap::new();
        if let Some(code) = code {
            data.insert("code".to_string(), code);
        }
        if let Some(compiler) = &self.compiler {
            data.insert("compiler".to_string(), compiler.clone());
        }
        if let Some(flags) = &self.flags {
            data.insert("compiler_flags".to_string(), flags.clone());
        }
        if self.quiet {
            data.insert("show_compiler_log".to_string(), "false".to_string());
        }
        data
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PlaygroundConfig::from_file(path)?,
        None => PlaygroundConfig::default(),
    };

    match &cli.command {
        Command::Run { file } => {
            let code = file.as_deref().map(read_source).transpose()?;
            let mut playground = start_playground(&cli, &config, code)?;
            let status = playground
                .run_until_rendered()
                .await
                .map(|rendering| rendering.status)
                .context("compile cycle ended without output")?;
            if status == Status::Failed {
                std::process::exit(1);
            }
        }
        Command::Watch { file, poll_ms } => {
            watch(&cli, &config, file, Duration::from_millis(*poll_ms)).await?;
        }
        Command::Share { file, long } => {
            let code = file.as_deref().map(read_source).transpose()?;
            let storage = FileStorage::new(&config.storage_dir);
            let mut data = storage::load(&storage);
            data.extend(cli.overrides(code));
            let mut state = PlaygroundState::default();
            state.apply(&data);

            let http = http_client(&config)?;
            let shortener = HttpShortener::new(http, &config.shortener_url);
            let mut panel = SharePanel::new();
            panel.set_length(if *long { LinkLength::Long } else { LinkLength::Short });
            println!(
                "{}",
                panel.refresh(&state, &config.share_base_url, &shortener).await
            );
        }
        Command::Open { url, output } => {
            let session = Session::init(Some(url.as_str()), &MemoryStorage::new());
            if session.origin != SessionOrigin::Shared {
                bail!("No playground state found in {url}");
            }
            let mut state = PlaygroundState::default();
            state.apply(&session.data);
            info!(
                compiler = %state.compiler,
                flags = %state.compiler_flags,
                "opened share link"
            );
            match output {
                Some(path) => std::fs::write(path, &state.code)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => print!("{}", state.code),
            }
        }
        Command::Reset => {
            let storage = FileStorage::new(&config.storage_dir);
            let failed = storage::save(&storage, &PlaygroundState::default());
            if failed > 0 {
                bail!(
                    "Failed to reset {failed} stored values in {}",
                    storage.dir().display()
                );
            }
            info!(dir = %storage.dir().display(), "stored state reset");
        }
        Command::Compilers => {
            for compiler in COMPILERS {
                let marker = if compiler.id == DEFAULT_COMPILER { " (default)" } else { "" };
                println!("{:<10} {}{}", compiler.id, compiler.name, marker);
            }
        }
    }

    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn start_playground(
    cli: &Cli,
    config: &PlaygroundConfig,
    code: Option<String>,
) -> Result<Playground> {
    let http = http_client(config)?;
    let services = Services {
        compiler: Arc::new(CompilerExplorer::new(http.clone(), &config.compile_url)),
        parser: Arc::from(parse_service(config, &http)),
    };
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(&config.storage_dir));

    let mut session = Session::init(None, storage.as_ref());
    session.data.extend(cli.overrides(code));

    let mut playground = Playground::new(
        Box::new(TerminalView::stdout()),
        services,
        Timing::from(config),
    );
    if cli.no_save {
        playground.load(&session.data);
    } else {
        session.apply(&mut playground, storage);
    }
    Ok(playground)
}

async fn watch(cli: &Cli, config: &PlaygroundConfig, file: &Path, poll: Duration) -> Result<()> {
    let mut code = read_source(file)?;
    let mut playground = start_playground(cli, config, Some(code.clone()))?;
    let mut ticker = tokio::time::interval(poll);
    info!(file = %file.display(), "watching for changes, Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = playground.next_event() => {
                if event.is_none() {
                    break;
                }
            }
            _ = ticker.tick() => {
                match std::fs::read_to_string(file) {
                    Ok(current) if current != code => {
                        code = current;
                        playground.set_code(code.clone());
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(file = %file.display(), error = %e, "failed to read watched file"),
                }
            }
        }
    }

    info!(summary = %playground.phases().summary(), "stopped watching");
    Ok(())
}
