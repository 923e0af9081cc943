pub mod cli;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod listener;
pub mod services;
pub mod utils;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, CliCommand};
use config::AppConfig;
use error::{AppError, AppResult};
use services::history::HistoryController;
use services::session::{Feedback, HistorySession};

static TRACING: OnceCell<()> = OnceCell::new();

pub fn init_tracing(verbose: u8) {
    TRACING.get_or_init(|| {
        let level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_target(false)
            .compact()
            .try_init();
    });
}

pub fn run() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run_cli(cli) {
        eprintln!("error while running clipkeep: {err}");
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> AppResult<()> {
    let config = AppConfig::resolve(cli.db)?;
    let controller = build_controller(&config)?;

    let result = match cli.command.unwrap_or(CliCommand::Shell) {
        CliCommand::Shell => run_shell(&controller),
        CliCommand::Watch => run_watch(&controller),
        CliCommand::List { favorites, json } => run_list(&controller, favorites, json),
    };

    if let Err(err) = controller.close() {
        warn!("failed to stop clipboard listener: {err}");
    }
    result
}

pub fn build_controller(config: &AppConfig) -> AppResult<HistoryController> {
    let db = Arc::new(db::Database::new(&config.db_path)?);
    info!("history database at {}", config.db_path.display());

    let clipboard = clipboard::default_service();
    let watcher = listener::default_watcher();
    HistoryController::new(db, clipboard, clipboard::default_paster(), watcher)
}

fn run_watch(controller: &HistoryController) -> AppResult<()> {
    info!("watching the clipboard; interrupt to quit");
    controller.start_monitoring(false)
}

fn run_list(controller: &HistoryController, favorites: bool, json: bool) -> AppResult<()> {
    let snapshot = controller.snapshot()?;
    if json {
        let rendered = serde_json::to_string_pretty(&snapshot)
            .map_err(|err| AppError::Internal(err.to_string()))?;
        println!("{rendered}");
        return Ok(());
    }

    let entries = if favorites {
        &snapshot.favorites
    } else {
        &snapshot.general
    };
    for (index, entry) in entries.iter().enumerate() {
        println!("{:>4}  {}", index + 1, preview(&entry.text));
    }
    Ok(())
}

fn preview(text: &str) -> String {
    let mut lines = text.lines();
    let first = lines.next().unwrap_or_default();
    if lines.next().is_some() {
        format!("{first} …")
    } else {
        first.to_string()
    }
}

fn run_shell(controller: &HistoryController) -> AppResult<()> {
    controller.start_monitoring(true)?;
    println!("clipkeep: press enter to open the history, f1 for keys, quit to exit");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut session: Option<HistorySession> = None;

    loop {
        prompt(session.as_ref())?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.map_err(|err| AppError::Internal(err.to_string()))?;
        let input = line.trim();

        if matches!(input, "quit" | "exit") {
            break;
        }

        match session.as_mut() {
            Some(active) => {
                let command = commands::parse(input);
                match commands::execute(controller, active, command) {
                    Ok(feedback) => show(&feedback),
                    Err(err) => println!("{err}"),
                }
                if !active.is_open() {
                    session = None;
                }
            }
            None if input.is_empty() => {
                let opened = controller.open_session()?;
                show(&opened.greeting());
                session = Some(opened);
            }
            None => println!("history is closed; press enter to open it"),
        }
    }
    Ok(())
}

fn prompt(session: Option<&HistorySession>) -> AppResult<()> {
    match session {
        Some(session) => print!("{}> ", session.active_list()),
        None => print!("clipkeep> "),
    }
    io::stdout()
        .flush()
        .map_err(|err| AppError::Internal(err.to_string()))
}

fn show(feedback: &Feedback) {
    if let Some(sound) = feedback.sound {
        debug!("sound {}", sound.file_name());
    }
    println!("{}", feedback.message);
}
