//! Mini CTF command-line entry point
//!
//! Loads configuration, opens the game database and dispatches to the
//! subcommand handlers.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use minictf::cli::{Cli, Command};
use minictf::commands::{self, emit, AppContext};
use minictf::config::Config;
use minictf::db;
use minictf::export::ExportFormat;
use minictf::models::challenge::NewChallenge;
use minictf::models::user::UserSummary;
use minictf::ui::{self, Prompter};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8, configured: &str) {
    let filter = match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    };

    let env_filter = match filter {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(cli.verbose, &config.log.level);

    let db_path = cli.db.clone().unwrap_or_else(|| config.database_path());
    let database = db::open(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    let ctx = AppContext::new(database, config);

    // Credential prompts go to stderr so JSON on stdout stays parseable
    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stderr());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let format = cli.format;
    let credentials = &cli.credentials;

    match cli.command {
        Command::Init { no_samples } => {
            emit(&commands::init(&ctx, !no_samples)?, format, &mut out)?;
        }
        Command::Register { organizer } => {
            let user = commands::register(&ctx, credentials, organizer, &mut prompter)?;
            emit(&UserSummary::from(&user), format, &mut out)?;
        }
        Command::Challenges => {
            // Solve markers only when the caller identified themselves
            let viewer = match credentials.user {
                Some(_) => Some(commands::authenticate(&ctx, credentials, &mut prompter)?),
                None => None,
            };
            emit(&commands::challenges(&ctx, viewer.as_ref())?, format, &mut out)?;
        }
        Command::Show { id } => {
            emit(&commands::show(&ctx, id)?, format, &mut out)?;
        }
        Command::Submit { id, flag } => {
            let user = commands::authenticate(&ctx, credentials, &mut prompter)?;
            emit(&commands::submit(&ctx, &user, id, &flag)?, format, &mut out)?;
        }
        Command::Progress => {
            let user = commands::authenticate(&ctx, credentials, &mut prompter)?;
            emit(&commands::progress(&ctx, &user)?, format, &mut out)?;
        }
        Command::Leaderboard { limit } => {
            emit(&commands::leaderboard(&ctx, limit)?, format, &mut out)?;
        }
        Command::Stats => {
            emit(&commands::stats(&ctx)?, format, &mut out)?;
        }
        Command::AddChallenge {
            title,
            description,
            category,
            flag,
            points,
            max_attempts,
        } => {
            let user = commands::authenticate(&ctx, credentials, &mut prompter)?;
            let input = NewChallenge {
                title,
                description,
                category,
                flag,
                points,
                max_attempts,
            };
            emit(&commands::add_challenge(&ctx, &user, &input)?, format, &mut out)?;
        }
        Command::Retire { id } => {
            let user = commands::authenticate(&ctx, credentials, &mut prompter)?;
            emit(&commands::set_active(&ctx, &user, id, false)?, format, &mut out)?;
        }
        Command::Restore { id } => {
            let user = commands::authenticate(&ctx, credentials, &mut prompter)?;
            emit(&commands::set_active(&ctx, &user, id, true)?, format, &mut out)?;
        }
        Command::Import { path } => {
            let user = commands::authenticate(&ctx, credentials, &mut prompter)?;
            let report = commands::import(&ctx, &user, &path)
                .with_context(|| format!("Failed to import {}", path.display()))?;
            emit(&report, format, &mut out)?;
        }
        Command::Promote { username } => {
            let user = commands::authenticate(&ctx, credentials, &mut prompter)?;
            emit(&commands::promote(&ctx, &user, &username)?, format, &mut out)?;
        }
        Command::Export {
            target,
            as_format,
            output,
        } => {
            let export_format: ExportFormat = as_format.parse()?;
            let user = match credentials.user {
                Some(_) => Some(commands::authenticate(&ctx, credentials, &mut prompter)?),
                None => None,
            };
            let report = commands::export(&ctx, user.as_ref(), target, export_format, output.as_deref())
                .context("Export failed")?;
            emit(&report, format, &mut out)?;
        }
        Command::Play => {
            drop(prompter);
            drop(out);
            let mut game = Prompter::new(stdin.lock(), io::stdout());
            commands::play(&ctx, &mut game)?;
        }
    }

    io::stdout().flush().context("Failed to flush output")?;
    Ok(())
}
