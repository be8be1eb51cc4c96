//! Command handlers
//!
//! Each handler runs one game operation and returns a serializable
//! response. Responses render either as JSON or as colored console text,
//! so the same handlers back the one-shot subcommands and the interactive
//! `play` loop.

use std::io::{self, BufRead, Write};
use std::path::Path;

use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use crate::auth;
use crate::cli::{Credentials, ExportTarget, OutputFormat};
use crate::config::Config;
use crate::db::{queries, Database};
use crate::export::{self, ExportFormat};
use crate::game;
use crate::models::challenge::{Challenge, ChallengeSummary, NewChallenge};
use crate::models::stats::{ChallengeStats, GameSummary, LeaderboardEntry};
use crate::models::submission::{Progress, SubmitOutcome};
use crate::models::user::{User, UserSummary};
use crate::ui::{self, Prompter, Tone};
use crate::GameError;

/// Shared state for command handlers
pub struct AppContext {
    pub db: Database,
    pub config: Config,
}

impl AppContext {
    pub fn new(db: Database, config: Config) -> Self {
        Self { db, config }
    }
}

// ============================================================================
// Output
// ============================================================================

/// A response that can be shown as console text
pub trait Render: Serialize {
    fn render_text(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// Write a response in the requested format
pub fn emit<T: Render>(value: &T, format: OutputFormat, out: &mut dyn Write) -> Result<(), GameError> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(value)?)?,
        OutputFormat::Text => value.render_text(out)?,
    }
    Ok(())
}

fn attempts_label(max_attempts: i64) -> String {
    if max_attempts > 0 {
        max_attempts.to_string()
    } else {
        "unlimited".to_string()
    }
}

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    pub database: String,
    pub seeded: usize,
    pub challenges: usize,
}

impl Render for InitReport {
    fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", ui::styled(Tone::Success, &format!("Database ready at {}", self.database)))?;
        if self.seeded > 0 {
            writeln!(out, "{}", ui::styled(Tone::Info, &format!("Added {} starter challenges", self.seeded)))?;
        }
        writeln!(out, "{} active challenge(s)", self.challenges)
    }
}

impl Render for UserSummary {
    fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "{}",
            ui::styled(Tone::Success, &format!("Account '{}' ready ({})", self.username, self.role))
        )?;
        writeln!(out, "Score: {}", self.score)?;
        writeln!(out, "Registered: {}", ui::format_datetime(Some(&self.created_at)))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChallengeList {
    pub challenges: Vec<ChallengeSummary>,
}

impl Render for ChallengeList {
    fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.challenges.is_empty() {
            return writeln!(out, "{}", ui::styled(Tone::Warning, "No challenges available yet."));
        }

        let rows: Vec<Vec<String>> = self
            .challenges
            .iter()
            .map(|c| {
                vec![
                    c.id.to_string(),
                    c.title.clone(),
                    c.category.to_string(),
                    c.points.to_string(),
                    c.solves.to_string(),
                    if c.solved_by_me { "✓".to_string() } else { String::new() },
                ]
            })
            .collect();
        ui::write_header(out, "Available Challenges")?;
        ui::write_table(out, &["ID", "Title", "Category", "Points", "Solves", "Solved"], &rows)
    }
}

impl Render for Challenge {
    fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
        ui::write_header(out, &format!("#{} {}", self.id, self.title))?;
        writeln!(
            out,
            "Category: {}  Points: {}  Attempts: {}",
            self.category,
            self.points,
            attempts_label(self.max_attempts)
        )?;
        writeln!(out)?;
        writeln!(out, "{}", self.description)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitReport {
    pub challenge_id: i64,
    pub outcome: SubmitOutcome,
    pub message: String,
}

impl Render for SubmitReport {
    fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
        let tone = match self.outcome {
            SubmitOutcome::Correct { .. } => Tone::Success,
            SubmitOutcome::Incorrect { .. } => Tone::Error,
            SubmitOutcome::LockedOut { .. } => Tone::Warning,
        };
        writeln!(out, "{}", ui::styled(tone, &self.message))
    }
}

impl Render for Progress {
    fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
        ui::write_header(out, &format!("Progress for {}", self.username))?;
        writeln!(out, "Total score: {}", self.score.to_string().bold())?;
        writeln!(out, "Challenges solved: {}", self.solved_count())?;

        if !self.solved.is_empty() {
            let rows: Vec<Vec<String>> = self
                .solved
                .iter()
                .map(|s| {
                    vec![
                        s.title.clone(),
                        s.points.to_string(),
                        ui::format_datetime(s.solved_at.as_deref()),
                    ]
                })
                .collect();
            writeln!(out)?;
            ui::write_table(out, &["Challenge", "Points", "Solved At"], &rows)?;
        }

        if !self.attempted.is_empty() {
            let rows: Vec<Vec<String>> = self
                .attempted
                .iter()
                .map(|a| {
                    vec![
                        a.title.clone(),
                        a.attempts.to_string(),
                        attempts_label(a.max_attempts),
                        a.locked_until
                            .as_deref()
                            .map(|t| ui::format_datetime(Some(t)))
                            .unwrap_or_default(),
                    ]
                })
                .collect();
            ui::write_header(out, "In progress")?;
            ui::write_table(out, &["Challenge", "Attempts", "Allowed", "Locked Until"], &rows)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
}

impl Render for Leaderboard {
    fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
        ui::write_header(out, "Leaderboard")?;
        if self.entries.is_empty() {
            return writeln!(out, "{}", ui::styled(Tone::Warning, "No scores yet."));
        }

        let rows: Vec<Vec<String>> = self
            .entries
            .iter()
            .map(|e| {
                vec![
                    e.rank.to_string(),
                    e.username.clone(),
                    e.score.to_string(),
                    e.solves.to_string(),
                ]
            })
            .collect();
        ui::write_table(out, &["Rank", "Username", "Score", "Solves"], &rows)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub summary: GameSummary,
    pub challenges: Vec<ChallengeStats>,
}

impl Render for StatsReport {
    fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
        ui::write_header(out, "Game Summary")?;
        writeln!(out, "Players: {}", self.summary.players)?;
        writeln!(
            out,
            "Active challenges: {} ({} points available)",
            self.summary.active_challenges, self.summary.total_points_available
        )?;
        writeln!(
            out,
            "Submissions: {} ({} correct, accuracy {})",
            self.summary.submissions,
            self.summary.correct_submissions,
            ui::format_percent(self.summary.accuracy())
        )?;

        if self.challenges.is_empty() {
            return Ok(());
        }
        let rows: Vec<Vec<String>> = self
            .challenges
            .iter()
            .map(|c| {
                vec![
                    c.title.clone(),
                    c.solves.to_string(),
                    c.attempting_users.to_string(),
                    ui::format_percent(c.solve_rate),
                    c.first_solver.clone().unwrap_or_else(|| "-".to_string()),
                ]
            })
            .collect();
        ui::write_header(out, "Challenges")?;
        ui::write_table(out, &["Challenge", "Solves", "Players", "Solve Rate", "First Blood"], &rows)
    }
}

/// Outcome of an organizer action
#[derive(Debug, Clone, Serialize)]
pub struct ActionReport {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl ActionReport {
    fn new(message: String) -> Self {
        Self {
            message,
            challenge_id: None,
            count: None,
        }
    }
}

impl Render for ActionReport {
    fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", ui::styled(Tone::Success, &self.message))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub format: ExportFormat,
    pub path: String,
    pub rows: usize,
}

impl Render for ExportReport {
    fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "{}",
            ui::styled(Tone::Success, &format!("Exported {} rows to {}", self.rows, self.path))
        )
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Resolve the acting user from credentials, prompting for what is missing
pub fn authenticate<R: BufRead, W: Write>(
    ctx: &AppContext,
    credentials: &Credentials,
    prompter: &mut Prompter<R, W>,
) -> Result<User, GameError> {
    let (username, password) = resolve_credentials(credentials, prompter)?;
    let user = auth::login(&ctx.db, &username, &password)?;
    tracing::debug!(username = %user.username, "Authenticated");
    Ok(user)
}

fn resolve_credentials<R: BufRead, W: Write>(
    credentials: &Credentials,
    prompter: &mut Prompter<R, W>,
) -> Result<(String, String), GameError> {
    let username = match &credentials.user {
        Some(user) => user.clone(),
        None => prompter
            .ask("Username: ", true)?
            .ok_or_else(|| GameError::Validation("a username is required".to_string()))?,
    };
    let password = match &credentials.password {
        Some(password) => password.clone(),
        None => prompter
            .ask("Password: ", true)?
            .ok_or_else(|| GameError::Validation("a password is required".to_string()))?,
    };
    Ok((username, password))
}

// ============================================================================
// Handlers
// ============================================================================

/// Prepare the database and seed starter challenges into an empty catalogue
pub fn init(ctx: &AppContext, with_samples: bool) -> Result<InitReport, GameError> {
    let seeded = if with_samples && ctx.config.database.seed_sample_challenges {
        game::seed_sample_challenges(&ctx.db)?
    } else {
        0
    };
    let challenges = game::list_challenges(&ctx.db, None)?.len();

    Ok(InitReport {
        database: ctx.db.path().display().to_string(),
        seeded,
        challenges,
    })
}

/// Create an account.
///
/// The organizer role can only be self-assigned while no organizer exists;
/// after that an organizer must `promote` new ones.
pub fn register<R: BufRead, W: Write>(
    ctx: &AppContext,
    credentials: &Credentials,
    organizer: bool,
    prompter: &mut Prompter<R, W>,
) -> Result<User, GameError> {
    let (username, password) = resolve_credentials(credentials, prompter)?;
    auth::register(
        &ctx.db,
        &username,
        &password,
        organizer,
        ctx.config.auth.min_password_length,
    )
}

pub fn challenges(ctx: &AppContext, viewer: Option<&User>) -> Result<ChallengeList, GameError> {
    let challenges = game::list_challenges(&ctx.db, viewer.map(|u| u.id))?;
    Ok(ChallengeList { challenges })
}

pub fn show(ctx: &AppContext, challenge_id: i64) -> Result<Challenge, GameError> {
    game::get_challenge(&ctx.db, challenge_id)
}

pub fn submit(ctx: &AppContext, user: &User, challenge_id: i64, flag: &str) -> Result<SubmitReport, GameError> {
    let outcome = game::submit_flag(&ctx.db, &ctx.config.game, user.id, challenge_id, flag, Utc::now())?;
    tracing::info!(
        username = %user.username,
        challenge_id,
        correct = outcome.is_correct(),
        "Flag submitted"
    );

    Ok(SubmitReport {
        challenge_id,
        message: outcome.message(),
        outcome,
    })
}

pub fn progress(ctx: &AppContext, user: &User) -> Result<Progress, GameError> {
    game::user_progress(&ctx.db, user.id)
}

pub fn leaderboard(ctx: &AppContext, limit: Option<u32>) -> Result<Leaderboard, GameError> {
    let entries = game::leaderboard(&ctx.db, limit)?;
    Ok(Leaderboard { entries })
}

pub fn stats(ctx: &AppContext) -> Result<StatsReport, GameError> {
    Ok(StatsReport {
        summary: game::game_summary(&ctx.db)?,
        challenges: game::challenge_stats(&ctx.db)?,
    })
}

pub fn add_challenge(ctx: &AppContext, user: &User, input: &NewChallenge) -> Result<ActionReport, GameError> {
    let id = game::create_challenge(&ctx.db, user, input)?;
    Ok(ActionReport {
        challenge_id: Some(id),
        ..ActionReport::new(format!("Challenge '{}' added with id {}", input.title.trim(), id))
    })
}

pub fn set_active(ctx: &AppContext, user: &User, challenge_id: i64, active: bool) -> Result<ActionReport, GameError> {
    game::set_challenge_active(&ctx.db, user, challenge_id, active)?;
    let verb = if active { "restored" } else { "retired" };
    Ok(ActionReport {
        challenge_id: Some(challenge_id),
        ..ActionReport::new(format!("Challenge {} {}", challenge_id, verb))
    })
}

pub fn import(ctx: &AppContext, user: &User, path: &Path) -> Result<ActionReport, GameError> {
    let count = game::import_challenges(&ctx.db, user, path)?;
    Ok(ActionReport {
        count: Some(count),
        ..ActionReport::new(format!("Imported {} challenge(s) from {}", count, path.display()))
    })
}

pub fn promote(ctx: &AppContext, user: &User, username: &str) -> Result<ActionReport, GameError> {
    auth::promote(&ctx.db, user, username)?;
    Ok(ActionReport::new(format!("{} is now an organizer", username.trim())))
}

/// Export the leaderboard (anyone) or the submission log (organizers)
pub fn export(
    ctx: &AppContext,
    user: Option<&User>,
    target: ExportTarget,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<ExportReport, GameError> {
    let (path, rows) = match target {
        ExportTarget::Leaderboard => {
            let entries = game::leaderboard(&ctx.db, None)?;
            let path = export::resolve_export_path(output, "leaderboard", format);
            export::export_leaderboard(&entries, format, &path)?;
            (path, entries.len())
        }
        ExportTarget::Submissions => {
            let user = user.ok_or(GameError::InvalidCredentials)?;
            auth::require_organizer(user, "export submissions")?;

            let submissions = ctx.db.with_connection(|conn| queries::get_submissions(conn, None))?;
            let path = export::resolve_export_path(output, "submissions", format);
            export::export_submissions(&submissions, format, &path)?;
            (path, submissions.len())
        }
    };

    tracing::info!(rows, path = %path.display(), "Export written");
    Ok(ExportReport {
        format,
        path: path.display().to_string(),
        rows,
    })
}

// ============================================================================
// Interactive game
// ============================================================================

const GUEST_MENU: [&str; 4] = ["Login", "Register", "View Leaderboard", "Exit"];
const PLAYER_MENU: [&str; 6] = [
    "View Challenges",
    "Submit Flag",
    "My Progress",
    "View Leaderboard",
    "Logout",
    "Exit",
];

/// Run the menu-driven game until the player exits or input ends.
///
/// Mistakes such as a wrong password or a locked challenge are reported
/// and the loop continues. Storage failures end the session.
pub fn play<R: BufRead, W: Write>(ctx: &AppContext, prompter: &mut Prompter<R, W>) -> Result<(), GameError> {
    writeln!(prompter.writer(), "{}", ui::banner("Mini CTF"))?;
    let mut current: Option<User> = None;

    loop {
        let step = match &current {
            None => guest_turn(ctx, prompter),
            Some(user) => player_turn(ctx, prompter, user),
        };

        match step {
            Ok(Turn::Stay) => {}
            Ok(Turn::Login(user)) => current = Some(user),
            Ok(Turn::Logout) => current = None,
            Ok(Turn::Exit) => break,
            Err(e) if e.is_recoverable() => {
                writeln!(prompter.writer(), "{}", ui::styled(Tone::Error, &e.to_string()))?;
            }
            Err(e) => return Err(e),
        }
    }

    writeln!(prompter.writer(), "\nThanks for playing Mini CTF! Goodbye!")?;
    Ok(())
}

enum Turn {
    Stay,
    Login(User),
    Logout,
    Exit,
}

fn guest_turn<R: BufRead, W: Write>(ctx: &AppContext, prompter: &mut Prompter<R, W>) -> Result<Turn, GameError> {
    let Some(choice) = prompter.menu_choice("Main Menu", &GUEST_MENU)? else {
        return Ok(Turn::Exit);
    };

    match choice {
        1 => {
            let user = authenticate(ctx, &Credentials::default(), prompter)?;
            let greeting = format!("Welcome back, {}!", user.username);
            writeln!(prompter.writer(), "{}", ui::styled(Tone::Success, &greeting))?;
            Ok(Turn::Login(user))
        }
        2 => {
            let user = register(ctx, &Credentials::default(), false, prompter)?;
            let message = format!("Account created. Welcome, {}!", user.username);
            writeln!(prompter.writer(), "{}", ui::styled(Tone::Success, &message))?;
            Ok(Turn::Login(user))
        }
        3 => {
            leaderboard(ctx, Some(10))?.render_text(prompter.writer())?;
            Ok(Turn::Stay)
        }
        _ => Ok(Turn::Exit),
    }
}

fn player_turn<R: BufRead, W: Write>(
    ctx: &AppContext,
    prompter: &mut Prompter<R, W>,
    user: &User,
) -> Result<Turn, GameError> {
    let title = format!("Player Menu ({})", user.username);
    let Some(choice) = prompter.menu_choice(&title, &PLAYER_MENU)? else {
        return Ok(Turn::Exit);
    };

    match choice {
        1 => challenges(ctx, Some(user))?.render_text(prompter.writer())?,
        2 => {
            let Some(id) = prompter.ask_parsed::<i64>("Challenge ID: ", "challenge id")? else {
                return Ok(Turn::Exit);
            };
            show(ctx, id)?.render_text(prompter.writer())?;
            writeln!(prompter.writer())?;
            let Some(flag) = prompter.ask("Enter flag: ", true)? else {
                return Ok(Turn::Exit);
            };
            submit(ctx, user, id, &flag)?.render_text(prompter.writer())?;
        }
        3 => progress(ctx, user)?.render_text(prompter.writer())?,
        4 => leaderboard(ctx, Some(10))?.render_text(prompter.writer())?,
        5 => {
            writeln!(prompter.writer(), "{}", ui::styled(Tone::Info, "Logged out."))?;
            return Ok(Turn::Logout);
        }
        _ => return Ok(Turn::Exit),
    }

    Ok(Turn::Stay)
}
