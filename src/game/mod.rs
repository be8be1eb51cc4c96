//! Game rules module
//!
//! Provides the operations players and organizers perform against the
//! database, built on top of `db::queries`:
//! - Challenge catalogue management and challenge pack import
//! - Flag submission with attempt limits and lockouts
//! - Progress reports, leaderboard and statistics

pub mod catalog;
pub mod progress;
pub mod stats;
pub mod submit;

pub use catalog::{
    create_challenge, get_challenge, import_challenges, list_challenges, load_challenge_pack,
    seed_sample_challenges, set_challenge_active,
};
pub use progress::user_progress;
pub use stats::{challenge_stats, game_summary, leaderboard, solve_rate};
pub use submit::{flags_match, submit_flag};
