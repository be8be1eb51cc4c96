//! Leaderboard and challenge statistics

use crate::db::{queries, Database};
use crate::models::stats::{ChallengeStats, GameSummary, LeaderboardEntry};
use crate::GameError;

/// Share of attempting users who solved a challenge.
///
/// Returns None when nobody has attempted it. Clamped to 1.0 because
/// progress rows imported from older databases may lack submissions.
pub fn solve_rate(solves: i64, attempting_users: i64) -> Option<f64> {
    if attempting_users <= 0 {
        return None;
    }
    Some((solves as f64 / attempting_users as f64).min(1.0))
}

/// Ranked players with a positive score
pub fn leaderboard(db: &Database, limit: Option<u32>) -> Result<Vec<LeaderboardEntry>, GameError> {
    let entries = db.with_connection(|conn| queries::get_leaderboard(conn, limit))?;
    Ok(entries)
}

/// Solve counts and rates for every active challenge
pub fn challenge_stats(db: &Database) -> Result<Vec<ChallengeStats>, GameError> {
    let counters = db.with_connection(queries::get_challenge_counters)?;

    let stats = counters
        .into_iter()
        .map(|c| ChallengeStats {
            challenge_id: c.challenge.id,
            title: c.challenge.title,
            category: c.challenge.category,
            points: c.challenge.points,
            solves: c.solves,
            submissions: c.submissions,
            attempting_users: c.attempting_users,
            solve_rate: solve_rate(c.solves, c.attempting_users),
            first_solver: c.first_solver,
        })
        .collect();

    Ok(stats)
}

pub fn game_summary(db: &Database) -> Result<GameSummary, GameError> {
    let summary = db.with_connection(queries::get_game_summary)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth;
    use crate::config::GameConfig;
    use crate::game::{create_challenge, submit_flag};
    use crate::models::challenge::ChallengeBuilder;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_solve_rate() {
        assert_eq!(solve_rate(0, 0), None);
        assert_eq!(solve_rate(1, 4), Some(0.25));
        assert_eq!(solve_rate(3, 2), Some(1.0));
    }

    #[test]
    fn test_challenge_stats_and_first_solver() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let admin = auth::register(&db, "admin", "secret1", true, 6).unwrap();
        let alice = auth::register(&db, "alice", "secret1", false, 6).unwrap();
        let bob = auth::register(&db, "bob", "secret1", false, 6).unwrap();

        let solved = create_challenge(&db, &admin, &ChallengeBuilder::new("Solved", "CTF{s}", 10).build()).unwrap();
        let untouched = create_challenge(&db, &admin, &ChallengeBuilder::new("Untouched", "CTF{u}", 20).build()).unwrap();

        let rules = GameConfig::default();
        let t0 = Utc.with_ymd_and_hms(2026, 2, 5, 10, 0, 0).unwrap();
        submit_flag(&db, &rules, bob.id, solved, "wrong", t0).unwrap();
        submit_flag(&db, &rules, bob.id, solved, "CTF{s}", t0 + Duration::minutes(1)).unwrap();
        submit_flag(&db, &rules, alice.id, solved, "wrong", t0 + Duration::minutes(2)).unwrap();

        let stats = challenge_stats(&db).unwrap();
        assert_eq!(stats.len(), 2);

        let first = &stats[0];
        assert_eq!(first.challenge_id, solved);
        assert_eq!(first.solves, 1);
        assert_eq!(first.submissions, 3);
        assert_eq!(first.attempting_users, 2);
        assert_eq!(first.solve_rate, Some(0.5));
        assert_eq!(first.first_solver.as_deref(), Some("bob"));

        let second = &stats[1];
        assert_eq!(second.challenge_id, untouched);
        assert_eq!(second.solve_rate, None);
        assert!(second.first_solver.is_none());

        let summary = game_summary(&db).unwrap();
        assert_eq!(summary.players, 2);
        assert_eq!(summary.active_challenges, 2);
        assert_eq!(summary.total_points_available, 30);
        assert_eq!(summary.correct_submissions, 1);

        let board = leaderboard(&db, None).unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].username, "bob");
        assert_eq!(board[0].solves, 1);
    }
}
