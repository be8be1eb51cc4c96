//! Player progress reports

use crate::db::{queries, Database};
use crate::models::submission::Progress;
use crate::GameError;

/// Score, solved challenges (oldest solve first) and open attempts for a user
pub fn user_progress(db: &Database, user_id: i64) -> Result<Progress, GameError> {
    db.with_connection(|conn| {
        let user = queries::get_user_by_id(conn, user_id)?
            .ok_or_else(|| GameError::UserNotFound(user_id.to_string()))?;

        Ok(Progress {
            username: user.username,
            score: user.score,
            solved: queries::get_solved_challenges(conn, user_id)?,
            attempted: queries::get_attempted_challenges(conn, user_id)?,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth;
    use crate::config::GameConfig;
    use crate::game::submit::submit_flag;
    use crate::models::challenge::ChallengeBuilder;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_progress_lists_solves_in_order() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let admin = auth::register(&db, "admin", "secret1", true, 6).unwrap();
        let user = auth::register(&db, "alice", "secret1", false, 6).unwrap();

        let big = crate::game::create_challenge(&db, &admin, &ChallengeBuilder::new("Big", "CTF{big}", 100).build())
            .unwrap();
        let small = crate::game::create_challenge(&db, &admin, &ChallengeBuilder::new("Small", "CTF{small}", 10).build())
            .unwrap();
        let open = crate::game::create_challenge(
            &db,
            &admin,
            &ChallengeBuilder::new("Open", "CTF{open}", 30).max_attempts(3).build(),
        )
        .unwrap();

        let rules = GameConfig::default();
        let t0 = Utc.with_ymd_and_hms(2026, 2, 5, 10, 0, 0).unwrap();
        submit_flag(&db, &rules, user.id, big, "CTF{big}", t0).unwrap();
        submit_flag(&db, &rules, user.id, small, "CTF{small}", t0 + Duration::minutes(1)).unwrap();
        submit_flag(&db, &rules, user.id, open, "nope", t0 + Duration::minutes(2)).unwrap();

        let progress = user_progress(&db, user.id).unwrap();
        assert_eq!(progress.username, "alice");
        assert_eq!(progress.score, 110);
        assert_eq!(progress.solved_count(), 2);
        assert_eq!(progress.solved[0].title, "Big");
        assert_eq!(progress.solved[1].title, "Small");

        assert_eq!(progress.attempted.len(), 1);
        assert_eq!(progress.attempted[0].challenge_id, open);
        assert_eq!(progress.attempted[0].attempts, 1);
        assert_eq!(progress.attempted[0].max_attempts, 3);
    }

    #[test]
    fn test_progress_unknown_user() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        assert!(matches!(user_progress(&db, 42), Err(GameError::UserNotFound(_))));
    }
}
