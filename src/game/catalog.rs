//! Challenge catalogue management
//!
//! Organizers author challenges one at a time or in bulk from JSON
//! challenge packs. Players only ever see active challenges.

use std::path::{Path, PathBuf};

use crate::auth::require_organizer;
use crate::db::{begin_write, queries, schema, Database};
use crate::models::challenge::{Challenge, ChallengeSummary, NewChallenge};
use crate::models::format_timestamp;
use crate::models::user::User;
use crate::GameError;

/// Add a single challenge. Returns the new challenge id.
pub fn create_challenge(db: &Database, actor: &User, input: &NewChallenge) -> Result<i64, GameError> {
    require_organizer(actor, "create challenges")?;
    let valid = input.validate()?;
    let created_at = format_timestamp(chrono::Utc::now());

    let id = db.with_connection(|conn| queries::insert_challenge(conn, &valid, &created_at))?;
    tracing::info!(challenge_id = id, title = %valid.title, by = %actor.username, "Challenge created");
    Ok(id)
}

/// Active challenges ordered by points, with the viewer's solve state
pub fn list_challenges(db: &Database, viewer: Option<i64>) -> Result<Vec<ChallengeSummary>, GameError> {
    let challenges = db.with_connection(|conn| queries::list_challenges(conn, viewer))?;
    Ok(challenges)
}

/// Fetch an active challenge
pub fn get_challenge(db: &Database, challenge_id: i64) -> Result<Challenge, GameError> {
    db.with_connection(|conn| queries::get_challenge(conn, challenge_id, false))?
        .ok_or(GameError::ChallengeNotFound(challenge_id))
}

/// Retire (`active = false`) or restore a challenge
pub fn set_challenge_active(
    db: &Database,
    actor: &User,
    challenge_id: i64,
    active: bool,
) -> Result<(), GameError> {
    require_organizer(actor, if active { "restore challenges" } else { "retire challenges" })?;

    let changed = db.with_connection(|conn| queries::set_challenge_active(conn, challenge_id, active))?;
    if !changed {
        return Err(GameError::ChallengeNotFound(challenge_id));
    }

    tracing::info!(challenge_id, active, by = %actor.username, "Challenge visibility changed");
    Ok(())
}

/// Insert the starter challenges into an empty catalogue
pub fn seed_sample_challenges(db: &Database) -> Result<usize, GameError> {
    let inserted = db.with_connection(schema::seed_sample_challenges)?;
    if inserted > 0 {
        tracing::info!("Seeded {} sample challenges", inserted);
    }
    Ok(inserted)
}

/// Collect the JSON files making up a challenge pack.
///
/// A file path is used as-is; a directory contributes every `*.json` file
/// directly inside it, in name order.
fn pack_files(path: &Path) -> Result<Vec<PathBuf>, GameError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(GameError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("challenge pack not found: {}", path.display()),
        )));
    }

    let pattern = path.join("*.json");
    let pattern = pattern.to_string_lossy();
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| GameError::Validation(format!("Invalid pack path: {}", e)))?
        .filter_map(|entry| match entry {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!("Skipping unreadable pack entry: {}", e);
                None
            }
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(GameError::Validation(format!(
            "no .json files found in {}",
            path.display()
        )));
    }
    Ok(files)
}

/// Read every challenge from a pack file or directory without importing
pub fn load_challenge_pack(path: &Path) -> Result<Vec<NewChallenge>, GameError> {
    let mut challenges = Vec::new();
    for file in pack_files(path)? {
        tracing::debug!("Reading challenge pack {}", file.display());
        let content = std::fs::read_to_string(&file)?;
        let entries: Vec<NewChallenge> = serde_json::from_str(&content).map_err(|e| {
            GameError::Validation(format!("{}: {}", file.display(), e))
        })?;
        challenges.extend(entries);
    }
    Ok(challenges)
}

/// Import a challenge pack. Either every challenge is imported or none is.
pub fn import_challenges(db: &Database, actor: &User, path: &Path) -> Result<usize, GameError> {
    require_organizer(actor, "import challenges")?;

    let entries = load_challenge_pack(path)?;
    let valid = entries
        .iter()
        .map(NewChallenge::validate)
        .collect::<Result<Vec<_>, _>>()?;
    let created_at = format_timestamp(chrono::Utc::now());

    db.with_connection(|conn| {
        let tx = begin_write(conn)?;
        for challenge in &valid {
            queries::insert_challenge(&tx, challenge, &created_at)?;
        }
        tx.commit()?;
        Ok::<_, GameError>(())
    })?;

    tracing::info!("Imported {} challenges from {}", valid.len(), path.display());
    Ok(valid.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth;
    use crate::models::challenge::{Category, ChallengeBuilder};

    fn setup() -> (Database, User, User) {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let admin = auth::register(&db, "admin", "secret1", true, 6).unwrap();
        let player = auth::register(&db, "player", "secret1", false, 6).unwrap();
        (db, admin, player)
    }

    #[test]
    fn test_create_requires_organizer() {
        let (db, admin, player) = setup();
        let input = ChallengeBuilder::new("Intro", "CTF{a}", 10).build();

        assert!(matches!(
            create_challenge(&db, &player, &input),
            Err(GameError::Forbidden(_))
        ));

        let id = create_challenge(&db, &admin, &input).unwrap();
        let challenge = get_challenge(&db, id).unwrap();
        assert_eq!(challenge.title, "Intro");
        assert_eq!(challenge.flag, "CTF{a}");
    }

    #[test]
    fn test_retire_and_restore() {
        let (db, admin, player) = setup();
        let id = create_challenge(&db, &admin, &ChallengeBuilder::new("Intro", "CTF{a}", 10).build())
            .unwrap();

        assert!(set_challenge_active(&db, &player, id, false).is_err());

        set_challenge_active(&db, &admin, id, false).unwrap();
        assert!(matches!(get_challenge(&db, id), Err(GameError::ChallengeNotFound(_))));
        assert!(list_challenges(&db, None).unwrap().is_empty());

        set_challenge_active(&db, &admin, id, true).unwrap();
        assert_eq!(list_challenges(&db, None).unwrap().len(), 1);

        assert!(matches!(
            set_challenge_active(&db, &admin, 999, true),
            Err(GameError::ChallengeNotFound(999))
        ));
    }

    #[test]
    fn test_import_directory_in_name_order() {
        let (db, admin, _) = setup();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.json"),
            r#"[{"title":"Second","description":"d","category":"web","flag":"CTF{b}","points":20}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"[{"title":"First","description":"d","category":"crypto","flag":"CTF{a}","points":20,"max_attempts":3}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(import_challenges(&db, &admin, dir.path()).unwrap(), 2);

        let list = list_challenges(&db, None).unwrap();
        assert_eq!(list[0].title, "First");
        assert_eq!(list[0].category, Category::Crypto);
        assert_eq!(list[0].max_attempts, 3);
        assert_eq!(list[1].title, "Second");
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let (db, admin, _) = setup();
        let dir = tempfile::tempdir().unwrap();
        let pack = dir.path().join("pack.json");
        std::fs::write(
            &pack,
            r#"[
                {"title":"Good","description":"d","category":"misc","flag":"CTF{g}","points":10},
                {"title":"Bad","description":"d","category":"misc","flag":"CTF{b}","points":-5}
            ]"#,
        )
        .unwrap();

        assert!(matches!(
            import_challenges(&db, &admin, &pack),
            Err(GameError::Validation(_))
        ));
        assert!(list_challenges(&db, None).unwrap().is_empty());
    }

    #[test]
    fn test_import_missing_path() {
        let (db, admin, _) = setup();
        let dir = tempfile::tempdir().unwrap();
        assert!(import_challenges(&db, &admin, &dir.path().join("missing.json")).is_err());
        // Empty directory has no packs
        assert!(matches!(
            import_challenges(&db, &admin, dir.path()),
            Err(GameError::Validation(_))
        ));
    }

    #[test]
    fn test_seed_sample_challenges() {
        let (db, _, _) = setup();
        let seeded = seed_sample_challenges(&db).unwrap();
        assert!(seeded > 0);
        assert_eq!(seed_sample_challenges(&db).unwrap(), 0);
        assert_eq!(list_challenges(&db, None).unwrap().len(), seeded);
    }
}
