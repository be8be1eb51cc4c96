//! Integration tests for a full game on a file-backed database

use std::path::Path;

use chrono::{Duration, Utc};
use minictf::auth;
use minictf::config::GameConfig;
use minictf::db;
use minictf::export::{self, ExportFormat};
use minictf::game;
use minictf::models::challenge::ChallengeBuilder;
use minictf::models::submission::SubmitOutcome;
use minictf::GameError;

const PACK: &str = "tests/fixtures/pack.json";

struct Setup {
    _dir: tempfile::TempDir,
    db_path: std::path::PathBuf,
    db: db::Database,
}

fn setup() -> Setup {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("nested").join("ctf_game.db");
    let db = db::open(&db_path).expect("open database");
    Setup {
        _dir: dir,
        db_path,
        db,
    }
}

#[test]
fn test_import_play_and_rank() {
    let s = setup();
    let rules = GameConfig::default();

    let admin = auth::register(&s.db, "admin", "secret1", true, 6).unwrap();
    let alice = auth::register(&s.db, "alice", "secret1", false, 6).unwrap();
    let bob = auth::register(&s.db, "bob", "secret1", false, 6).unwrap();

    let imported = game::import_challenges(&s.db, &admin, Path::new(PACK)).unwrap();
    assert_eq!(imported, 2);

    // Cheapest first
    let listed = game::list_challenges(&s.db, Some(alice.id)).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].title, "Hidden Header");
    assert_eq!(listed[1].title, "XOR Basics");
    let (header_id, xor_id) = (listed[0].id, listed[1].id);

    let now = Utc::now();
    let outcome = game::submit_flag(&s.db, &rules, alice.id, header_id, "  CTF{check_the_headers} ", now).unwrap();
    assert_eq!(outcome, SubmitOutcome::Correct { points: 50 });
    let outcome = game::submit_flag(&s.db, &rules, alice.id, xor_id, "CTF{xor_is_its_own_inverse}", now).unwrap();
    assert_eq!(outcome, SubmitOutcome::Correct { points: 150 });
    let outcome = game::submit_flag(&s.db, &rules, bob.id, header_id, "CTF{check_the_headers}", now).unwrap();
    assert!(outcome.is_correct());

    // Solving again is rejected and changes nothing
    assert!(matches!(
        game::submit_flag(&s.db, &rules, bob.id, header_id, "CTF{check_the_headers}", now),
        Err(GameError::AlreadySolved)
    ));

    let board = game::leaderboard(&s.db, None).unwrap();
    let names: Vec<&str> = board.iter().map(|e| e.username.as_str()).collect();
    assert_eq!(names, vec!["alice", "bob"]);
    assert_eq!(board[0].score, 200);
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[1].score, 50);

    let progress = game::user_progress(&s.db, alice.id).unwrap();
    assert_eq!(progress.solved_count(), 2);
    assert!(progress.attempted.is_empty());

    let summary = game::game_summary(&s.db).unwrap();
    assert_eq!(summary.players, 2);
    assert_eq!(summary.active_challenges, 2);
    assert_eq!(summary.total_points_available, 200);
    assert_eq!(summary.submissions, 3);
    assert_eq!(summary.correct_submissions, 3);
}

#[test]
fn test_lockout_across_reopen() {
    let s = setup();
    let rules = GameConfig::default();

    let admin = auth::register(&s.db, "admin", "secret1", true, 6).unwrap();
    let carol = auth::register(&s.db, "carol", "secret1", false, 6).unwrap();
    game::import_challenges(&s.db, &admin, Path::new(PACK)).unwrap();
    let xor_id = game::list_challenges(&s.db, None).unwrap()[1].id;

    let now = Utc::now();
    for _ in 0..2 {
        let outcome = game::submit_flag(&s.db, &rules, carol.id, xor_id, "CTF{guess}", now).unwrap();
        assert!(matches!(outcome, SubmitOutcome::Incorrect { attempts_left: Some(_) }));
    }
    let outcome = game::submit_flag(&s.db, &rules, carol.id, xor_id, "CTF{guess}", now).unwrap();
    assert!(matches!(outcome, SubmitOutcome::LockedOut { .. }));

    // The lock is stored, not held in memory
    let path = s.db_path.clone();
    drop(s.db);
    let reopened = db::open(&path).unwrap();

    assert!(matches!(
        game::submit_flag(&reopened, &rules, carol.id, xor_id, "CTF{xor_is_its_own_inverse}", now),
        Err(GameError::Locked { .. })
    ));

    let later = now + Duration::minutes(rules.lockout_minutes + 1);
    let outcome =
        game::submit_flag(&reopened, &rules, carol.id, xor_id, "CTF{xor_is_its_own_inverse}", later).unwrap();
    assert_eq!(outcome, SubmitOutcome::Correct { points: 150 });
}

#[test]
fn test_import_is_all_or_nothing() {
    let s = setup();
    let admin = auth::register(&s.db, "admin", "secret1", true, 6).unwrap();

    let pack_dir = tempfile::tempdir().unwrap();
    std::fs::copy(PACK, pack_dir.path().join("a_good.json")).unwrap();
    std::fs::write(
        pack_dir.path().join("b_bad.json"),
        r#"[{"title": "Broken", "description": "x", "category": "misc", "flag": "F", "points": 0}]"#,
    )
    .unwrap();

    assert!(matches!(
        game::import_challenges(&s.db, &admin, pack_dir.path()),
        Err(GameError::Validation(_))
    ));
    assert!(game::list_challenges(&s.db, None).unwrap().is_empty());

    std::fs::remove_file(pack_dir.path().join("b_bad.json")).unwrap();
    assert_eq!(game::import_challenges(&s.db, &admin, pack_dir.path()).unwrap(), 2);
}

#[test]
fn test_player_cannot_import() {
    let s = setup();
    let player = auth::register(&s.db, "player", "secret1", false, 6).unwrap();
    assert!(matches!(
        game::import_challenges(&s.db, &player, Path::new(PACK)),
        Err(GameError::Forbidden(_))
    ));
}

#[test]
fn test_export_leaderboard_csv() {
    let s = setup();
    let rules = GameConfig::default();
    let admin = auth::register(&s.db, "admin", "secret1", true, 6).unwrap();
    let dave = auth::register(&s.db, "dave", "secret1", false, 6).unwrap();
    game::import_challenges(&s.db, &admin, Path::new(PACK)).unwrap();
    let header_id = game::list_challenges(&s.db, None).unwrap()[0].id;
    game::submit_flag(&s.db, &rules, dave.id, header_id, "CTF{check_the_headers}", Utc::now()).unwrap();

    let out_dir = tempfile::tempdir().unwrap();
    let path = out_dir.path().join("leaderboard.csv");
    let entries = game::leaderboard(&s.db, None).unwrap();
    export::export_leaderboard(&entries, ExportFormat::Csv, &path).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let rows: Vec<export::ExportableLeaderboardEntry> = reader.deserialize().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].username, "dave");
    assert_eq!(rows[0].score, 50);
    assert_eq!(rows[0].solves, 1);
}

#[test]
fn test_concurrent_submissions_are_serialized() {
    let s = setup();
    let admin = auth::register(&s.db, "admin", "secret1", true, 6).unwrap();
    let challenge = ChallengeBuilder::new("Endless", "CTF{never}", 10).build();
    let challenge_id = game::create_challenge(&s.db, &admin, &challenge).unwrap();
    let players: Vec<i64> = ["erin", "frank"]
        .iter()
        .map(|name| auth::register(&s.db, name, "secret1", false, 6).unwrap().id)
        .collect();

    const ROUNDS: usize = 150;
    let handles: Vec<_> = players
        .iter()
        .map(|&player| {
            let path = s.db_path.clone();
            std::thread::spawn(move || {
                // Separate connection per thread, like separate processes
                let db = db::open(&path).unwrap();
                let rules = GameConfig::default();
                let mut failures = Vec::new();
                for _ in 0..ROUNDS {
                    if let Err(e) = game::submit_flag(&db, &rules, player, challenge_id, "wrong", Utc::now()) {
                        failures.push(e.to_string());
                    }
                }
                failures
            })
        })
        .collect();

    for handle in handles {
        let failures = handle.join().unwrap();
        assert!(failures.is_empty(), "submissions failed: {:?}", failures.first());
    }

    let summary = game::game_summary(&s.db).unwrap();
    assert_eq!(summary.submissions, (ROUNDS * players.len()) as i64);
    for &player in &players {
        let progress = game::user_progress(&s.db, player).unwrap();
        assert_eq!(progress.attempted[0].attempts, ROUNDS as i64);
    }
}
