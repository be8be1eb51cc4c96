//! Account registration and password verification
//!
//! Passwords are stored as `sha256$<salt-hex>$<digest-hex>` where the digest
//! is SHA-256 over salt followed by password. Bare 64-character SHA-256 hex
//! digests written by earlier versions still verify and are upgraded on the
//! next successful login.

use sha2::{Digest, Sha256};

use crate::db::{begin_write, queries, Database};
use crate::models::format_timestamp;
use crate::models::user::User;
use crate::GameError;

const HASH_SCHEME: &str = "sha256";
const SALT_LEN: usize = 16;
const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;

/// Constant-time byte comparison to prevent timing side channels.
///
/// Returns true if both slices are equal in length and content.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

fn digest_hex(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> String {
    let salt: [u8; SALT_LEN] = rand::random();
    format!("{}${}${}", HASH_SCHEME, hex::encode(salt), digest_hex(&salt, password))
}

/// Check a password against a stored hash
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    match parts.as_slice() {
        [scheme, salt_hex, expected] if *scheme == HASH_SCHEME => match hex::decode(salt_hex) {
            Ok(salt) => constant_time_eq(digest_hex(&salt, password).as_bytes(), expected.as_bytes()),
            Err(_) => false,
        },
        [legacy] if is_legacy_hash(legacy) => {
            constant_time_eq(digest_hex(&[], password).as_bytes(), legacy.to_lowercase().as_bytes())
        }
        _ => false,
    }
}

/// Unsalted SHA-256 hex digest
fn is_legacy_hash(stored: &str) -> bool {
    stored.len() == 64 && stored.chars().all(|c| c.is_ascii_hexdigit())
}

/// Usernames are 3-32 characters of letters, digits, '_' or '-'
pub fn validate_username(username: &str) -> Result<(), GameError> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(GameError::InvalidUsername(format!(
            "must be {}-{} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(GameError::InvalidUsername(
            "only letters, digits, '_' and '-' are allowed".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str, min_length: usize) -> Result<(), GameError> {
    if password.chars().count() < min_length {
        return Err(GameError::WeakPassword(min_length));
    }
    Ok(())
}

/// Create a new account.
///
/// Organizer accounts can only be registered while no organizer exists;
/// later organizers are granted the role through [`promote`].
pub fn register(
    db: &Database,
    username: &str,
    password: &str,
    is_organizer: bool,
    min_password_length: usize,
) -> Result<User, GameError> {
    let username = username.trim();
    validate_username(username)?;
    validate_password(password, min_password_length)?;

    let password_hash = hash_password(password);
    let created_at = format_timestamp(chrono::Utc::now());

    db.with_connection(|conn| {
        // Holding the write lock keeps the organizer check and the insert atomic
        let tx = begin_write(conn)?;

        if is_organizer && queries::count_organizers(&tx)? > 0 {
            return Err(GameError::Forbidden(
                "an organizer already exists; ask them to promote you".to_string(),
            ));
        }

        let user_id = match queries::insert_user(&tx, username, &password_hash, is_organizer, &created_at) {
            Ok(id) => id,
            Err(e) if e.is_constraint_violation() => {
                return Err(GameError::UsernameTaken(username.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let user = queries::get_user_by_id(&tx, user_id)?
            .ok_or_else(|| GameError::UserNotFound(username.to_string()))?;
        tx.commit()?;

        tracing::info!(user_id, username, is_organizer, "Registered user");
        Ok(user)
    })
}

/// Verify credentials and return the account.
///
/// Unknown users and wrong passwords produce the same error.
pub fn login(db: &Database, username: &str, password: &str) -> Result<User, GameError> {
    db.with_connection(|conn| {
        let mut user = match queries::get_user_by_username(conn, username.trim())? {
            Some(user) => user,
            None => {
                tracing::debug!(username, "Login for unknown user");
                return Err(GameError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.password_hash) {
            tracing::warn!(username = %user.username, "Failed login");
            return Err(GameError::InvalidCredentials);
        }

        if is_legacy_hash(&user.password_hash) {
            tracing::info!(username = %user.username, "Upgrading legacy password hash");
            let upgraded = hash_password(password);
            queries::update_password_hash(conn, user.id, &upgraded)?;
            user.password_hash = upgraded;
        }

        Ok(user)
    })
}

/// Require the organizer role for an action
pub fn require_organizer(user: &User, action: &str) -> Result<(), GameError> {
    if user.is_organizer {
        Ok(())
    } else {
        Err(GameError::Forbidden(format!("only organizers can {}", action)))
    }
}

/// Grant the organizer role to `username`
pub fn promote(db: &Database, actor: &User, username: &str) -> Result<(), GameError> {
    require_organizer(actor, "promote users")?;

    let changed = db.with_connection(|conn| queries::set_organizer(conn, username.trim(), true))?;
    if !changed {
        return Err(GameError::UserNotFound(username.to_string()));
    }

    tracing::info!(username, by = %actor.username, "Granted organizer role");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22");
        assert!(hash.starts_with("sha256$"));
        assert!(!hash.contains("hunter22"));
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn test_verify_legacy_hash() {
        // sha256("password")
        let legacy = "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8";
        assert!(verify_password("password", legacy));
        assert!(!verify_password("Password", legacy));
    }

    #[test]
    fn test_verify_rejects_malformed_hashes() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "sha256$zz$00"));
        assert!(!verify_password("x", "md5$00$00"));
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("red-team").is_ok());
        assert!(validate_username("al").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
    }

    #[test]
    fn test_register_and_login() {
        let db = test_db();
        let user = register(&db, "alice", "secret1", false, 6).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.score, 0);
        assert!(!user.is_organizer);

        let logged_in = login(&db, "alice", "secret1").unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            login(&db, "alice", "wrong"),
            Err(GameError::InvalidCredentials)
        ));
        assert!(matches!(
            login(&db, "nobody", "secret1"),
            Err(GameError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_register_duplicate_username() {
        let db = test_db();
        register(&db, "alice", "secret1", false, 6).unwrap();
        let err = register(&db, "alice", "other12", false, 6).unwrap_err();
        assert!(matches!(err, GameError::UsernameTaken(name) if name == "alice"));
    }

    #[test]
    fn test_register_weak_password() {
        let db = test_db();
        assert!(matches!(
            register(&db, "alice", "123", false, 6),
            Err(GameError::WeakPassword(6))
        ));
    }

    #[test]
    fn test_login_upgrades_legacy_hash() {
        let db = test_db();
        let legacy = "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8";
        db.with_connection(|conn| queries::insert_user(conn, "old_timer", legacy, false, "t"))
            .unwrap();

        let user = login(&db, "old_timer", "password").unwrap();
        assert!(user.password_hash.starts_with("sha256$"));
        assert!(verify_password("password", &user.password_hash));

        let stored = db
            .with_connection(|conn| queries::get_user_by_username(conn, "old_timer"))
            .unwrap()
            .unwrap()
            .password_hash;
        assert!(stored.starts_with("sha256$"));
        assert!(login(&db, "old_timer", "password").is_ok());
    }

    #[test]
    fn test_require_organizer() {
        let db = test_db();
        let player = register(&db, "player", "secret1", false, 6).unwrap();
        let admin = register(&db, "admin", "secret1", true, 6).unwrap();

        assert!(matches!(
            require_organizer(&player, "add challenges"),
            Err(GameError::Forbidden(_))
        ));
        assert!(require_organizer(&admin, "add challenges").is_ok());
    }

    #[test]
    fn test_only_first_organizer_can_self_register() {
        let db = test_db();
        register(&db, "admin", "secret1", true, 6).unwrap();

        assert!(matches!(
            register(&db, "mallory", "secret1", true, 6),
            Err(GameError::Forbidden(_))
        ));
        // Rolled back: the name is still free for a player account
        let player = register(&db, "mallory", "secret1", false, 6).unwrap();
        assert!(!player.is_organizer);
    }

    #[test]
    fn test_promote() {
        let db = test_db();
        let admin = register(&db, "admin", "secret1", true, 6).unwrap();
        let player = register(&db, "player", "secret1", false, 6).unwrap();

        assert!(matches!(
            promote(&db, &player, "admin"),
            Err(GameError::Forbidden(_))
        ));
        assert!(matches!(
            promote(&db, &admin, "ghost"),
            Err(GameError::UserNotFound(_))
        ));

        promote(&db, &admin, "player").unwrap();
        assert!(login(&db, "player", "secret1").unwrap().is_organizer);
    }
}
