use crate::codec::EncodedGame;
use crate::economy::EconomyState;
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Coins granted when an account is created
pub const DEFAULT_STARTING_COINS: u32 = 20;

// ============================================================================
// STORE CONTRACT
// ============================================================================

/// Synchronous per-user store, keyed by username
///
/// The game core only talks to this trait. `SqliteStore` is the real backend;
/// tests may substitute anything that keeps the same row semantics.
pub trait UserStore {
    fn user_exists(&self, username: &str) -> Result<bool>;

    /// Create the row with default economy and no saved game
    fn insert_user(&self, username: &str, starting_coins: u32) -> Result<()>;

    fn load_economy(&self, username: &str) -> Result<EconomyState>;
    fn save_economy(&self, username: &str, economy: &EconomyState) -> Result<()>;

    fn load_game(&self, username: &str) -> Result<EncodedGame>;
    fn save_game(&self, username: &str, game: &EncodedGame) -> Result<()>;
}

// ============================================================================
// SQLITE BACKEND
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {:?}", path))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        migrate_add_missing_columns(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn user_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl UserStore for SqliteStore {
    fn user_exists(&self, username: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_user(&self, username: &str, starting_coins: u32) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO users (username, wins, coins, daily_resets, last_reset_date)
                 VALUES (?1, 0, ?2, 0, '')",
                params![username, starting_coins],
            )
            .with_context(|| format!("Failed to create user {}", username))?;

        tracing::info!(username, starting_coins, "created account");
        Ok(())
    }

    fn load_economy(&self, username: &str) -> Result<EconomyState> {
        self.conn
            .query_row(
                "SELECT coins, daily_resets, last_reset_date, wins
                 FROM users WHERE username = ?1",
                params![username],
                |row| {
                    let coins: i64 = row.get(0)?;
                    let daily_resets: i64 = row.get(1)?;
                    let last_reset_date: Option<String> = row.get(2)?;
                    let wins: i64 = row.get(3)?;

                    Ok(EconomyState {
                        coins: to_count(coins),
                        daily_resets: to_count(daily_resets),
                        last_reset_date: last_reset_date.unwrap_or_default(),
                        wins: to_count(wins),
                    })
                },
            )
            .optional()?
            .ok_or_else(|| anyhow!("Unknown user: {}", username))
    }

    fn save_economy(&self, username: &str, economy: &EconomyState) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE users
             SET coins = ?1, daily_resets = ?2, last_reset_date = ?3, wins = ?4
             WHERE username = ?5",
            params![
                economy.coins,
                economy.daily_resets,
                economy.last_reset_date,
                economy.wins,
                username,
            ],
        )?;
        ensure_updated(updated, username)?;

        tracing::debug!(username, coins = economy.coins, resets = economy.daily_resets, "saved economy");
        Ok(())
    }

    fn load_game(&self, username: &str) -> Result<EncodedGame> {
        self.conn
            .query_row(
                "SELECT card_state, drawn_state, marked_state
                 FROM users WHERE username = ?1",
                params![username],
                |row| {
                    let card: Option<String> = row.get(0)?;
                    let drawn: Option<String> = row.get(1)?;
                    let marked: Option<String> = row.get(2)?;

                    Ok(EncodedGame {
                        card: card.unwrap_or_default(),
                        drawn: drawn.unwrap_or_default(),
                        marked: marked.unwrap_or_default(),
                    })
                },
            )
            .optional()?
            .ok_or_else(|| anyhow!("Unknown user: {}", username))
    }

    fn save_game(&self, username: &str, game: &EncodedGame) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE users
             SET card_state = ?1, drawn_state = ?2, marked_state = ?3
             WHERE username = ?4",
            params![game.card, game.drawn, game.marked, username],
        )?;
        ensure_updated(updated, username)?;

        tracing::debug!(username, drawn = %game.drawn, "saved game state");
        Ok(())
    }
}

/// Clamp a stored integer into the counter range
fn to_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn ensure_updated(rows: usize, username: &str) -> Result<()> {
    if rows == 0 {
        return Err(anyhow!("Unknown user: {}", username));
    }
    Ok(())
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Password column intentionally absent: credentials live with the identity service
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                wins INTEGER DEFAULT 0,
                coins INTEGER DEFAULT {},
                daily_resets INTEGER DEFAULT 0,
                last_reset_date TEXT DEFAULT '',
                card_state TEXT DEFAULT '',
                drawn_state TEXT DEFAULT '',
                marked_state TEXT DEFAULT '',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            DEFAULT_STARTING_COINS
        ),
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_users_username ON users(username)",
        [],
    )?;

    Ok(())
}

/// Columns added after the first release, with their definitions
fn later_columns() -> [(&'static str, String); 7] {
    [
        ("wins", "INTEGER DEFAULT 0".to_string()),
        ("coins", format!("INTEGER DEFAULT {}", DEFAULT_STARTING_COINS)),
        ("daily_resets", "INTEGER DEFAULT 0".to_string()),
        ("last_reset_date", "TEXT DEFAULT ''".to_string()),
        ("card_state", "TEXT DEFAULT ''".to_string()),
        ("drawn_state", "TEXT DEFAULT ''".to_string()),
        ("marked_state", "TEXT DEFAULT ''".to_string()),
    ]
}

/// Bring a database from an older release up to the current columns
/// Safe to run on every open; returns how many columns were added
pub fn migrate_add_missing_columns(conn: &Connection) -> Result<usize> {
    let mut stmt = conn.prepare("PRAGMA table_info(users)")?;
    let existing: Vec<String> = stmt
        .query_map([], |row| row.get(1))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut added = 0;
    for (name, definition) in later_columns() {
        if existing.iter().any(|col| col == name) {
            continue;
        }
        conn.execute(
            &format!("ALTER TABLE users ADD COLUMN {} {}", name, definition),
            [],
        )?;
        added += 1;
    }

    if added > 0 {
        tracing::info!(added, "migrated users table");
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_user(name: &str) -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_user(name, DEFAULT_STARTING_COINS).unwrap();
        store
    }

    #[test]
    fn test_new_user_defaults() {
        let store = store_with_user("alice");

        assert!(store.user_exists("alice").unwrap());
        assert!(!store.user_exists("bob").unwrap());

        let economy = store.load_economy("alice").unwrap();
        assert_eq!(economy, EconomyState::new(20));

        let game = store.load_game("alice").unwrap();
        assert!(game.is_absent());
    }

    #[test]
    fn test_duplicate_user_rejected() {
        let store = store_with_user("alice");
        assert!(store.insert_user("alice", 20).is_err());
        assert_eq!(store.user_count().unwrap(), 1);
    }

    #[test]
    fn test_economy_save_and_load() {
        let store = store_with_user("alice");
        let economy = EconomyState {
            coins: 63,
            daily_resets: 3,
            last_reset_date: "2024-06-01".to_string(),
            wins: 2,
        };

        store.save_economy("alice", &economy).unwrap();
        assert_eq!(store.load_economy("alice").unwrap(), economy);
    }

    #[test]
    fn test_game_save_and_load() {
        let store = store_with_user("alice");
        let game = EncodedGame {
            card: "1,2,3".to_string(),
            drawn: "4".to_string(),
            marked: "0,1".to_string(),
        };

        store.save_game("alice", &game).unwrap();
        assert_eq!(store.load_game("alice").unwrap(), game);
    }

    #[test]
    fn test_unknown_user_errors() {
        let store = SqliteStore::open_in_memory().unwrap();

        assert!(store.load_economy("ghost").is_err());
        assert!(store.load_game("ghost").is_err());
        assert!(store.save_economy("ghost", &EconomyState::new(20)).is_err());
        assert!(store.save_game("ghost", &EncodedGame::absent()).is_err());
    }

    #[test]
    fn test_migration_adds_state_columns() {
        let conn = Connection::open_in_memory().unwrap();

        // Shape of the very first release: credentials only
        conn.execute(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE,
                password TEXT
            )",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO users (username, password) VALUES ('old', 'x')",
            [],
        )
        .unwrap();

        setup_database(&conn).unwrap();
        assert_eq!(migrate_add_missing_columns(&conn).unwrap(), 7);
        assert_eq!(migrate_add_missing_columns(&conn).unwrap(), 0);

        let store = SqliteStore::from_connection(conn).unwrap();
        let economy = store.load_economy("old").unwrap();
        assert_eq!(economy.coins, DEFAULT_STARTING_COINS);
        assert_eq!(economy.daily_resets, 0);
        assert!(store.load_game("old").unwrap().is_absent());

        println!("✅ Migration test PASSED");
    }

    #[test]
    fn test_out_of_range_counters_are_clamped() {
        let store = store_with_user("alice");
        store
            .conn
            .execute(
                "UPDATE users SET coins = 5000000000, wins = -3 WHERE username = 'alice'",
                [],
            )
            .unwrap();

        let economy = store.load_economy("alice").unwrap();
        assert_eq!(economy.coins, u32::MAX);
        assert_eq!(economy.wins, 0);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bingo.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_user("carol", 20).unwrap();
            let mut economy = store.load_economy("carol").unwrap();
            economy.coins = 5;
            store.save_economy("carol", &economy).unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.load_economy("carol").unwrap().coins, 5);
    }
}
