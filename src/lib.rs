// Bingo Ledger - Core Library
// Game rules, per-user coin economy and persistence; used by the CLI and tests

pub mod error;
pub mod card;
pub mod win;
pub mod session;
pub mod codec;
pub mod clock;
pub mod db;
pub mod economy;
pub mod accrual;
pub mod controller;
pub mod config;

// Re-export commonly used types
pub use error::{GameError, GameResult};
pub use card::{
    Card, CardGenerator,
    column_range, CENTER, FREE, GRID_SIZE, MAX_NUMBER,
};
pub use win::{Line, MarkGrid, WinDetector};
pub use session::{GameSession, GameState, SessionState};
pub use codec::{decode, encode, EncodedGame};
pub use clock::{date_key, Clock, ManualClock, SystemClock};
pub use db::{
    SqliteStore, UserStore,
    setup_database, migrate_add_missing_columns, DEFAULT_STARTING_COINS,
};
pub use economy::{CoinSink, EconomyLedger, EconomyPolicy, EconomyState};
pub use accrual::{AccrualSettings, CoinAccrualScheduler, TickOutcome};
pub use controller::{
    DrawOutcome, Identity, SessionController, SessionView, GUEST_NAME,
};
pub use config::{Config, LogConfig, StoreConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
