// ⚠️ Error taxonomy
// Every game error is recoverable: fall back to a fresh card or decline the action

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    /// Load input that can never be a valid game (bad card values, bad history)
    #[error("invalid game state: {0}")]
    InvalidState(String),

    /// Persisted state that does not parse
    #[error("corrupt saved state: {0}")]
    CorruptState(String),

    #[error("all 75 numbers have been drawn")]
    Exhausted,

    #[error("not enough coins (need {needed}, have {available})")]
    InsufficientFunds { needed: u32, available: u32 },

    #[error("no more resets today (limit {limit})")]
    QuotaExceeded { limit: u32 },

    /// Draw attempted after a bingo; restart first
    #[error("game is over, restart to play again")]
    NotActive,

    #[error("store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl GameError {
    /// Policy rejections the player should see; everything else goes to the log
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            GameError::Exhausted
                | GameError::InsufficientFunds { .. }
                | GameError::QuotaExceeded { .. }
                | GameError::NotActive
        )
    }

    /// Short message for the status line
    pub fn user_message(&self) -> String {
        match self {
            GameError::Exhausted => "All numbers drawn!".to_string(),
            GameError::InsufficientFunds { .. } => "Not enough coins!".to_string(),
            GameError::QuotaExceeded { .. } => "No more resets today!".to_string(),
            GameError::NotActive => "BINGO already! Restart to play again.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type GameResult<T> = Result<T, GameError>;
