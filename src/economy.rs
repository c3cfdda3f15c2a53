// 💰 Economy Ledger - coins, daily restart quota, win count for one account
//
// Every mutation is written to the store first and only then applied in memory.
// Guests never get a ledger: the controller handles them without one.

use crate::clock::{date_key, Clock};
use crate::db::{UserStore, DEFAULT_STARTING_COINS};
use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyState {
    pub coins: u32,
    pub daily_resets: u32,
    /// `YYYY-MM-DD`, empty until the first roll-over
    pub last_reset_date: String,
    pub wins: u32,
}

impl EconomyState {
    pub fn new(starting_coins: u32) -> Self {
        EconomyState {
            coins: starting_coins,
            daily_resets: 0,
            last_reset_date: String::new(),
            wins: 0,
        }
    }
}

/// Tunable amounts; defaults match the shipped game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyPolicy {
    pub starting_coins: u32,
    pub draw_cost: u32,
    pub win_bonus: u32,
    pub daily_reset_limit: u32,
}

impl Default for EconomyPolicy {
    fn default() -> Self {
        EconomyPolicy {
            starting_coins: DEFAULT_STARTING_COINS,
            draw_cost: 1,
            win_bonus: 50,
            daily_reset_limit: 5,
        }
    }
}

// ============================================================================
// LEDGER
// ============================================================================

/// Receives coins from the accrual scheduler
pub trait CoinSink {
    fn credit_coins(&mut self, amount: u32) -> Result<()>;
}

pub struct EconomyLedger {
    username: String,
    state: EconomyState,
    policy: EconomyPolicy,
    store: Rc<dyn UserStore>,
    clock: Rc<dyn Clock>,
}

impl EconomyLedger {
    /// Load the account's economy from the store
    pub fn open(
        username: &str,
        policy: EconomyPolicy,
        store: Rc<dyn UserStore>,
        clock: Rc<dyn Clock>,
    ) -> Result<Self> {
        let state = store.load_economy(username)?;
        Ok(EconomyLedger {
            username: username.to_string(),
            state,
            policy,
            store,
            clock,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn state(&self) -> &EconomyState {
        &self.state
    }

    pub fn balance(&self) -> u32 {
        self.state.coins
    }

    pub fn wins(&self) -> u32 {
        self.state.wins
    }

    /// False (and nothing written) when the balance is short
    pub fn deduct(&mut self, amount: u32) -> Result<bool> {
        if self.state.coins < amount {
            return Ok(false);
        }
        let next = EconomyState {
            coins: self.state.coins - amount,
            ..self.state.clone()
        };
        self.commit(next)?;
        Ok(true)
    }

    pub fn credit(&mut self, amount: u32) -> Result<()> {
        let next = EconomyState {
            coins: self.state.coins.saturating_add(amount),
            ..self.state.clone()
        };
        self.commit(next)
    }

    pub fn record_win(&mut self) -> Result<()> {
        let next = EconomyState {
            wins: self.state.wins.saturating_add(1),
            ..self.state.clone()
        };
        self.commit(next)
    }

    /// Reset the counter when the stored date is not `today`
    /// Returns true if a roll-over was written
    pub fn refresh_daily_quota(&mut self, today: NaiveDate) -> Result<bool> {
        let key = date_key(today);
        if self.state.last_reset_date == key {
            return Ok(false);
        }
        let next = EconomyState {
            daily_resets: 0,
            last_reset_date: key,
            ..self.state.clone()
        };
        self.commit(next)?;
        Ok(true)
    }

    /// Spend one restart from today's quota
    pub fn consume_daily_reset(&mut self, today: NaiveDate) -> Result<bool> {
        self.refresh_daily_quota(today)?;

        if self.state.daily_resets >= self.policy.daily_reset_limit {
            return Ok(false);
        }
        let next = EconomyState {
            daily_resets: self.state.daily_resets + 1,
            ..self.state.clone()
        };
        self.commit(next)?;
        Ok(true)
    }

    /// Restarts still available on the clock's current day
    pub fn resets_left(&self) -> u32 {
        if self.state.last_reset_date != date_key(self.clock.today()) {
            return self.policy.daily_reset_limit;
        }
        self.policy
            .daily_reset_limit
            .saturating_sub(self.state.daily_resets)
    }

    fn commit(&mut self, next: EconomyState) -> Result<()> {
        self.store.save_economy(&self.username, &next)?;
        self.state = next;
        Ok(())
    }
}

impl CoinSink for EconomyLedger {
    fn credit_coins(&mut self, amount: u32) -> Result<()> {
        self.credit(amount)
    }
}
