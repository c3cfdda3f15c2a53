// 🪙 Coin Accrual - one coin per interval while the game is in the foreground
//
// The anchor moves to "now" on every credit, never to anchor + interval,
// so a long gap between ticks pays out a single coin. Stopping drops the
// anchor; the next start counts a full interval again.

use crate::economy::CoinSink;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccrualSettings {
    pub interval_ms: i64,
    pub tick_ms: u64,
    pub amount: u32,
}

impl Default for AccrualSettings {
    fn default() -> Self {
        AccrualSettings {
            interval_ms: 30_000,
            tick_ms: 1_000,
            amount: 1,
        }
    }
}

/// Result of one tick, for the countdown display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub credited: u32,
    pub remaining_ms: i64,
}

impl TickOutcome {
    pub fn remaining_secs(&self) -> i64 {
        whole_secs(self.remaining_ms)
    }
}

/// Rounded down, like the countdown label
fn whole_secs(ms: i64) -> i64 {
    ms / 1000
}

#[derive(Debug)]
pub struct CoinAccrualScheduler {
    settings: AccrualSettings,
    anchor: Option<i64>,
}

impl CoinAccrualScheduler {
    pub fn new(settings: AccrualSettings) -> Self {
        CoinAccrualScheduler {
            settings,
            anchor: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.anchor.is_some()
    }

    /// Begin counting from `now`. Restarting an active scheduler resets the anchor.
    pub fn start(&mut self, now_ms: i64) {
        self.anchor = Some(now_ms);
        tracing::debug!(anchor = now_ms, "coin accrual started");
    }

    /// Halt accrual; partial progress is forfeited. No-op when already stopped.
    pub fn stop(&mut self) {
        if self.anchor.take().is_some() {
            tracing::debug!("coin accrual stopped");
        }
    }

    /// Credit the sink if a full interval has passed. None while stopped.
    pub fn tick<S: CoinSink + ?Sized>(
        &mut self,
        now_ms: i64,
        sink: &mut S,
    ) -> Result<Option<TickOutcome>> {
        let Some(anchor) = self.anchor else {
            return Ok(None);
        };

        let elapsed = now_ms - anchor;
        if elapsed >= self.settings.interval_ms {
            sink.credit_coins(self.settings.amount)?;
            self.anchor = Some(now_ms);
            tracing::info!(amount = self.settings.amount, elapsed, "accrued coins");

            return Ok(Some(TickOutcome {
                credited: self.settings.amount,
                remaining_ms: self.settings.interval_ms,
            }));
        }

        Ok(Some(TickOutcome {
            credited: 0,
            remaining_ms: self.settings.interval_ms - elapsed.max(0),
        }))
    }

    /// Time until the next coin without ticking
    pub fn remaining_ms(&self, now_ms: i64) -> Option<i64> {
        self.anchor.map(|anchor| {
            let elapsed = (now_ms - anchor).clamp(0, self.settings.interval_ms);
            self.settings.interval_ms - elapsed
        })
    }

    pub fn remaining_secs(&self, now_ms: i64) -> Option<i64> {
        self.remaining_ms(now_ms).map(whole_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Purse {
        coins: u32,
    }

    impl CoinSink for Purse {
        fn credit_coins(&mut self, amount: u32) -> Result<()> {
            self.coins += amount;
            Ok(())
        }
    }

    fn scheduler() -> CoinAccrualScheduler {
        CoinAccrualScheduler::new(AccrualSettings::default())
    }

    #[test]
    fn test_credit_after_full_interval() {
        let mut accrual = scheduler();
        let mut purse = Purse::default();
        accrual.start(0);

        for second in 1..30 {
            let outcome = accrual.tick(second * 1000, &mut purse).unwrap().unwrap();
            assert_eq!(outcome.credited, 0);
            assert_eq!(outcome.remaining_ms, 30_000 - second * 1000);
        }
        assert_eq!(purse.coins, 0);

        let outcome = accrual.tick(30_000, &mut purse).unwrap().unwrap();
        assert_eq!(outcome.credited, 1);
        assert_eq!(purse.coins, 1);
        assert_eq!(outcome.remaining_secs(), 30);
    }

    #[test]
    fn test_long_gap_pays_one_coin() {
        let mut accrual = scheduler();
        let mut purse = Purse::default();
        accrual.start(0);

        accrual.tick(10 * 60_000, &mut purse).unwrap();
        assert_eq!(purse.coins, 1);

        // Anchor moved to the tick time, not anchor + interval
        accrual.tick(10 * 60_000 + 29_999, &mut purse).unwrap();
        assert_eq!(purse.coins, 1);
        accrual.tick(10 * 60_000 + 30_000, &mut purse).unwrap();
        assert_eq!(purse.coins, 2);
    }

    #[test]
    fn test_stop_forfeits_progress() {
        let mut accrual = scheduler();
        let mut purse = Purse::default();
        accrual.start(0);
        accrual.tick(25_000, &mut purse).unwrap();

        accrual.stop();
        assert!(accrual.tick(40_000, &mut purse).unwrap().is_none());
        assert_eq!(purse.coins, 0);

        accrual.start(40_000);
        accrual.tick(69_999, &mut purse).unwrap();
        assert_eq!(purse.coins, 0);
        accrual.tick(70_000, &mut purse).unwrap();
        assert_eq!(purse.coins, 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut accrual = scheduler();
        accrual.stop();
        accrual.stop();
        assert!(!accrual.is_active());

        accrual.start(5);
        accrual.stop();
        accrual.stop();
        assert!(!accrual.is_active());
        assert_eq!(accrual.remaining_ms(100), None);
    }

    #[test]
    fn test_remaining_ms_clamped() {
        let mut accrual = scheduler();
        accrual.start(1_000);

        assert_eq!(accrual.remaining_ms(1_000), Some(30_000));
        assert_eq!(accrual.remaining_ms(11_000), Some(20_000));
        assert_eq!(accrual.remaining_ms(500_000), Some(0));
        // Clock stepped backwards
        assert_eq!(accrual.remaining_ms(0), Some(30_000));
    }

    #[test]
    fn test_remaining_secs_rounds_down() {
        let mut accrual = scheduler();
        assert_eq!(accrual.remaining_secs(0), None);

        accrual.start(0);
        assert_eq!(accrual.remaining_secs(0), Some(30));
        assert_eq!(accrual.remaining_secs(500), Some(29));
        assert_eq!(accrual.remaining_secs(29_999), Some(0));
    }
}
