// 🎮 Session Controller - binds player actions and app lifecycle to the game
//
// Registered players: every change is written to the store as it happens.
// Guests: in-memory game only, no coins, unlimited restarts, zero store calls.

use crate::accrual::{AccrualSettings, CoinAccrualScheduler, TickOutcome};
use crate::card::Card;
use crate::clock::Clock;
use crate::codec;
use crate::db::UserStore;
use crate::economy::{EconomyLedger, EconomyPolicy};
use crate::error::{GameError, GameResult};
use crate::session::{GameSession, SessionState};
use crate::win::{Line, MarkGrid};
use rand::rngs::StdRng;
use rand::Rng;
use std::rc::Rc;

/// Username the identity service reports when nobody is signed in
pub const GUEST_NAME: &str = "Guest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Guest,
    User(String),
}

impl Identity {
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        if name.is_empty() || name == GUEST_NAME {
            Identity::Guest
        } else {
            Identity::User(name.to_string())
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Identity::Guest => GUEST_NAME,
            Identity::User(name) => name,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest)
    }
}

/// What a successful draw did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawOutcome {
    pub number: u8,
    pub marked: Option<(usize, usize)>,
    pub won: bool,
    pub bonus: u32,
}

/// Value projection for the display; formatting is the caller's job
#[derive(Debug, Clone)]
pub struct SessionView {
    pub username: String,
    pub is_guest: bool,
    pub state: SessionState,
    pub card: Option<Card>,
    pub marks: MarkGrid,
    pub drawn: Vec<u8>,
    pub last_drawn: Option<u8>,
    pub coins: u32,
    pub wins: u32,
    /// None = unlimited (guest)
    pub resets_left: Option<u32>,
    /// None while accrual is stopped
    pub next_coin_secs: Option<i64>,
    pub winning_lines: Vec<Line>,
}

pub struct SessionController<R: Rng = StdRng> {
    identity: Identity,
    session: GameSession<R>,
    ledger: Option<EconomyLedger>,
    accrual: CoinAccrualScheduler,
    policy: EconomyPolicy,
    store: Rc<dyn UserStore>,
    clock: Rc<dyn Clock>,
}

impl<R: Rng> SessionController<R> {
    /// Session start: restore or create the player's game
    pub fn start(
        identity: Identity,
        policy: EconomyPolicy,
        accrual: AccrualSettings,
        store: Rc<dyn UserStore>,
        clock: Rc<dyn Clock>,
        rng: R,
    ) -> GameResult<Self> {
        let mut controller = SessionController {
            identity,
            session: GameSession::new(rng),
            ledger: None,
            accrual: CoinAccrualScheduler::new(accrual),
            policy,
            store,
            clock,
        };

        match controller.identity.clone() {
            Identity::Guest => {
                controller.session.initialize();
                tracing::info!("guest session started");
            }
            Identity::User(username) => controller.start_registered(&username)?,
        }

        Ok(controller)
    }

    fn start_registered(&mut self, username: &str) -> GameResult<()> {
        if !self.store.user_exists(username)? {
            self.store
                .insert_user(username, self.policy.starting_coins)?;
        }

        let mut ledger =
            EconomyLedger::open(username, self.policy, self.store.clone(), self.clock.clone())?;
        ledger.refresh_daily_quota(self.clock.today())?;
        self.ledger = Some(ledger);

        let restored = match codec::decode(&self.store.load_game(username)?) {
            Ok(Some(saved)) => match self.session.load(saved) {
                Ok(state) => {
                    tracing::info!(username, state = state.as_str(), "restored saved game");
                    true
                }
                Err(e) => {
                    tracing::warn!(username, error = %e, "saved game rejected, starting fresh");
                    false
                }
            },
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(username, error = %e, "saved game unreadable, starting fresh");
                false
            }
        };

        if !restored {
            self.session.initialize();
            self.save_game()?;
            tracing::info!(username, "new game created");
        }

        Ok(())
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    pub fn on_foreground(&mut self) {
        if self.ledger.is_some() {
            self.accrual.start(self.clock.now_millis());
        }
    }

    pub fn on_background(&mut self) -> GameResult<()> {
        self.accrual.stop();
        self.save_game()
    }

    /// Drive the coin timer; call once per tick interval
    pub fn tick(&mut self) -> GameResult<Option<TickOutcome>> {
        let now = self.clock.now_millis();
        match self.ledger.as_mut() {
            Some(ledger) => Ok(self.accrual.tick(now, ledger)?),
            None => Ok(None),
        }
    }

    // ========================================================================
    // PLAYER ACTIONS
    // ========================================================================

    pub fn draw(&mut self) -> GameResult<DrawOutcome> {
        let cost = self.policy.draw_cost;
        let available = self.ledger.as_ref().map_or(0, |l| l.balance());

        if self.ledger.is_none() || available < cost {
            return Err(GameError::InsufficientFunds {
                needed: cost,
                available,
            });
        }
        if self.session.is_exhausted() {
            return Err(GameError::Exhausted);
        }
        if self.session.state() != SessionState::Active {
            return Err(GameError::NotActive);
        }

        if let Some(ledger) = self.ledger.as_mut() {
            if !ledger.deduct(cost)? {
                return Err(GameError::InsufficientFunds {
                    needed: cost,
                    available,
                });
            }
        }

        let number = self.session.draw()?;
        let marked = self.session.card().and_then(|card| card.position_of(number));
        self.save_game()?;

        let won = self.session.state() == SessionState::Won;
        let mut bonus = 0;
        if won {
            if let Some(ledger) = self.ledger.as_mut() {
                ledger.credit(self.policy.win_bonus)?;
                ledger.record_win()?;
                bonus = self.policy.win_bonus;
            }
            self.save_game()?;
            tracing::info!(username = self.identity.name(), number, bonus, "BINGO");
        } else {
            tracing::debug!(username = self.identity.name(), number, ?marked, "drew number");
        }

        Ok(DrawOutcome {
            number,
            marked,
            won,
            bonus,
        })
    }

    pub fn restart(&mut self) -> GameResult<()> {
        if let Some(ledger) = self.ledger.as_mut() {
            if !ledger.consume_daily_reset(self.clock.today())? {
                tracing::info!(username = ledger.username(), "daily reset quota exhausted");
                return Err(GameError::QuotaExceeded {
                    limit: self.policy.daily_reset_limit,
                });
            }
        }

        self.session.restart();
        self.save_game()?;
        tracing::info!(username = self.identity.name(), "game restarted");
        Ok(())
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn session(&self) -> &GameSession<R> {
        &self.session
    }

    pub fn ledger(&self) -> Option<&EconomyLedger> {
        self.ledger.as_ref()
    }

    pub fn is_accruing(&self) -> bool {
        self.accrual.is_active()
    }

    pub fn view(&self) -> SessionView {
        let now = self.clock.now_millis();

        SessionView {
            username: self.identity.name().to_string(),
            is_guest: self.identity.is_guest(),
            state: self.session.state(),
            card: self.session.card().copied(),
            marks: self.session.marks(),
            drawn: self.session.drawn().to_vec(),
            last_drawn: self.session.last_drawn(),
            coins: self.ledger.as_ref().map_or(0, |l| l.balance()),
            wins: self.ledger.as_ref().map_or(0, |l| l.wins()),
            resets_left: self.ledger.as_ref().map(|l| l.resets_left()),
            next_coin_secs: self.accrual.remaining_secs(now),
            winning_lines: self.session.winning_lines(),
        }
    }

    // Guests are never written
    fn save_game(&self) -> GameResult<()> {
        if self.ledger.is_none() {
            return Ok(());
        }
        if let Some(snapshot) = self.session.snapshot() {
            self.store
                .save_game(self.identity.name(), &codec::encode(&snapshot))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::codec::EncodedGame;
    use crate::db::SqliteStore;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use std::cell::Cell;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn start(
        identity: Identity,
        store: Rc<dyn UserStore>,
        clock: Rc<ManualClock>,
    ) -> SessionController {
        SessionController::start(
            identity,
            EconomyPolicy::default(),
            AccrualSettings::default(),
            store,
            clock,
            StdRng::seed_from_u64(11),
        )
        .unwrap()
    }

    /// Counts every call so guest sessions can prove they never touch the store
    #[derive(Default)]
    struct CountingStore {
        calls: Cell<usize>,
    }

    impl CountingStore {
        fn hit(&self) {
            self.calls.set(self.calls.get() + 1);
        }
    }

    impl UserStore for CountingStore {
        fn user_exists(&self, _: &str) -> anyhow::Result<bool> {
            self.hit();
            Ok(false)
        }
        fn insert_user(&self, _: &str, _: u32) -> anyhow::Result<()> {
            self.hit();
            Ok(())
        }
        fn load_economy(&self, _: &str) -> anyhow::Result<crate::economy::EconomyState> {
            self.hit();
            Ok(crate::economy::EconomyState::new(20))
        }
        fn save_economy(&self, _: &str, _: &crate::economy::EconomyState) -> anyhow::Result<()> {
            self.hit();
            Ok(())
        }
        fn load_game(&self, _: &str) -> anyhow::Result<EncodedGame> {
            self.hit();
            Ok(EncodedGame::absent())
        }
        fn save_game(&self, _: &str, _: &EncodedGame) -> anyhow::Result<()> {
            self.hit();
            Ok(())
        }
    }

    #[test]
    fn test_identity_from_name() {
        assert_eq!(Identity::from_name("Guest"), Identity::Guest);
        assert_eq!(Identity::from_name("  "), Identity::Guest);
        assert_eq!(Identity::from_name("alice"), Identity::User("alice".into()));
    }

    #[test]
    fn test_guest_never_touches_store() {
        let store = Rc::new(CountingStore::default());
        let clock = Rc::new(ManualClock::new(0, day(1)));
        let mut controller = start(Identity::Guest, store.clone(), clock.clone());

        controller.on_foreground();
        assert!(!controller.is_accruing());

        assert!(matches!(
            controller.draw(),
            Err(GameError::InsufficientFunds { available: 0, .. })
        ));
        for _ in 0..10 {
            controller.restart().unwrap();
        }
        clock.advance_millis(60_000);
        assert!(controller.tick().unwrap().is_none());
        controller.on_background().unwrap();

        let view = controller.view();
        assert!(view.is_guest);
        assert_eq!(view.coins, 0);
        assert_eq!(view.resets_left, None);
        assert_eq!(store.calls.get(), 0);
    }

    #[test]
    fn test_new_user_gets_registered_and_saved() {
        let store = Rc::new(SqliteStore::open_in_memory().unwrap());
        let clock = Rc::new(ManualClock::new(0, day(1)));
        let controller = start(Identity::User("dana".into()), store.clone(), clock);

        assert!(store.user_exists("dana").unwrap());
        let saved = store.load_game("dana").unwrap();
        assert!(!saved.is_absent());
        assert_eq!(
            codec::decode(&saved).unwrap(),
            controller.session().snapshot()
        );

        // Quota rolled over to today on start
        let economy = store.load_economy("dana").unwrap();
        assert_eq!(economy.last_reset_date, "2024-07-01");
        assert_eq!(controller.view().resets_left, Some(5));
    }

    #[test]
    fn test_saved_game_is_restored() {
        let store = Rc::new(SqliteStore::open_in_memory().unwrap());
        let clock = Rc::new(ManualClock::new(0, day(1)));

        let mut first = start(Identity::User("erin".into()), store.clone(), clock.clone());
        first.draw().unwrap();
        first.draw().unwrap();
        first.on_background().unwrap();
        let before = first.session().snapshot();

        let second = SessionController::start(
            Identity::User("erin".into()),
            EconomyPolicy::default(),
            AccrualSettings::default(),
            store.clone(),
            clock,
            StdRng::seed_from_u64(999),
        )
        .unwrap();

        assert_eq!(second.session().snapshot(), before);
        assert_eq!(second.view().coins, 18);
        assert_eq!(second.view().drawn.len(), 2);
    }

    #[test]
    fn test_corrupt_saved_game_falls_back() {
        let store = Rc::new(SqliteStore::open_in_memory().unwrap());
        store.insert_user("finn", 20).unwrap();
        store
            .save_game(
                "finn",
                &EncodedGame {
                    card: "1,2,oops".to_string(),
                    drawn: String::new(),
                    marked: String::new(),
                },
            )
            .unwrap();

        let clock = Rc::new(ManualClock::new(0, day(1)));
        let controller = start(Identity::User("finn".into()), store.clone(), clock);

        assert_eq!(controller.session().state(), SessionState::Active);
        let saved = codec::decode(&store.load_game("finn").unwrap()).unwrap();
        assert_eq!(saved, controller.session().snapshot());
    }

    #[test]
    fn test_invalid_saved_card_falls_back() {
        let store = Rc::new(SqliteStore::open_in_memory().unwrap());
        store.insert_user("gus", 20).unwrap();
        let out_of_range = vec!["99"; 25].join(",");
        store
            .save_game(
                "gus",
                &EncodedGame {
                    card: out_of_range,
                    drawn: String::new(),
                    marked: String::new(),
                },
            )
            .unwrap();

        let clock = Rc::new(ManualClock::new(0, day(1)));
        let controller = start(Identity::User("gus".into()), store, clock);
        let card = controller.session().card().unwrap();
        assert!(card.is_free(2, 2));
        assert_ne!(card.get(0, 0), 99);
    }

    #[test]
    fn test_draw_until_bingo_pays_bonus() {
        let store = Rc::new(SqliteStore::open_in_memory().unwrap());
        let clock = Rc::new(ManualClock::new(0, day(1)));
        let mut controller = start(Identity::User("hana".into()), store.clone(), clock);

        // Plenty of coins so the only stop is the win
        controller.ledger.as_mut().unwrap().credit(100).unwrap();

        let mut draws = 0;
        let outcome = loop {
            let outcome = controller.draw().unwrap();
            draws += 1;
            if outcome.won {
                break outcome;
            }
        };

        assert_eq!(outcome.bonus, 50);
        let view = controller.view();
        assert_eq!(view.state, SessionState::Won);
        assert_eq!(view.coins, 120 - draws + 50);
        assert_eq!(view.wins, 1);
        assert!(!view.winning_lines.is_empty());

        let economy = store.load_economy("hana").unwrap();
        assert_eq!(economy.coins, view.coins);
        assert_eq!(economy.wins, 1);

        // No draws after the bingo, and no charge for trying
        assert!(matches!(controller.draw(), Err(GameError::NotActive)));
        assert_eq!(controller.view().coins, view.coins);
    }

    #[test]
    fn test_broke_player_cannot_draw() {
        let store = Rc::new(SqliteStore::open_in_memory().unwrap());
        let clock = Rc::new(ManualClock::new(0, day(1)));
        let mut controller = start(Identity::User("ivy".into()), store, clock);
        controller.ledger.as_mut().unwrap().deduct(20).unwrap();

        let before = controller.session().snapshot();
        assert!(matches!(
            controller.draw(),
            Err(GameError::InsufficientFunds { needed: 1, available: 0 })
        ));
        assert_eq!(controller.session().snapshot(), before);
    }

    #[test]
    fn test_exhausted_draw_costs_nothing() {
        let store = Rc::new(SqliteStore::open_in_memory().unwrap());
        store.insert_user("jo", 20).unwrap();

        let mut fresh = GameSession::new(StdRng::seed_from_u64(3));
        fresh.initialize();
        let all_drawn = (1..=75).map(|n| n.to_string()).collect::<Vec<_>>().join(",");
        let saved = EncodedGame {
            drawn: all_drawn,
            marked: String::new(),
            ..codec::encode(&fresh.snapshot().unwrap())
        };
        store.save_game("jo", &saved).unwrap();

        let clock = Rc::new(ManualClock::new(0, day(1)));
        let mut controller = start(Identity::User("jo".into()), store.clone(), clock);
        assert_eq!(controller.session().state(), SessionState::Active);
        assert_eq!(controller.view().drawn.len(), 75);

        assert!(matches!(controller.draw(), Err(GameError::Exhausted)));
        assert_eq!(controller.view().coins, 20);
        assert_eq!(store.load_economy("jo").unwrap().coins, 20);
    }

    #[test]
    fn test_accrual_follows_lifecycle() {
        let store = Rc::new(SqliteStore::open_in_memory().unwrap());
        let clock = Rc::new(ManualClock::new(1_000_000, day(1)));
        let mut controller = start(Identity::User("jo".into()), store.clone(), clock.clone());

        // Not foregrounded yet
        clock.advance_millis(30_000);
        assert!(controller.tick().unwrap().is_none());

        controller.on_foreground();
        assert_eq!(controller.view().next_coin_secs, Some(30));
        clock.advance_millis(30_000);
        let outcome = controller.tick().unwrap().unwrap();
        assert_eq!(outcome.credited, 1);
        assert_eq!(store.load_economy("jo").unwrap().coins, 21);

        controller.on_background().unwrap();
        assert_eq!(controller.view().next_coin_secs, None);
    }
}
