//! Simulated Player
//!
//! A player owns a balance and lifetime counters and turns profile-driven
//! random draws into events. Every operation leaves the balance rounded to
//! cents and never negative.

use crate::bonus::{Bonus, BonusType};
use crate::game::Game;
use crate::profile::BehaviorProfile;
use chrono::{DateTime, Utc};
use fabrique_core::event::{Event, EventKind, format_timestamp, round_money};
use rand::Rng;
use rand::seq::IndexedRandom;
use std::sync::Arc;
use tracing::debug;

/// Lifetime counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerStats {
    pub total_deposits: f64,
    pub total_withdrawals: f64,
    pub total_bets: f64,
    pub total_wins: f64,
    pub total_losses: f64,
    pub bonuses_granted: u64,
    pub sessions: u64,
}

pub struct Player {
    id: String,
    profile: Arc<BehaviorProfile>,
    balance: f64,
    stats: PlayerStats,
    last_action: Option<DateTime<Utc>>,
    bonus: Option<Bonus>,
}

impl Player {
    pub fn new(id: impl Into<String>, profile: Arc<BehaviorProfile>, initial_balance: f64) -> Self {
        Self {
            id: id.into(),
            profile,
            balance: round_money(initial_balance).max(0.0),
            stats: PlayerStats::default(),
            last_action: None,
            bonus: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn profile(&self) -> &BehaviorProfile {
        &self.profile
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    pub fn last_action(&self) -> Option<DateTime<Utc>> {
        self.last_action
    }

    pub fn bonus(&self) -> Option<&Bonus> {
        self.bonus.as_ref()
    }

    pub fn has_valid_bonus(&self, now: DateTime<Utc>) -> bool {
        self.bonus.as_ref().is_some_and(|b| b.is_valid(now))
    }

    pub(crate) fn begin_session(&mut self) -> u64 {
        self.stats.sessions += 1;
        self.stats.sessions
    }

    fn touch(&mut self) -> (DateTime<Utc>, String) {
        let now = Utc::now();
        self.last_action = Some(now);
        (now, format_timestamp(now))
    }

    fn set_balance(&mut self, value: f64) {
        self.balance = round_money(value).max(0.0);
    }

    fn event(&self, kind: EventKind, timestamp: String) -> fabrique_core::EventBuilder {
        Event::builder(kind, timestamp, &self.id, self.profile.profile_type.as_str())
    }

    /// Deposit an amount drawn from the profile's deposit range
    pub fn deposit<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Event {
        let amount = round_money(uniform(rng, self.profile.min_deposit, self.profile.max_deposit));

        self.set_balance(self.balance + amount);
        self.stats.total_deposits = round_money(self.stats.total_deposits + amount);
        let (_, ts) = self.touch();

        debug!(player = %self.id, amount, "Deposit");

        self.event(EventKind::Deposit, ts)
            .money("amount", amount)
            .balance(self.balance)
            .build()
    }

    /// Withdraw up to the balance. Returns `None` when the balance is below
    /// the profile minimum.
    pub fn withdraw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Event> {
        if self.balance < self.profile.min_withdrawal {
            debug!(player = %self.id, balance = self.balance, "Withdrawal skipped, balance too low");
            return None;
        }

        let drawn = uniform(rng, self.profile.min_withdrawal, self.profile.max_withdrawal);
        let amount = round_money(drawn.min(self.balance));

        self.set_balance(self.balance - amount);
        self.stats.total_withdrawals = round_money(self.stats.total_withdrawals + amount);
        let (_, ts) = self.touch();

        debug!(player = %self.id, amount, "Withdrawal");

        Some(
            self.event(EventKind::Withdrawal, ts)
                .money("amount", amount)
                .balance(self.balance)
                .build(),
        )
    }

    /// Play one of the profile's preferred games
    pub fn play_preferred<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Event {
        let game = self
            .profile
            .games
            .choose(rng)
            .copied()
            .unwrap_or(Game::Slots);
        self.play(game, rng)
    }

    /// Place one bet on `game`. With nothing to bet, a failed
    /// `game_attempt` is returned and only the last action time moves.
    pub fn play<R: Rng + ?Sized>(&mut self, game: Game, rng: &mut R) -> Event {
        let ceiling = self.profile.max_bet.min(self.balance);
        let mut bet = round_money(uniform(rng, self.profile.min_bet, ceiling));
        if bet > self.balance {
            bet = self.balance;
        }

        if bet <= 0.0 {
            debug!(player = %self.id, game = %game, "Play attempted without funds");
            let (_, ts) = self.touch();
            return self
                .event(EventKind::GameAttempt, ts)
                .string("game", game.as_str())
                .string("status", "failed")
                .string("reason", "insufficient_funds")
                .balance(self.balance)
                .build();
        }

        let won = rng.random::<f64>() < game.win_probability();
        let (win_amount, net_change) = if won {
            let win_amount = round_money(bet * game.draw_multiplier(rng));
            self.set_balance(self.balance + win_amount - bet);
            self.stats.total_wins = round_money(self.stats.total_wins + win_amount);
            (win_amount, round_money(win_amount - bet))
        } else {
            self.set_balance(self.balance - bet);
            self.stats.total_losses = round_money(self.stats.total_losses + bet);
            (0.0, -bet)
        };
        self.stats.total_bets = round_money(self.stats.total_bets + bet);

        let (now, ts) = self.touch();
        if let Some(bonus) = self.bonus.as_mut() {
            if bonus.record_wager(bet, now) {
                debug!(player = %self.id, bonus = %bonus.bonus_type, "Bonus wagering cleared");
            }
        }

        let result = if won { "win" } else { "loss" };
        debug!(player = %self.id, game = %game, result, bet, win_amount, "Played");

        self.event(EventKind::GamePlay, ts)
            .string("game", game.as_str())
            .money("bet_amount", bet)
            .string("result", result)
            .money("win_amount", win_amount)
            .money("net_change", net_change)
            .balance(self.balance)
            .build()
    }

    /// Claim a new bonus unless a valid one is already running. The bonus
    /// amount is credited to the balance.
    pub fn claim_bonus<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Event> {
        let now = Utc::now();
        if self.has_valid_bonus(now) {
            return None;
        }

        let bonus_type = if rng.random::<f64>() < self.profile.bonus_preference {
            self.profile.preferred_bonus
        } else {
            BonusType::ALL
                .choose(rng)
                .copied()
                .unwrap_or(self.profile.preferred_bonus)
        };
        let amount = round_money(uniform(rng, self.profile.min_bonus, self.profile.max_bonus));
        let bonus = Bonus::grant(bonus_type, amount, now);

        self.set_balance(self.balance + bonus.amount);
        self.stats.bonuses_granted += 1;
        self.last_action = Some(now);

        debug!(player = %self.id, bonus = %bonus_type, amount, "Bonus claimed");

        let event = self
            .event(EventKind::BonusClaim, format_timestamp(now))
            .string("bonus_type", bonus_type.as_str())
            .money("amount", bonus.amount)
            .money("wagering_requirement", bonus.wagering_requirement)
            .string("expires_at", format_timestamp(bonus.expires_at))
            .balance(self.balance)
            .build();
        self.bonus = Some(bonus);
        Some(event)
    }
}

/// Uniform draw between `a` and `b` in either order
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, a: f64, b: f64) -> f64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if !(hi - lo).is_finite() || hi <= lo {
        return lo;
    }
    rng.random_range(lo..=hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileType;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn player(balance: f64) -> Player {
        Player::new(
            "normal_0_test",
            Arc::new(BehaviorProfile::default_for(ProfileType::Normal)),
            balance,
        )
    }

    #[test]
    fn test_deposit_within_range_and_exact_delta() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut p = player(10.0);

        for _ in 0..200 {
            let before = p.balance();
            let event = p.deposit(&mut rng);
            let amount = event.get_f64("amount").unwrap();

            assert!((50.0..=200.0).contains(&amount));
            assert!((p.balance() - (before + amount)).abs() < 1e-6);
            assert_eq!(event.get_f64("balance"), Some(p.balance()));
        }
        assert!(p.last_action().is_some());
    }

    #[test]
    fn test_withdraw_below_minimum_is_none() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut p = player(49.99);

        assert!(p.withdraw(&mut rng).is_none());
        assert_eq!(p.balance(), 49.99);
    }

    #[test]
    fn test_withdraw_never_exceeds_balance() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut p = player(60.0);

        let event = p.withdraw(&mut rng).unwrap();
        let amount = event.get_f64("amount").unwrap();
        assert!(amount >= 50.0 && amount <= 60.0);
        assert!((p.balance() - (60.0 - amount)).abs() < 1e-6);
        assert!(p.balance() >= 0.0);
    }

    #[test]
    fn test_play_with_zero_balance_fails() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut p = player(0.0);
        assert!(p.last_action().is_none());

        let event = p.play(Game::Slots, &mut rng);
        assert_eq!(event.kind(), Some(EventKind::GameAttempt));
        let last = p.last_action().map(format_timestamp);
        assert_eq!(last.as_deref(), event.timestamp());
        assert_eq!(event.get_str("status"), Some("failed"));
        assert_eq!(event.get_str("reason"), Some("insufficient_funds"));
        assert_eq!(p.balance(), 0.0);
        assert_eq!(p.stats().total_bets, 0.0);
    }

    #[test]
    fn test_play_keeps_balance_non_negative() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut p = player(25.0);

        for _ in 0..1_000 {
            let event = p.play_preferred(&mut rng);
            assert!(p.balance() >= 0.0);

            if event.kind() == Some(EventKind::GamePlay) {
                let bet = event.get_f64("bet_amount").unwrap();
                assert!(bet > 0.0);
                let net = event.get_f64("net_change").unwrap();
                match event.get_str("result") {
                    Some("loss") => assert_eq!(net, -bet),
                    Some("win") => assert!(net >= 0.0),
                    other => panic!("unexpected result {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_bet_clamped_to_balance() {
        let mut rng = StdRng::seed_from_u64(6);
        // Below the profile minimum bet of 1.0
        let mut p = player(0.5);

        let event = p.play(Game::Blackjack, &mut rng);
        assert_eq!(event.kind(), Some(EventKind::GamePlay));
        assert!(event.get_f64("bet_amount").unwrap() <= 0.5);
    }

    #[test]
    fn test_claim_bonus_credits_and_blocks_second_claim() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut p = player(100.0);

        let event = p.claim_bonus(&mut rng).unwrap();
        let amount = event.get_f64("amount").unwrap();
        assert!((10.0..=50.0).contains(&amount));
        assert!((p.balance() - (100.0 + amount)).abs() < 1e-6);
        assert_eq!(
            event.get_f64("wagering_requirement"),
            Some(round_money(amount * 30.0))
        );
        assert!(event.get_str("expires_at").is_some());

        assert!(p.claim_bonus(&mut rng).is_none());
        assert_eq!(p.stats().bonuses_granted, 1);
    }

    #[test]
    fn test_bets_accrue_toward_wagering() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut p = player(1_000.0);
        p.claim_bonus(&mut rng).unwrap();

        let mut wagered = 0.0;
        for _ in 0..5 {
            if let Some(bet) = p.play(Game::Baccarat, &mut rng).get_f64("bet_amount") {
                wagered += bet;
            }
        }
        let bonus = p.bonus().unwrap();
        assert!((bonus.wagered - wagered).abs() < 1e-6);
    }

    #[test]
    fn test_uniform_handles_inverted_and_empty_ranges() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let x = uniform(&mut rng, 5.0, 1.0);
            assert!((1.0..=5.0).contains(&x));
        }
        assert_eq!(uniform(&mut rng, 3.0, 3.0), 3.0);
    }
}
