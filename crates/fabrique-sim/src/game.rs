//! Game outcome tables

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

const SLOTS_MULTIPLIERS: [f64; 8] = [1.5, 1.8, 2.0, 2.5, 3.0, 5.0, 10.0, 100.0];
const ROULETTE_MULTIPLIERS: [f64; 4] = [1.5, 2.0, 3.0, 36.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Game {
    Slots,
    Blackjack,
    Roulette,
    Poker,
    Baccarat,
}

impl Game {
    pub const ALL: [Game; 5] = [
        Game::Slots,
        Game::Blackjack,
        Game::Roulette,
        Game::Poker,
        Game::Baccarat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Game::Slots => "slots",
            Game::Blackjack => "blackjack",
            Game::Roulette => "roulette",
            Game::Poker => "poker",
            Game::Baccarat => "baccarat",
        }
    }

    pub fn win_probability(&self) -> f64 {
        match self {
            Game::Slots => 0.35,
            Game::Blackjack => 0.48,
            Game::Roulette => 0.47,
            Game::Poker => 0.40,
            Game::Baccarat => 0.45,
        }
    }

    /// Payout multiplier applied to the bet on a win
    pub fn draw_multiplier<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Game::Slots => SLOTS_MULTIPLIERS.choose(rng).copied().unwrap_or(2.0),
            Game::Blackjack => 2.0,
            Game::Roulette => ROULETTE_MULTIPLIERS.choose(rng).copied().unwrap_or(2.0),
            Game::Poker => rng.random_range(1.5..=5.0),
            Game::Baccarat => 1.95,
        }
    }
}

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
