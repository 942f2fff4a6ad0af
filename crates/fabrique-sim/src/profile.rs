//! Behavior Profiles
//!
//! A profile is the immutable parameter set that drives every player of one
//! category: deposit and withdrawal habits, bet sizing, game preferences,
//! session length and bonus appetite. Profiles are built once and shared
//! through `Arc` by all players of the category.

use crate::bonus::BonusType;
use crate::error::ConfigError;
use crate::game::Game;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Player categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileType {
    Normal,
    HighRoller,
    Occasional,
    /// High frequency, long sessions, rarely withdraws
    Addictive,
    BonusHunter,
    /// Deposits and withdraws near-identical amounts with little play
    Fraudster,
}

impl ProfileType {
    pub const ALL: [ProfileType; 6] = [
        ProfileType::Normal,
        ProfileType::HighRoller,
        ProfileType::Occasional,
        ProfileType::Addictive,
        ProfileType::BonusHunter,
        ProfileType::Fraudster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileType::Normal => "normal",
            ProfileType::HighRoller => "high_roller",
            ProfileType::Occasional => "occasional",
            ProfileType::Addictive => "addictive",
            ProfileType::BonusHunter => "bonus_hunter",
            ProfileType::Fraudster => "fraudster",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for ProfileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorProfile {
    pub profile_type: ProfileType,

    pub min_deposit: f64,
    pub max_deposit: f64,
    /// Probability of a deposit at session start
    pub deposit_frequency: f64,

    pub min_withdrawal: f64,
    pub max_withdrawal: f64,
    /// Probability of a withdrawal at session end
    pub withdrawal_frequency: f64,

    pub games: Vec<Game>,
    pub min_bet: f64,
    pub max_bet: f64,
    /// Probability of playing in each session step
    pub play_frequency: f64,

    pub avg_session_length: f64,
    /// Spread of the session length draw (standard deviation)
    pub session_length_variance: f64,

    pub preferred_bonus: BonusType,
    /// Probability of choosing `preferred_bonus` over a uniform pick
    pub bonus_preference: f64,
    pub min_bonus: f64,
    pub max_bonus: f64,
    /// Probability of claiming a bonus in each session step
    pub bonus_frequency: f64,
}

impl BehaviorProfile {
    /// Built-in parameters for a category
    pub fn default_for(profile_type: ProfileType) -> Self {
        match profile_type {
            ProfileType::Normal => Self {
                profile_type,
                min_deposit: 50.0,
                max_deposit: 200.0,
                deposit_frequency: 0.1,
                min_withdrawal: 50.0,
                max_withdrawal: 300.0,
                withdrawal_frequency: 0.05,
                games: vec![Game::Slots, Game::Blackjack, Game::Roulette],
                min_bet: 1.0,
                max_bet: 10.0,
                play_frequency: 0.7,
                avg_session_length: 30.0,
                session_length_variance: 10.0,
                preferred_bonus: BonusType::DepositMatch,
                bonus_preference: 0.5,
                min_bonus: 10.0,
                max_bonus: 50.0,
                bonus_frequency: 0.05,
            },
            ProfileType::HighRoller => Self {
                profile_type,
                min_deposit: 500.0,
                max_deposit: 10_000.0,
                deposit_frequency: 0.15,
                min_withdrawal: 1_000.0,
                max_withdrawal: 15_000.0,
                withdrawal_frequency: 0.1,
                games: vec![Game::Blackjack, Game::Baccarat, Game::Poker],
                min_bet: 100.0,
                max_bet: 1_000.0,
                play_frequency: 0.6,
                avg_session_length: 50.0,
                session_length_variance: 20.0,
                preferred_bonus: BonusType::Reload,
                bonus_preference: 0.6,
                min_bonus: 100.0,
                max_bonus: 1_000.0,
                bonus_frequency: 0.05,
            },
            ProfileType::Occasional => Self {
                profile_type,
                min_deposit: 20.0,
                max_deposit: 100.0,
                deposit_frequency: 0.05,
                min_withdrawal: 30.0,
                max_withdrawal: 150.0,
                withdrawal_frequency: 0.1,
                games: vec![Game::Slots, Game::Roulette],
                min_bet: 0.5,
                max_bet: 5.0,
                play_frequency: 0.3,
                avg_session_length: 15.0,
                session_length_variance: 5.0,
                preferred_bonus: BonusType::Welcome,
                bonus_preference: 0.5,
                min_bonus: 5.0,
                max_bonus: 20.0,
                bonus_frequency: 0.03,
            },
            ProfileType::Addictive => Self {
                profile_type,
                min_deposit: 100.0,
                max_deposit: 500.0,
                deposit_frequency: 0.3,
                min_withdrawal: 50.0,
                max_withdrawal: 200.0,
                withdrawal_frequency: 0.02,
                games: vec![Game::Slots],
                min_bet: 5.0,
                max_bet: 50.0,
                play_frequency: 0.9,
                avg_session_length: 100.0,
                session_length_variance: 30.0,
                preferred_bonus: BonusType::Cashback,
                bonus_preference: 0.6,
                min_bonus: 20.0,
                max_bonus: 100.0,
                bonus_frequency: 0.1,
            },
            ProfileType::BonusHunter => Self {
                profile_type,
                min_deposit: 50.0,
                max_deposit: 200.0,
                deposit_frequency: 0.2,
                min_withdrawal: 100.0,
                max_withdrawal: 500.0,
                withdrawal_frequency: 0.2,
                games: vec![Game::Slots, Game::Blackjack],
                min_bet: 1.0,
                max_bet: 20.0,
                play_frequency: 0.8,
                avg_session_length: 40.0,
                session_length_variance: 10.0,
                preferred_bonus: BonusType::FreeSpins,
                bonus_preference: 0.7,
                min_bonus: 20.0,
                max_bonus: 200.0,
                bonus_frequency: 0.4,
            },
            ProfileType::Fraudster => Self {
                profile_type,
                min_deposit: 200.0,
                max_deposit: 1_000.0,
                deposit_frequency: 0.4,
                min_withdrawal: 190.0,
                max_withdrawal: 950.0,
                withdrawal_frequency: 0.35,
                games: vec![Game::Blackjack, Game::Roulette],
                min_bet: 5.0,
                max_bet: 10.0,
                play_frequency: 0.4,
                avg_session_length: 10.0,
                session_length_variance: 5.0,
                preferred_bonus: BonusType::Welcome,
                bonus_preference: 0.8,
                min_bonus: 50.0,
                max_bonus: 200.0,
                bonus_frequency: 0.2,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidProfile {
            profile: self.profile_type.to_string(),
            reason,
        };

        if self.games.is_empty() {
            return Err(invalid("no games configured".to_string()));
        }

        let probabilities = [
            ("deposit_frequency", self.deposit_frequency),
            ("withdrawal_frequency", self.withdrawal_frequency),
            ("play_frequency", self.play_frequency),
            ("bonus_preference", self.bonus_preference),
            ("bonus_frequency", self.bonus_frequency),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid(format!("{} must be within [0, 1], got {}", name, p)));
            }
        }

        let ranges = [
            ("deposit", self.min_deposit, self.max_deposit),
            ("withdrawal", self.min_withdrawal, self.max_withdrawal),
            ("bet", self.min_bet, self.max_bet),
            ("bonus", self.min_bonus, self.max_bonus),
        ];
        for (name, min, max) in ranges {
            if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
                return Err(invalid(format!("{} range [{}, {}] is invalid", name, min, max)));
            }
        }

        if !self.avg_session_length.is_finite()
            || !self.session_length_variance.is_finite()
            || self.session_length_variance < 0.0
        {
            return Err(invalid("session length parameters must be finite, spread non-negative".to_string()));
        }

        Ok(())
    }
}

/// Shared profiles keyed by category
#[derive(Debug, Clone)]
pub struct ProfileCatalog {
    profiles: HashMap<ProfileType, Arc<BehaviorProfile>>,
}

impl ProfileCatalog {
    pub fn defaults() -> Self {
        let profiles = ProfileType::ALL
            .into_iter()
            .map(|t| (t, Arc::new(BehaviorProfile::default_for(t))))
            .collect();
        Self { profiles }
    }

    /// Defaults with the given profiles replacing their category
    pub fn with_overrides(overrides: &[BehaviorProfile]) -> Result<Self, ConfigError> {
        let mut catalog = Self::defaults();
        for profile in overrides {
            profile.validate()?;
            catalog
                .profiles
                .insert(profile.profile_type, Arc::new(profile.clone()));
        }
        Ok(catalog)
    }

    pub fn get(&self, profile_type: ProfileType) -> Arc<BehaviorProfile> {
        match self.profiles.get(&profile_type) {
            Some(profile) => Arc::clone(profile),
            None => Arc::new(BehaviorProfile::default_for(profile_type)),
        }
    }
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self::defaults()
    }
}
