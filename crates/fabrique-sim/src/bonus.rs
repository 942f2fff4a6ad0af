//! Promotional bonuses and wagering requirements

use chrono::{DateTime, Duration, Utc};
use fabrique_core::event::round_money;
use serde::{Deserialize, Serialize};

/// Bet volume required per unit of bonus before it clears
pub const WAGERING_MULTIPLIER: f64 = 30.0;
/// Hours a granted bonus stays claimable
pub const BONUS_VALIDITY_HOURS: i64 = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusType {
    Welcome,
    DepositMatch,
    FreeSpins,
    Cashback,
    Reload,
}

impl BonusType {
    pub const ALL: [BonusType; 5] = [
        BonusType::Welcome,
        BonusType::DepositMatch,
        BonusType::FreeSpins,
        BonusType::Cashback,
        BonusType::Reload,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BonusType::Welcome => "welcome",
            BonusType::DepositMatch => "deposit_match",
            BonusType::FreeSpins => "free_spins",
            BonusType::Cashback => "cashback",
            BonusType::Reload => "reload",
        }
    }
}

impl std::fmt::Display for BonusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bonus {
    pub bonus_type: BonusType,
    pub amount: f64,
    pub wagering_requirement: f64,
    pub wagered: f64,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
}

impl Bonus {
    pub fn grant(bonus_type: BonusType, amount: f64, now: DateTime<Utc>) -> Self {
        let amount = round_money(amount);
        Self {
            bonus_type,
            amount,
            wagering_requirement: round_money(amount * WAGERING_MULTIPLIER),
            wagered: 0.0,
            expires_at: now + Duration::hours(BONUS_VALIDITY_HOURS),
            active: true,
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.wagered >= self.wagering_requirement
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Active, unexpired and not yet cleared
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.is_expired(now) && !self.is_cleared()
    }

    /// Count a bet toward the requirement. Returns true when this bet
    /// clears the bonus.
    pub fn record_wager(&mut self, bet: f64, now: DateTime<Utc>) -> bool {
        if !self.is_valid(now) {
            return false;
        }
        self.wagered = round_money(self.wagered + bet);
        if self.is_cleared() {
            self.active = false;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_terms() {
        let now = Utc::now();
        let bonus = Bonus::grant(BonusType::FreeSpins, 20.0, now);

        assert_eq!(bonus.wagering_requirement, 600.0);
        assert_eq!(bonus.expires_at - now, Duration::hours(72));
        assert!(bonus.is_valid(now));
    }

    #[test]
    fn test_clears_after_wagering() {
        let now = Utc::now();
        let mut bonus = Bonus::grant(BonusType::Cashback, 1.0, now);

        assert!(!bonus.record_wager(20.0, now));
        assert_eq!(bonus.wagered, 20.0);
        assert!(bonus.record_wager(10.0, now));
        assert!(!bonus.active);
        assert!(!bonus.is_valid(now));

        // Further bets no longer accrue
        assert!(!bonus.record_wager(5.0, now));
        assert_eq!(bonus.wagered, 30.0);
    }

    #[test]
    fn test_expired_bonus_is_invalid() {
        let now = Utc::now();
        let mut bonus = Bonus::grant(BonusType::Reload, 10.0, now);
        let later = now + Duration::hours(73);

        assert!(bonus.is_expired(later));
        assert!(!bonus.is_valid(later));
        assert!(!bonus.record_wager(50.0, later));
    }
}
