//! Population builder

use crate::player::{Player, uniform};
use crate::profile::{ProfileCatalog, ProfileType};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Number of players per category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub normal: usize,
    pub high_roller: usize,
    pub occasional: usize,
    pub addictive: usize,
    pub bonus_hunter: usize,
    pub fraudster: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            normal: 40,
            high_roller: 3,
            occasional: 4,
            addictive: 1,
            bonus_hunter: 1,
            fraudster: 1,
        }
    }
}

impl PopulationConfig {
    pub fn count(&self, profile_type: ProfileType) -> usize {
        match profile_type {
            ProfileType::Normal => self.normal,
            ProfileType::HighRoller => self.high_roller,
            ProfileType::Occasional => self.occasional,
            ProfileType::Addictive => self.addictive,
            ProfileType::BonusHunter => self.bonus_hunter,
            ProfileType::Fraudster => self.fraudster,
        }
    }

    pub fn set(&mut self, profile_type: ProfileType, count: usize) {
        let slot = match profile_type {
            ProfileType::Normal => &mut self.normal,
            ProfileType::HighRoller => &mut self.high_roller,
            ProfileType::Occasional => &mut self.occasional,
            ProfileType::Addictive => &mut self.addictive,
            ProfileType::BonusHunter => &mut self.bonus_hunter,
            ProfileType::Fraudster => &mut self.fraudster,
        };
        *slot = count;
    }

    pub fn total(&self) -> usize {
        ProfileType::ALL.iter().map(|&t| self.count(t)).sum()
    }
}

/// Player id: `<category>_<index>_<8 hex chars>`
fn player_id<R: Rng + ?Sized>(profile_type: ProfileType, index: usize, rng: &mut R) -> String {
    let uuid = uuid::Builder::from_random_bytes(rng.random()).into_uuid();
    let simple = uuid.simple().to_string();
    format!("{}_{}_{}", profile_type.as_str(), index, &simple[..8])
}

/// Create every player in category order. Initial balances are drawn from
/// [0.5 x min deposit, 2 x max deposit].
pub fn build_population<R: Rng + ?Sized>(
    config: &PopulationConfig,
    catalog: &ProfileCatalog,
    rng: &mut R,
) -> Vec<Player> {
    let mut players = Vec::with_capacity(config.total());

    for profile_type in ProfileType::ALL {
        let count = config.count(profile_type);
        if count == 0 {
            continue;
        }

        let profile = catalog.get(profile_type);
        for i in 0..count {
            let id = player_id(profile_type, i, rng);
            let balance = uniform(rng, profile.min_deposit * 0.5, profile.max_deposit * 2.0);
            players.push(Player::new(id, profile.clone(), balance));
        }
        info!(profile = %profile_type, count, "Created players");
    }

    info!(total = players.len(), "Population ready");
    players
}
