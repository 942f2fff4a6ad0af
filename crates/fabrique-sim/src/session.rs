//! Session simulation
//!
//! One session is a bounded run of probabilistic steps for a single player:
//!
//! 1. deposit with the profile's deposit frequency
//! 2. draw a length from Normal(avg, spread), rounded, at least 1
//! 3. per step: a broke player deposits with doubled frequency or the
//!    session ends; then play with the play frequency and claim a bonus
//!    with the bonus frequency
//! 4. withdraw with the withdrawal frequency if the balance exceeds the
//!    minimum withdrawal
//!
//! Events come back in the order they happened.

use crate::player::Player;
use crate::profile::BehaviorProfile;
use fabrique_core::Event;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

/// Number of steps for one session
pub fn session_length<R: Rng + ?Sized>(profile: &BehaviorProfile, rng: &mut R) -> usize {
    let draw = match Normal::new(profile.avg_session_length, profile.session_length_variance) {
        Ok(normal) => normal.sample(rng),
        Err(_) => profile.avg_session_length,
    };
    let rounded = draw.round();
    if rounded.is_finite() && rounded > 1.0 {
        rounded as usize
    } else {
        1
    }
}

fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.random::<f64>() < p
}

pub fn simulate_session<R: Rng + ?Sized>(player: &mut Player, rng: &mut R) -> Vec<Event> {
    let session = player.begin_session();
    let mut events = Vec::new();

    let (deposit_frequency, play_frequency, bonus_frequency, withdrawal_frequency, min_withdrawal) = {
        let p = player.profile();
        (
            p.deposit_frequency,
            p.play_frequency,
            p.bonus_frequency,
            p.withdrawal_frequency,
            p.min_withdrawal,
        )
    };

    debug!(player = player.id(), session, "Session started");

    if chance(rng, deposit_frequency) {
        events.push(player.deposit(rng));
    }

    let length = session_length(player.profile(), rng);

    for _ in 0..length {
        if player.balance() <= 0.0 {
            if chance(rng, deposit_frequency * 2.0) {
                events.push(player.deposit(rng));
            } else {
                break;
            }
        }

        if chance(rng, play_frequency) {
            events.push(player.play_preferred(rng));
        }

        if chance(rng, bonus_frequency) {
            if let Some(event) = player.claim_bonus(rng) {
                events.push(event);
            }
        }
    }

    if player.balance() > min_withdrawal && chance(rng, withdrawal_frequency) {
        if let Some(event) = player.withdraw(rng) {
            events.push(event);
        }
    }

    debug!(
        player = player.id(),
        session,
        events = events.len(),
        balance = player.balance(),
        "Session finished"
    );

    events
}
