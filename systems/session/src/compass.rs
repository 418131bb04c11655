use std::time::Duration;

use maze_hunt_core::{seconds, GameConfig};

/// Limited-use compass that points at the monster.
///
/// Showing the compass while the monster is on the grid burns its charge.
/// Once put away it waits for the charge delay and then recharges; a
/// compass that burned out completely recharges at its own rate without the
/// delay and cannot be used until full again.
#[derive(Clone, Debug, PartialEq)]
pub struct Compass {
    capacity: Duration,
    charge_delay: Duration,
    norm_multiplier: f64,
    burn_multiplier: f64,
    remaining: Duration,
    delay_remaining: Duration,
    burned_out: bool,
}

impl Compass {
    /// Creates a fully charged compass.
    #[must_use]
    pub fn new(config: &GameConfig) -> Self {
        let capacity = seconds(config.compass_time);
        let charge_delay = seconds(config.compass_charge_delay);
        Self {
            capacity,
            charge_delay,
            norm_multiplier: config.compass_charge_norm_multiplier,
            burn_multiplier: config.compass_charge_burn_multiplier,
            remaining: capacity,
            delay_remaining: charge_delay,
            burned_out: false,
        }
    }

    /// Charge left before the compass burns out.
    #[must_use]
    pub const fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Whether the compass ran dry and has not fully recharged since.
    #[must_use]
    pub const fn burned_out(&self) -> bool {
        self.burned_out
    }

    /// Charge left as a fraction of a full compass.
    #[must_use]
    pub fn charge_fraction(&self) -> f64 {
        if self.capacity.is_zero() {
            0.0
        } else {
            self.remaining.as_secs_f64() / self.capacity.as_secs_f64()
        }
    }

    /// Whether showing the compass would currently point anywhere.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.burned_out && !self.remaining.is_zero()
    }

    /// Advances the charge by `dt`.
    pub fn update(&mut self, shown: bool, monster_present: bool, dt: Duration) {
        if shown && monster_present && !self.burned_out {
            self.delay_remaining = self.charge_delay;
            self.remaining = self.remaining.saturating_sub(dt);
            if self.remaining.is_zero() {
                self.burned_out = true;
            }
            return;
        }
        if self.remaining >= self.capacity {
            return;
        }

        if self.burned_out || self.delay_remaining.is_zero() {
            let multiplier = if self.burned_out {
                self.burn_multiplier
            } else {
                self.norm_multiplier
            };
            let gained = if multiplier > 0.0 {
                seconds(dt.as_secs_f64() / multiplier)
            } else {
                self.capacity
            };
            self.remaining = self.remaining.saturating_add(gained).min(self.capacity);
            if self.remaining >= self.capacity {
                self.burned_out = false;
            }
        } else {
            self.delay_remaining = self.delay_remaining.saturating_sub(dt);
        }
    }

    /// Restores a full charge.
    pub fn reset(&mut self) {
        self.remaining = self.capacity;
        self.delay_remaining = self.charge_delay;
        self.burned_out = false;
    }
}
