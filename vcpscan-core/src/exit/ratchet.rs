//! Stop ratchet: a long position's stop may rise, never fall.

/// Tracks the protective stop level of a long position.
#[derive(Debug, Clone, PartialEq)]
pub struct StopRatchet {
    level: f64,
}

impl StopRatchet {
    pub fn new(initial_level: f64) -> Self {
        Self { level: initial_level }
    }

    /// Propose a new stop. Returns the level in force afterwards, which is
    /// the higher of the current level and `proposed`.
    ///
    /// ```
    /// use vcpscan_core::exit::StopRatchet;
    ///
    /// let mut ratchet = StopRatchet::new(93.0);
    /// assert_eq!(ratchet.apply(100.0), 100.0);
    /// assert_eq!(ratchet.apply(90.0), 100.0);
    /// ```
    pub fn apply(&mut self, proposed: f64) -> f64 {
        if proposed.is_finite() && proposed > self.level {
            self.level = proposed;
        }
        self.level
    }

    pub fn level(&self) -> f64 {
        self.level
    }
}
