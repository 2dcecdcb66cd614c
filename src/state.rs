//! Wander state shared by the drive loop and the obstacle reactions.

use std::time::{Duration, Instant};

/// The one mutable record of the behavior.
///
/// `tof_triggered` stays set from an obstacle trigger until the loop observes
/// the cool-down elapsed; no drive command is issued while it is set.
#[derive(Debug, Clone)]
pub struct WanderState {
    /// When the current random drive window started
    pub drive_started_at: Instant,

    /// Length of the current drive window in whole seconds
    pub time_in_drive_secs: u64,

    /// When the last obstacle reaction started
    pub tof_triggered_at: Instant,

    /// Obstacle reaction in cool-down
    pub tof_triggered: bool,

    /// Whether the five sensor subscriptions are registered
    pub subscriptions_active: bool,

    /// Bumped on every subscribe; events from older rounds are stale
    pub generation: u64,
}

impl WanderState {
    pub fn new(now: Instant, time_in_drive_secs: u64) -> Self {
        Self {
            drive_started_at: now,
            time_in_drive_secs,
            tof_triggered_at: now,
            tof_triggered: false,
            subscriptions_active: false,
            generation: 0,
        }
    }

    /// Start a new subscription round and return its generation
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// True if an event raised under `generation` belongs to the live subscriptions
    pub fn accepts_event(&self, generation: u64) -> bool {
        self.subscriptions_active && generation == self.generation
    }

    /// Enter cool-down
    pub fn trigger(&mut self, now: Instant) {
        self.tof_triggered_at = now;
        self.tof_triggered = true;
    }

    /// True once strictly more than `cooldown` has passed since the trigger
    pub fn cooldown_expired(&self, now: Instant, cooldown: Duration) -> bool {
        self.tof_triggered && now.saturating_duration_since(self.tof_triggered_at) > cooldown
    }

    /// True once strictly more than the drive window has passed and no reaction is pending
    pub fn drive_window_expired(&self, now: Instant) -> bool {
        !self.tof_triggered
            && now.saturating_duration_since(self.drive_started_at)
                > Duration::from_secs(self.time_in_drive_secs)
    }

    /// Start a new drive window
    pub fn restart_drive(&mut self, now: Instant, time_in_drive_secs: u64) {
        self.drive_started_at = now;
        self.time_in_drive_secs = time_in_drive_secs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let now = Instant::now();
        let state = WanderState::new(now, 5);
        assert!(!state.tof_triggered);
        assert!(!state.subscriptions_active);
        assert!(!state.cooldown_expired(now + Duration::from_secs(60), Duration::from_secs(4)));
    }

    #[test]
    fn test_accepts_only_current_generation() {
        let mut state = WanderState::new(Instant::now(), 5);
        let first = state.next_generation();
        assert!(!state.accepts_event(first));

        state.subscriptions_active = true;
        assert!(state.accepts_event(first));

        let second = state.next_generation();
        assert_eq!(second, first + 1);
        assert!(!state.accepts_event(first));
        assert!(state.accepts_event(second));
    }

    #[test]
    fn test_cooldown_is_strict() {
        let t0 = Instant::now();
        let mut state = WanderState::new(t0, 5);
        state.trigger(t0);

        let cooldown = Duration::from_secs(4);
        assert!(!state.cooldown_expired(t0 + Duration::from_millis(3990), cooldown));
        assert!(!state.cooldown_expired(t0 + cooldown, cooldown));
        assert!(state.cooldown_expired(t0 + Duration::from_millis(4001), cooldown));
    }

    #[test]
    fn test_drive_window_blocked_while_triggered() {
        let t0 = Instant::now();
        let mut state = WanderState::new(t0, 3);
        let later = t0 + Duration::from_secs(10);
        assert!(state.drive_window_expired(later));

        state.trigger(t0);
        assert!(!state.drive_window_expired(later));
    }

    #[test]
    fn test_restart_drive() {
        let t0 = Instant::now();
        let mut state = WanderState::new(t0, 3);
        let t1 = t0 + Duration::from_secs(4);
        state.restart_drive(t1, 8);
        assert_eq!(state.drive_started_at, t1);
        assert_eq!(state.time_in_drive_secs, 8);
        assert!(!state.drive_window_expired(t1 + Duration::from_secs(8)));
        assert!(state.drive_window_expired(t1 + Duration::from_millis(8001)));
    }
}
