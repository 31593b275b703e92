//! Per-episode reward history and its rolling average

use serde::{Deserialize, Serialize};

/// Number of episodes in the rolling average window
pub const ROLLING_WINDOW: usize = 100;

/// Append-only record of episode rewards
///
/// The window is at least one episode, whichever way the history was built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SavedHistory")]
pub struct RewardHistory {
    rewards: Vec<f32>,
    window: usize,
}

/// Serialized form, validated before it becomes a [`RewardHistory`]
#[derive(Deserialize)]
struct SavedHistory {
    rewards: Vec<f32>,
    window: usize,
}

impl TryFrom<SavedHistory> for RewardHistory {
    type Error = String;

    fn try_from(saved: SavedHistory) -> Result<Self, Self::Error> {
        if saved.window == 0 {
            return Err("reward history window must be at least one episode".to_string());
        }
        Ok(Self {
            rewards: saved.rewards,
            window: saved.window,
        })
    }
}

impl Default for RewardHistory {
    fn default() -> Self {
        Self::new(ROLLING_WINDOW)
    }
}

impl RewardHistory {
    pub fn new(window: usize) -> Self {
        Self {
            rewards: Vec::new(),
            window: window.max(1),
        }
    }

    pub fn push(&mut self, reward: f32) {
        self.rewards.push(reward);
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    /// Mean of the last `window` rewards
    ///
    /// `None` until at least `window` episodes have been recorded.
    pub fn rolling_average(&self) -> Option<f32> {
        let n = self.rewards.len();
        if n < self.window {
            return None;
        }
        Some(mean(&self.rewards[n - self.window..]))
    }

    /// Mean of the `window` rewards that precede the most recent one
    ///
    /// Reproduces an off-by-one window that ignores the latest episode. With
    /// exactly `window` episodes recorded it averages the first `window - 1`.
    pub fn lagged_rolling_average(&self) -> Option<f32> {
        let n = self.rewards.len();
        if n < self.window || n < 2 {
            return None;
        }
        let end = n - 1;
        let start = end.saturating_sub(self.window);
        Some(mean(&self.rewards[start..end]))
    }

    /// `(episode_index, rolling_average)` for every episode where the window is full
    pub fn rolling_series(&self) -> Vec<(usize, f32)> {
        if self.rewards.len() < self.window {
            return Vec::new();
        }
        self.rewards
            .windows(self.window)
            .enumerate()
            .map(|(i, w)| (i + self.window - 1, mean(w)))
            .collect()
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_average_before_window_fills() {
        let mut history = RewardHistory::new(ROLLING_WINDOW);
        for i in 0..99 {
            history.push(i as f32);
            assert!(history.rolling_average().is_none());
        }
        history.push(99.0);
        assert_eq!(history.rolling_average(), Some(49.5));
    }

    #[test]
    fn test_average_uses_trailing_window() {
        let mut history = RewardHistory::new(3);
        for r in [100.0, 1.0, 2.0, 3.0] {
            history.push(r);
        }
        assert_eq!(history.rolling_average(), Some(2.0));
    }

    #[test]
    fn test_lagged_average_excludes_latest() {
        let mut history = RewardHistory::new(3);
        for r in [3.0, 6.0, 9.0] {
            history.push(r);
        }
        // only the first two episodes precede the latest one
        assert_eq!(history.lagged_rolling_average(), Some(4.5));

        history.push(1000.0);
        assert_eq!(history.lagged_rolling_average(), Some(6.0));
        assert!(history.rolling_average().unwrap() > 300.0);
    }

    #[test]
    fn test_rolling_series_indices() {
        let mut history = RewardHistory::new(2);
        for r in [1.0, 3.0, 5.0] {
            history.push(r);
        }
        assert_eq!(history.rolling_series(), vec![(1, 2.0), (2, 4.0)]);
        assert!(RewardHistory::new(5).rolling_series().is_empty());
    }

    #[test]
    fn test_default_uses_standard_window() {
        let mut history = RewardHistory::default();
        assert_eq!(history.window(), ROLLING_WINDOW);

        history.push(1.0);
        assert!(history.rolling_average().is_none());
        assert!(history.rolling_series().is_empty());
        assert_eq!(RewardHistory::new(0).window(), 1);
    }

    #[test]
    fn test_deserialize_validates_window() {
        let history: RewardHistory =
            serde_json::from_str(r#"{"rewards":[1.0,2.0,3.0],"window":2}"#).unwrap();
        assert_eq!(history.rolling_average(), Some(2.5));
        assert_eq!(history.rolling_series(), vec![(1, 1.5), (2, 2.5)]);

        assert!(serde_json::from_str::<RewardHistory>(r#"{"rewards":[],"window":0}"#).is_err());
        assert!(serde_json::from_str::<RewardHistory>(r#"{"rewards":[1.0]}"#).is_err());
    }
}
