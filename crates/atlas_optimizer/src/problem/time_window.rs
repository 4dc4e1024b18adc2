use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

/// Half-open service window: service may start at any `t` with
/// `start <= t <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: Timestamp,
    end: Timestamp,
}

impl TimeWindow {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        debug_assert!(start <= end);
        TimeWindow { start, end }
    }

    pub fn whole_horizon() -> Self {
        TimeWindow {
            start: Timestamp::MIN,
            end: Timestamp::MAX,
        }
    }

    /// Convenience for tests and synthetic problems: seconds since the epoch.
    pub fn from_seconds(start: i64, end: i64) -> Self {
        TimeWindow::new(
            Timestamp::from_second(start).expect("time window start out of range"),
            Timestamp::from_second(end).expect("time window end out of range"),
        )
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn contains(&self, t: Timestamp) -> bool {
        self.start <= t && t <= self.end
    }

    /// Whether service could still start at or after `t`.
    pub fn is_open_at(&self, t: Timestamp) -> bool {
        t <= self.end
    }
}

/// Sorted, disjoint list of windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeWindows(Vec<TimeWindow>);

impl TimeWindows {
    pub fn whole_horizon() -> Self {
        TimeWindows(vec![TimeWindow::whole_horizon()])
    }

    pub fn from_vec(mut windows: Vec<TimeWindow>) -> Self {
        debug_assert!(!windows.is_empty());
        windows.sort_by_key(|tw| tw.start());
        TimeWindows(windows)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeWindow> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, rank: usize) -> &TimeWindow {
        &self.0[rank]
    }

    pub fn is_trivial(&self) -> bool {
        self.0.len() == 1 && self.0[0] == TimeWindow::whole_horizon()
    }

    /// Earliest window in which service can start when ready at `t`: the
    /// first window not yet closed, with the actual start pushed to the
    /// window opening when `t` is early. Returns the window rank and the
    /// service start.
    pub fn earliest_fit(&self, t: Timestamp) -> Option<(usize, Timestamp)> {
        self.0
            .iter()
            .position(|tw| tw.is_open_at(t))
            .map(|rank| (rank, t.max(self.0[rank].start())))
    }

    pub fn latest_end(&self) -> Timestamp {
        self.0
            .iter()
            .map(|tw| tw.end())
            .max()
            .unwrap_or(Timestamp::MAX)
    }

    pub fn earliest_start(&self) -> Timestamp {
        self.0
            .iter()
            .map(|tw| tw.start())
            .min()
            .unwrap_or(Timestamp::MIN)
    }

    /// Wait incurred when ready at `t`, zero when some window already
    /// contains `t`, `None` when every window is closed.
    pub fn waiting_duration(&self, t: Timestamp) -> Option<SignedDuration> {
        self.earliest_fit(t)
            .map(|(_, start)| start.duration_since(t))
    }
}

impl Default for TimeWindows {
    fn default() -> Self {
        Self::whole_horizon()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_earliest_fit_picks_first_open_window() {
        let windows = TimeWindows::from_vec(vec![
            TimeWindow::from_seconds(100, 200),
            TimeWindow::from_seconds(400, 500),
        ]);

        // Before the first window: wait until it opens.
        let (rank, start) = windows
            .earliest_fit(Timestamp::from_second(50).unwrap())
            .unwrap();
        assert_eq!(rank, 0);
        assert_eq!(start, Timestamp::from_second(100).unwrap());

        // Inside the first window: start immediately.
        let (rank, start) = windows
            .earliest_fit(Timestamp::from_second(150).unwrap())
            .unwrap();
        assert_eq!(rank, 0);
        assert_eq!(start, Timestamp::from_second(150).unwrap());

        // Between windows: the second one is picked.
        let (rank, _) = windows
            .earliest_fit(Timestamp::from_second(300).unwrap())
            .unwrap();
        assert_eq!(rank, 1);

        // Past every window.
        assert!(
            windows
                .earliest_fit(Timestamp::from_second(600).unwrap())
                .is_none()
        );
    }

    #[test]
    fn test_waiting_duration() {
        let windows = TimeWindows::from_vec(vec![TimeWindow::from_seconds(100, 200)]);

        assert_eq!(
            windows.waiting_duration(Timestamp::from_second(40).unwrap()),
            Some(SignedDuration::from_secs(60))
        );
        assert_eq!(
            windows.waiting_duration(Timestamp::from_second(150).unwrap()),
            Some(SignedDuration::ZERO)
        );
        assert_eq!(
            windows.waiting_duration(Timestamp::from_second(250).unwrap()),
            None
        );
    }
}
