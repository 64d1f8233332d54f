use nexus_catalog::SearchState;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Quiescence tracking for search input.
///
/// Each recorded change replaces the pending state and pushes the deadline
/// to `last change + window`; only the state pending when the deadline
/// passes is handed out.
#[derive(Debug)]
pub struct DebounceState {
    window: Duration,
    pending: Option<SearchState>,
    last_change: Option<Instant>,
    changes: usize,
    forced_at: Option<Instant>,
}

impl DebounceState {
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            last_change: None,
            changes: 0,
            forced_at: None,
        }
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    pub fn record(&mut self, state: SearchState) {
        self.record_at(state, Instant::now());
    }

    pub fn record_at(&mut self, state: SearchState, at: Instant) {
        self.pending = Some(state);
        self.last_change = Some(at);
        self.changes += 1;
    }

    /// Run the pending pass without waiting for quiescence
    pub fn force_run(&mut self) {
        self.force_run_at(Instant::now());
    }

    /// Make the pending pass due at `at`, unless it is already due earlier
    pub fn force_run_at(&mut self, at: Instant) {
        if self.pending.is_some() {
            self.forced_at = Some(self.forced_at.map_or(at, |forced| forced.min(at)));
        }
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.pending.is_some()
    }

    /// Changes collapsed into the pending pass
    #[must_use]
    pub const fn pending_changes(&self) -> usize {
        self.changes
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref()?;
        let quiet = self.last_change.map(|last| last + self.window);
        match (self.forced_at, quiet) {
            (Some(forced), Some(quiet)) => Some(forced.min(quiet)),
            (forced, quiet) => forced.or(quiet),
        }
    }

    /// Whether the pass is due at `now`
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.next_deadline().is_some_and(|deadline| deadline <= now)
    }

    /// Hand out the pending state and reset
    pub fn take(&mut self) -> Option<SearchState> {
        let state = self.pending.take();
        self.last_change = None;
        self.changes = 0;
        self.forced_at = None;
        state
    }
}

impl Default for DebounceState {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_state_has_no_deadline() {
        let state = DebounceState::default();
        assert!(!state.is_dirty());
        assert!(state.next_deadline().is_none());
    }

    #[test]
    fn each_change_pushes_the_deadline() {
        let start = Instant::now();
        let mut state = DebounceState::new(Duration::from_millis(300));

        state.record_at(SearchState::query("f"), start);
        assert_eq!(state.next_deadline(), Some(start + Duration::from_millis(300)));

        let later = start + Duration::from_millis(120);
        state.record_at(SearchState::query("fi"), later);
        assert_eq!(state.next_deadline(), Some(later + Duration::from_millis(300)));
        assert!(!state.is_due(start + Duration::from_millis(300)));
        assert!(state.is_due(later + Duration::from_millis(300)));
    }

    #[test]
    fn burst_collapses_to_last_state() {
        let start = Instant::now();
        let mut state = DebounceState::new(Duration::from_millis(300));
        for (i, query) in ["f", "fi", "fig", "figm", "figma"].into_iter().enumerate() {
            state.record_at(
                SearchState::query(query),
                start + Duration::from_millis(50 * i as u64),
            );
        }
        assert_eq!(state.pending_changes(), 5);

        let taken = state.take().unwrap();
        assert_eq!(taken.query, "figma");
        assert!(!state.is_dirty());
        assert_eq!(state.pending_changes(), 0);
        assert!(state.take().is_none());
    }

    #[test]
    fn force_run_only_applies_when_dirty() {
        let mut state = DebounceState::new(Duration::from_secs(10));
        state.force_run();
        assert!(state.next_deadline().is_none());

        state.record(SearchState::query("notion"));
        state.force_run();
        assert!(state.is_due(Instant::now()));
    }

    #[test]
    fn forced_deadline_is_fixed_once_set() {
        let start = Instant::now();
        let mut state = DebounceState::new(Duration::from_secs(10));
        state.record_at(SearchState::query("notion"), start);

        let forced = start + Duration::from_millis(5);
        state.force_run_at(forced);
        assert_eq!(state.next_deadline(), Some(forced));
        assert_eq!(state.next_deadline(), Some(forced));
        assert!(state.is_due(forced));
        assert!(!state.is_due(start));

        state.record_at(SearchState::query("notion ai"), forced);
        assert_eq!(state.next_deadline(), Some(forced));

        state.take();
        assert!(state.next_deadline().is_none());
    }
}
