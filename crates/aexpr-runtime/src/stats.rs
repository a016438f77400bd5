#![forbid(unsafe_code)]

/// Monotonic counters kept by a [`Reactor`](crate::Reactor).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReactorStats {
    /// Function runs, baselines included.
    pub evaluations: u64,
    /// Evaluations whose result differed from the previous value.
    pub notifications: u64,
    pub handler_calls: u64,
    /// Handlers that panicked and were isolated.
    pub handler_failures: u64,
    /// Property writes through [`Reactor::set`](crate::Reactor::set) or an
    /// assignment inside an expression.
    pub writes: u64,
    /// Calls to [`Reactor::check_all`](crate::Reactor::check_all).
    pub polls: u64,
}

impl ReactorStats {
    /// Counter-wise difference from an earlier snapshot.
    #[must_use]
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            evaluations: self.evaluations.saturating_sub(earlier.evaluations),
            notifications: self.notifications.saturating_sub(earlier.notifications),
            handler_calls: self.handler_calls.saturating_sub(earlier.handler_calls),
            handler_failures: self.handler_failures.saturating_sub(earlier.handler_failures),
            writes: self.writes.saturating_sub(earlier.writes),
            polls: self.polls.saturating_sub(earlier.polls),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_subtracts_fieldwise() {
        let before = ReactorStats {
            evaluations: 2,
            writes: 1,
            ..ReactorStats::default()
        };
        let after = ReactorStats {
            evaluations: 5,
            writes: 1,
            polls: 3,
            ..ReactorStats::default()
        };
        let delta = after.since(&before);
        assert_eq!(delta.evaluations, 3);
        assert_eq!(delta.writes, 0);
        assert_eq!(delta.polls, 3);
    }
}
