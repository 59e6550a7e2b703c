//! Renew strategy: composes renewal predicates.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::ports::{RenewPolicy, RenewalStats};

type Predicate = Arc<dyn Fn(&dyn RenewalStats) -> bool + Send + Sync>;

/// Ordered list of renewal predicates combined with OR.
///
/// An empty strategy renews whenever asked (eager renew). Each `with_*` call
/// appends one predicate and hands the strategy back, so a strategy is
/// composed once and then shared read-only:
///
/// ```ignore
/// let renew = RenewStrategy::new()
///     .with_age_limit(Duration::from_secs(65 * 60))
///     .with_error_limit(4);
/// ```
#[derive(Clone, Default)]
pub struct RenewStrategy {
    predicates: Vec<Predicate>,
}

impl RenewStrategy {
    /// Strategy with no predicates (renews every time).
    pub fn new() -> Self {
        Self::default()
    }

    /// Renew once the resource is at least `limit` old.
    pub fn with_age_limit(self, limit: Duration) -> Self {
        self.with_predicate(move |stats| stats.age() >= limit)
    }

    /// Renew once more than `limit` errors have been reported.
    pub fn with_error_limit(self, limit: u32) -> Self {
        self.with_predicate(move |stats| stats.error_count() > limit)
    }

    /// Renew once the resource has been leased more than `limit` times.
    pub fn with_usage_limit(self, limit: u64) -> Self {
        self.with_predicate(move |stats| stats.usage_count() > limit)
    }

    /// Append a custom predicate. It must be a pure function of `stats`.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&dyn RenewalStats) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl RenewPolicy for RenewStrategy {
    fn shall_renew(&self, stats: &dyn RenewalStats) -> bool {
        self.predicates.is_empty() || self.predicates.iter().any(|predicate| predicate(stats))
    }
}

impl fmt::Debug for RenewStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenewStrategy")
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubStats;
    use rstest::rstest;

    const ONE_HOUR: Duration = Duration::from_secs(60 * 60);

    #[test]
    fn empty_strategy_always_renews() {
        let strategy = RenewStrategy::new();
        assert!(strategy.is_empty());
        assert!(strategy.shall_renew(&StubStats::default()));
        assert!(strategy.shall_renew(&StubStats::default().with_errors(100)));
    }

    #[rstest]
    #[case::just_below(Duration::from_secs(59 * 60 + 59), false)]
    #[case::exactly(ONE_HOUR, true)]
    #[case::just_above(ONE_HOUR + Duration::from_secs(1), true)]
    fn age_limit_is_inclusive(#[case] age: Duration, #[case] expected: bool) {
        let strategy = RenewStrategy::new().with_age_limit(ONE_HOUR);
        assert_eq!(strategy.shall_renew(&StubStats::default().with_age(age)), expected);
    }

    #[rstest]
    #[case::above(5, true)]
    #[case::at_limit(4, false)]
    #[case::fresh(0, false)]
    fn error_limit_is_exclusive(#[case] errors: u32, #[case] expected: bool) {
        let strategy = RenewStrategy::new().with_error_limit(4);
        assert_eq!(
            strategy.shall_renew(&StubStats::default().with_errors(errors)),
            expected
        );
    }

    #[rstest]
    #[case::above(10, true)]
    #[case::at_limit(9, false)]
    fn usage_limit_is_exclusive(#[case] usage: u64, #[case] expected: bool) {
        let strategy = RenewStrategy::new().with_usage_limit(9);
        assert_eq!(
            strategy.shall_renew(&StubStats::default().with_usage(usage)),
            expected
        );
    }

    #[test]
    fn predicates_are_combined_with_or() {
        let strategy = RenewStrategy::new()
            .with_age_limit(ONE_HOUR)
            .with_error_limit(4)
            .with_usage_limit(9);
        assert_eq!(strategy.len(), 3);

        assert!(!strategy.shall_renew(&StubStats::default()));
        assert!(strategy.shall_renew(&StubStats::default().with_errors(5)));
        assert!(strategy.shall_renew(&StubStats::default().with_usage(10)));
        assert!(strategy.shall_renew(&StubStats::default().with_age(ONE_HOUR)));
    }

    #[test]
    fn composition_order_does_not_change_the_answer() {
        let forward = RenewStrategy::new().with_error_limit(4).with_usage_limit(9);
        let backward = RenewStrategy::new().with_usage_limit(9).with_error_limit(4);

        let samples = [
            StubStats::default(),
            StubStats::default().with_errors(5),
            StubStats::default().with_usage(10),
            StubStats::default().with_errors(5).with_usage(10),
        ];
        for stats in samples {
            assert_eq!(forward.shall_renew(&stats), backward.shall_renew(&stats));
        }
    }

    #[test]
    fn custom_predicate() {
        let strategy = RenewStrategy::new()
            .with_predicate(|stats| stats.error_count() > 0 && stats.usage_count() < 3);
        assert!(strategy.shall_renew(&StubStats::default().with_errors(1).with_usage(2)));
        assert!(!strategy.shall_renew(&StubStats::default().with_errors(1).with_usage(3)));
    }

    #[test]
    fn clones_share_predicates() {
        let strategy = RenewStrategy::new().with_error_limit(0);
        let copy = strategy.clone();
        assert_eq!(copy.len(), 1);
        assert!(copy.shall_renew(&StubStats::default().with_errors(1)));
        assert_eq!(format!("{strategy:?}"), "RenewStrategy { predicates: 1 }");
    }
}
