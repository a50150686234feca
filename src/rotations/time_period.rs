use chrono::{DateTime, Utc};
use std::ops::Deref;
use tracing::warn;

/// A half-open time interval `[start_time, end_time)`.
///
/// The temporal state (`started`/`active`/`ended`/`future`) is derived
/// against the wall clock at query time and never stored. Values are
/// immutable once constructed; `start_time <= end_time` is assumed from
/// upstream data, not enforced here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimePeriod {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl TimePeriod {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// Construct from a pair of ISO-8601 timestamps as delivered by the
    /// schedule feed. A string that does not parse is a fatal feed error.
    pub fn parse(start: &str, end: &str) -> Result<Self, chrono::ParseError> {
        Ok(Self {
            start_time: DateTime::parse_from_rfc3339(start)?.with_timezone(&Utc),
            end_time: DateTime::parse_from_rfc3339(end)?.with_timezone(&Utc),
        })
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn started(&self) -> bool {
        Utc::now() >= self.start_time
    }

    pub fn ended(&self) -> bool {
        Utc::now() >= self.end_time
    }

    pub fn active(&self) -> bool {
        self.started() && !self.ended()
    }

    pub fn future(&self) -> bool {
        !self.started()
    }
}

/// Anything that occupies a time period. Lets collections hold rotation
/// payloads and bare periods alike.
pub trait Timed {
    fn time_period(&self) -> &TimePeriod;
}

impl Timed for TimePeriod {
    fn time_period(&self) -> &TimePeriod {
        self
    }
}

/// An ordered sequence of optional timed entries, ascending by start time.
///
/// `None` slots mean "no entry of this category in that time slot" and keep
/// the index aligned with the sibling categories' collections.
#[derive(Debug, Clone)]
pub struct TimePeriodCollection<T: Timed> {
    periods: Vec<Option<T>>,
}

impl<T: Timed> TimePeriodCollection<T> {
    pub fn new(periods: Vec<Option<T>>) -> Self {
        Self { periods }
    }

    /// The first entry whose period is currently active, if any.
    ///
    /// Well-formed upstream data has non-overlapping periods, so at most one
    /// entry can match; should the feed ever violate that, the first match
    /// wins and the overlap is logged.
    pub fn active(&self) -> Option<&T> {
        let mut found = None;
        for entry in self.iter().flatten() {
            if entry.time_period().active() {
                if found.is_some() {
                    warn!("multiple simultaneously active periods in collection, keeping first");
                    break;
                }
                found = Some(entry);
            }
        }
        found
    }

    /// All entries that have not started yet, in ascending order, truncated
    /// to `limit` when given.
    pub fn future(&self, limit: Option<usize>) -> Vec<&T> {
        let upcoming = self
            .iter()
            .flatten()
            .filter(|entry| entry.time_period().future());
        match limit {
            Some(n) => upcoming.take(n).collect(),
            None => upcoming.collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Option<T>> {
        self.periods.iter()
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

/// A [`TimePeriodCollection`] that discards the leading run of already-ended
/// entries when it is built.
///
/// Instances are rebuilt wholesale on every feed refresh rather than swept in
/// the background, so pruning happens exactly once per refresh. Queries stay
/// correct either way since state is computed live against the clock, but the
/// window-boundary computation relies on the front entry being the soonest
/// active-or-future one. A leading `None` slot stops the pruning: absent
/// slots carry positional meaning and are not "ended".
#[derive(Debug, Clone)]
pub struct PoppingTimePeriodCollection<T: Timed>(TimePeriodCollection<T>);

impl<T: Timed> PoppingTimePeriodCollection<T> {
    pub fn new(mut periods: Vec<Option<T>>) -> Self {
        let elapsed = periods
            .iter()
            .take_while(|slot| matches!(slot, Some(entry) if entry.time_period().ended()))
            .count();
        periods.drain(..elapsed);
        Self(TimePeriodCollection::new(periods))
    }
}

impl<T: Timed> Deref for PoppingTimePeriodCollection<T> {
    type Target = TimePeriodCollection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn period(start_offset_secs: i64, end_offset_secs: i64) -> TimePeriod {
        let now = Utc::now();
        TimePeriod::new(
            now + Duration::seconds(start_offset_secs),
            now + Duration::seconds(end_offset_secs),
        )
    }

    #[test]
    fn exactly_one_state_holds() {
        for p in [period(-120, -60), period(-60, 60), period(60, 120)] {
            let states = [p.future(), p.active(), p.ended()];
            assert_eq!(states.iter().filter(|s| **s).count(), 1, "{:?}", p);
        }
    }

    #[test]
    fn parses_feed_timestamps() {
        let p = TimePeriod::parse("2024-03-01T00:00:00Z", "2024-03-01T02:00:00Z").unwrap();
        assert_eq!(p.end_time() - p.start_time(), Duration::hours(2));
        assert!(p.ended());
    }

    #[test]
    fn rejects_malformed_timestamps() {
        assert!(TimePeriod::parse("not a time", "2024-03-01T02:00:00Z").is_err());
    }

    #[test]
    fn active_skips_ended_and_unstarted() {
        let collection = TimePeriodCollection::new(vec![
            Some(period(-120, -60)),
            Some(period(-60, 60)),
            Some(period(60, 120)),
        ]);
        let active = collection.active().unwrap();
        assert!(active.started() && !active.ended());
    }

    #[test]
    fn active_is_none_between_rotations() {
        let collection = TimePeriodCollection::new(vec![
            Some(period(-120, -60)),
            None,
            Some(period(60, 120)),
        ]);
        assert!(collection.active().is_none());
    }

    #[test]
    fn future_is_ordered_and_truncated() {
        let collection = TimePeriodCollection::new(vec![
            Some(period(-60, 60)),
            Some(period(60, 120)),
            None,
            Some(period(120, 180)),
            Some(period(180, 240)),
        ]);
        let upcoming = collection.future(Some(2));
        assert_eq!(upcoming.len(), 2);
        assert!(upcoming.iter().all(|p| p.future()));
        assert!(upcoming[0].start_time() < upcoming[1].start_time());
        assert_eq!(collection.future(None).len(), 3);
    }

    #[test]
    fn queries_are_idempotent() {
        let collection = TimePeriodCollection::new(vec![
            Some(period(-3600, 3600)),
            Some(period(3600, 7200)),
        ]);
        let first = collection.active().map(|p| p.start_time());
        let second = collection.active().map(|p| p.start_time());
        assert_eq!(first, second);

        let upcoming_once: Vec<_> = collection.future(None).iter().map(|p| p.start_time()).collect();
        let upcoming_again: Vec<_> = collection.future(None).iter().map(|p| p.start_time()).collect();
        assert_eq!(upcoming_once, upcoming_again);
    }

    #[test]
    fn popping_discards_leading_ended_entries() {
        // First period fully elapsed, second still ahead.
        let collection = PoppingTimePeriodCollection::new(vec![
            Some(period(-10 * 60, -5 * 60)),
            Some(period(5 * 60, 10 * 60)),
        ]);
        assert_eq!(collection.len(), 1);
        assert!(collection.active().is_none());
        let upcoming = collection.future(Some(1));
        assert_eq!(upcoming.len(), 1);
        assert!(!upcoming[0].ended());
    }

    #[test]
    fn popping_stops_at_absent_slot() {
        let collection = PoppingTimePeriodCollection::new(vec![
            Some(period(-120, -60)),
            None,
            Some(period(-50, -10)),
            Some(period(60, 120)),
        ]);
        // The ended entry behind the None slot must survive.
        assert_eq!(collection.len(), 3);
        assert!(collection.iter().next().unwrap().is_none());
    }

    #[test]
    fn popping_front_is_never_ended() {
        let collection = PoppingTimePeriodCollection::new(vec![
            Some(period(-300, -200)),
            Some(period(-200, -100)),
            Some(period(-60, 60)),
            Some(period(60, 120)),
        ]);
        match collection.iter().next() {
            Some(Some(front)) => assert!(!front.ended()),
            Some(None) | None => {}
        };
    }

    #[test]
    fn popping_may_empty_the_collection() {
        let collection =
            PoppingTimePeriodCollection::new(vec![Some(period(-300, -200)), Some(period(-200, -100))]);
        assert!(collection.is_empty());
        assert!(collection.active().is_none());
        assert!(collection.future(None).is_empty());
    }
}
