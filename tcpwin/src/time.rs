/*! Points in time for the retransmission timers.

The window engines never read a clock on their own. Every operation that depends on the age of a
retransmission timer takes the current [`Instant`] as an argument, relative time is expressed
with [`Duration`] from `core`.

[`Instant`]: struct.Instant.html
[`Duration`]: https://doc.rust-lang.org/core/time/struct.Duration.html
*/
use core::{fmt, ops};
pub use core::time::Duration;

/// A millisecond timestamp relative to an arbitrary epoch.
///
/// Only differences between two instants carry meaning. Negative values are allowed and lie
/// before the epoch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Instant {
    /// Milliseconds since the epoch.
    pub millis: i64,
}

impl Instant {
    /// The instant `millis` milliseconds after the epoch.
    pub fn from_millis<T: Into<i64>>(millis: T) -> Instant {
        Instant { millis: millis.into() }
    }

    /// The instant `secs` whole seconds after the epoch.
    pub fn from_secs<T: Into<i64>>(secs: T) -> Instant {
        Instant { millis: secs.into().saturating_mul(1000) }
    }

    /// Read the system clock, with the unix epoch as reference.
    #[cfg(feature = "std")]
    pub fn now() -> Instant {
        let since = ::std::time::SystemTime::now()
            .duration_since(::std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Instant::from_millis(since.as_millis() as i64)
    }

    /// The time passed from `earlier` to `self`.
    ///
    /// Zero if `earlier` is actually later than `self`. A timer started in the future has not
    /// aged at all.
    pub fn saturating_duration_since(self, earlier: Instant) -> Duration {
        let diff = self.millis.saturating_sub(earlier.millis);
        Duration::from_millis(diff.max(0) as u64)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (secs, millis) = (self.millis / 1000, (self.millis % 1000).abs());
        write!(f, "{}.{:03}s", secs, millis)
    }
}

impl ops::Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Instant {
        Instant { millis: self.millis + rhs.as_millis() as i64 }
    }
}

impl ops::AddAssign<Duration> for Instant {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl ops::Sub<Duration> for Instant {
    type Output = Instant;

    fn sub(self, rhs: Duration) -> Instant {
        Instant { millis: self.millis - rhs.as_millis() as i64 }
    }
}

/// The absolute distance between two instants.
impl ops::Sub<Instant> for Instant {
    type Output = Duration;

    fn sub(self, rhs: Instant) -> Duration {
        Duration::from_millis((self.millis - rhs.millis).abs() as u64)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let start = Instant::from_millis(4);
        assert_eq!(start + Duration::from_millis(6), Instant::from_millis(10));
        assert_eq!(Instant::from_millis(7) - Duration::from_millis(5), Instant::from_millis(2));
        assert_eq!(Instant::from_secs(2) - start, Duration::from_millis(1996));
        assert_eq!(start - Instant::from_secs(2), Duration::from_millis(1996));

        let mut clock = start;
        clock += Duration::from_secs(1);
        assert_eq!(clock, Instant::from_millis(1004));
    }

    #[test]
    fn display_pads_millis() {
        assert_eq!(Instant::from_millis(5674).to_string(), "5.674s");
        assert_eq!(Instant::from_millis(5000).to_string(), "5.000s");
        assert_eq!(Instant::from_millis(12).to_string(), "0.012s");
    }

    #[test]
    fn timer_age() {
        let start = Instant::from_millis(100);
        assert_eq!(Instant::from_millis(350).saturating_duration_since(start),
                   Duration::from_millis(250));
        assert_eq!(Instant::from_millis(50).saturating_duration_since(start),
                   Duration::from_millis(0));
    }
}
