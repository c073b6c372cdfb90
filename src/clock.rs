use chrono::{DateTime, Utc};

/// Source of "now" for minutes-until-arrival calculations.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Whole minutes from `now` until `target`, rounded down (negative once overdue).
pub fn minutes_until(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (target - now).num_seconds().div_euclid(60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_minutes_until_floors() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(minutes_until(now + Duration::seconds(299), now), 4);
        assert_eq!(minutes_until(now + Duration::minutes(5), now), 5);
        assert_eq!(minutes_until(now, now), 0);
        assert_eq!(minutes_until(now - Duration::seconds(1), now), -1);
        assert_eq!(minutes_until(now - Duration::minutes(3), now), -3);
    }

    #[test]
    fn test_fixed_clock() {
        let instant = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
        assert_eq!(FixedClock(instant).now(), instant);
    }
}
