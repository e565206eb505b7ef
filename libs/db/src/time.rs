use chrono::{DateTime, SubsecRound, Utc};

/// Current UTC time at microsecond precision, the finest resolution every
/// supported engine stores. Values taken here compare equal after a round trip.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn now_is_truncated_to_micros() {
        let now = now_utc();
        assert_eq!(now.nanosecond() % 1_000, 0);
    }
}
