use jiff::{SignedDuration, Timestamp};

/// Timestamp addition clamped to the representable range. Sentinel values
/// (`Timestamp::MIN` / `Timestamp::MAX`) stay sentinels instead of panicking.
pub(crate) fn ts_add(t: Timestamp, d: SignedDuration) -> Timestamp {
    t.checked_add(d).unwrap_or(if d.is_negative() {
        Timestamp::MIN
    } else {
        Timestamp::MAX
    })
}

pub(crate) fn ts_sub(t: Timestamp, d: SignedDuration) -> Timestamp {
    t.checked_sub(d).unwrap_or(if d.is_negative() {
        Timestamp::MAX
    } else {
        Timestamp::MIN
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturating_bounds() {
        assert_eq!(
            ts_add(Timestamp::MAX, SignedDuration::from_hours(1)),
            Timestamp::MAX
        );
        assert_eq!(
            ts_sub(Timestamp::MIN, SignedDuration::from_hours(1)),
            Timestamp::MIN
        );

        let t: Timestamp = Timestamp::from_second(1_000).unwrap();
        assert_eq!(
            ts_add(t, SignedDuration::from_secs(60)),
            Timestamp::from_second(1_060).unwrap()
        );
    }
}
