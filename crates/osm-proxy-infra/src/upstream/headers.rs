//! Upstream rate-limit header parsing.
//!
//! Upstream reports its own budget as `x-ratelimit-limit`,
//! `x-ratelimit-remaining` and `x-ratelimit-reset`. The reset value is read
//! as epoch seconds when it looks like one, otherwise as seconds from now.
//! Anything unparseable is treated as if the headers were absent.

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};

use osm_proxy_core::domain::UpstreamRateLimit;

pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

// Smaller reset values are relative offsets; 10^9 is September 2001.
const EPOCH_THRESHOLD: i64 = 1_000_000_000;

#[derive(Debug)]
struct Malformed(&'static str);

/// Read upstream rate-limit metadata. `None` when absent or malformed.
pub fn parse_rate_limit(headers: &HeaderMap, now: DateTime<Utc>) -> Option<UpstreamRateLimit> {
    match try_parse(headers, now) {
        Ok(report) => report,
        Err(Malformed(header)) => {
            tracing::debug!(header, "Ignoring malformed upstream rate limit header");
            None
        }
    }
}

/// Seconds from a `retry-after` header given as delta-seconds.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    header_str(headers, RETRY_AFTER.as_str())?.parse().ok()
}

fn try_parse(headers: &HeaderMap, now: DateTime<Utc>) -> Result<Option<UpstreamRateLimit>, Malformed> {
    let Some(remaining) = header_str(headers, RATE_LIMIT_REMAINING) else {
        return Ok(None);
    };
    let remaining = remaining
        .parse::<u32>()
        .map_err(|_| Malformed(RATE_LIMIT_REMAINING))?;

    let limit = header_str(headers, RATE_LIMIT_LIMIT)
        .map(|raw| raw.parse::<u32>().map_err(|_| Malformed(RATE_LIMIT_LIMIT)))
        .transpose()?;

    let reset_at = header_str(headers, RATE_LIMIT_RESET)
        .map(|raw| parse_reset(raw, now).ok_or(Malformed(RATE_LIMIT_RESET)))
        .transpose()?;

    Ok(Some(UpstreamRateLimit {
        limit,
        remaining,
        reset_at,
    }))
}

fn parse_reset(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let value = raw.parse::<i64>().ok().filter(|v| *v >= 0)?;
    if value >= EPOCH_THRESHOLD {
        DateTime::<Utc>::from_timestamp(value, 0)
    } else {
        now.checked_add_signed(TimeDelta::try_seconds(value)?)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reqwest::header::{HeaderName, HeaderValue};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(name, value) in pairs {
            map.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        map
    }

    #[test]
    fn test_full_metadata_with_relative_reset() {
        let report = parse_rate_limit(
            &headers(&[
                ("x-ratelimit-limit", "1000"),
                ("x-ratelimit-remaining", "998"),
                ("x-ratelimit-reset", "120"),
            ]),
            now(),
        )
        .unwrap();

        assert_eq!(report.limit, Some(1000));
        assert_eq!(report.remaining, 998);
        assert_eq!(report.reset_at, Some(now() + TimeDelta::seconds(120)));
    }

    #[test]
    fn test_epoch_reset() {
        let report = parse_rate_limit(
            &headers(&[
                ("x-ratelimit-remaining", "5"),
                ("x-ratelimit-reset", "1725192000"),
            ]),
            now(),
        )
        .unwrap();

        assert_eq!(report.limit, None);
        assert_eq!(report.reset_at, DateTime::<Utc>::from_timestamp(1_725_192_000, 0));
    }

    #[test]
    fn test_absent_metadata() {
        assert!(parse_rate_limit(&HeaderMap::new(), now()).is_none());
        assert!(parse_rate_limit(&headers(&[("x-ratelimit-limit", "100")]), now()).is_none());
    }

    #[test]
    fn test_malformed_metadata_is_ignored() {
        for pairs in [
            &[("x-ratelimit-remaining", "lots")][..],
            &[("x-ratelimit-remaining", "-1")][..],
            &[("x-ratelimit-remaining", "5"), ("x-ratelimit-limit", "1e3")][..],
            &[("x-ratelimit-remaining", "5"), ("x-ratelimit-reset", "soon")][..],
            &[("x-ratelimit-remaining", "5"), ("x-ratelimit-reset", "-30")][..],
        ] {
            assert!(parse_rate_limit(&headers(pairs), now()).is_none(), "{pairs:?}");
        }
    }

    #[test]
    fn test_retry_after() {
        assert_eq!(parse_retry_after(&headers(&[("retry-after", "45")])), Some(45));
        assert_eq!(
            parse_retry_after(&headers(&[("retry-after", "Wed, 21 Oct 2015 07:28:00 GMT")])),
            None
        );
        assert_eq!(parse_retry_after(&HeaderMap::new()), None);
    }
}
