use std::{fmt::Display, str::FromStr};

use anyhow::{anyhow, bail};

const SECONDS_IN_MINUTE: u64 = 60;
const SECONDS_IN_HOUR: u64 = 60 * SECONDS_IN_MINUTE;
const SECONDS_IN_DAY: u64 = 24 * SECONDS_IN_HOUR;

/// Duration split into days, hours, minutes and seconds. Displayed as `1d 2h 3m 4s`, with leading
/// zero units left out (`1m 0s`, `5s`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Dhms {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Dhms {
    /// Fractions are dropped. Negative and non finite values count as zero.
    pub fn from_seconds(seconds: f64) -> Self {
        // NaN.max(0.) is 0, and the cast saturates infinity
        let total = seconds.max(0.).floor() as u64;
        Self::from_total(total)
    }

    pub fn from_total(total: u64) -> Self {
        Self {
            days: total / SECONDS_IN_DAY,
            hours: total % SECONDS_IN_DAY / SECONDS_IN_HOUR,
            minutes: total % SECONDS_IN_HOUR / SECONDS_IN_MINUTE,
            seconds: total % SECONDS_IN_MINUTE,
        }
    }

    /// Saturates at `u64::MAX` for hand built values that don't fit.
    pub fn total_seconds(&self) -> u64 {
        self.days
            .saturating_mul(SECONDS_IN_DAY)
            .saturating_add(self.hours.saturating_mul(SECONDS_IN_HOUR))
            .saturating_add(self.minutes.saturating_mul(SECONDS_IN_MINUTE))
            .saturating_add(self.seconds)
    }
}

impl Display for Dhms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.days > 0 {
            write!(
                f,
                "{}d {}h {}m {}s",
                self.days, self.hours, self.minutes, self.seconds
            )
        } else if self.hours > 0 {
            write!(f, "{}h {}m {}s", self.hours, self.minutes, self.seconds)
        } else if self.minutes > 0 {
            write!(f, "{}m {}s", self.minutes, self.seconds)
        } else {
            write!(f, "{}s", self.seconds)
        }
    }
}

impl FromStr for Dhms {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut total = 0u64;
        let mut parts = 0;
        for part in s.split_whitespace() {
            let Some(unit) = part.chars().last() else {
                continue;
            };
            let value = part[..part.len() - unit.len_utf8()]
                .parse::<u64>()
                .map_err(|e| anyhow!("Can't parse {part:?} in {s:?}: {e}"))?;
            let multiplier = match unit {
                'd' => SECONDS_IN_DAY,
                'h' => SECONDS_IN_HOUR,
                'm' => SECONDS_IN_MINUTE,
                's' => 1,
                _ => bail!("Unknown unit {unit:?} in {s:?}"),
            };
            total = value
                .checked_mul(multiplier)
                .and_then(|seconds| total.checked_add(seconds))
                .ok_or_else(|| anyhow!("Duration {s:?} doesn't fit into u64 seconds"))?;
            parts += 1;
        }
        if parts == 0 {
            bail!("Can't parse empty duration");
        }
        Ok(Dhms::from_total(total))
    }
}

/// Formatting used for every category display string.
pub fn format_dhms(seconds: f64) -> String {
    Dhms::from_seconds(seconds).to_string()
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{format_dhms, Dhms};

    #[test]
    fn test_hour_minute_second_decomposition() {
        let value = Dhms::from_seconds(3661.);
        assert_eq!(
            value,
            Dhms {
                days: 0,
                hours: 1,
                minutes: 1,
                seconds: 1
            }
        );
        assert_eq!(value.to_string(), "1h 1m 1s");
    }

    #[test]
    fn test_leading_zero_units_are_omitted() {
        assert_eq!(format_dhms(0.), "0s");
        assert_eq!(format_dhms(59.9), "59s");
        assert_eq!(format_dhms(60.), "1m 0s");
        assert_eq!(format_dhms(2. * 86400. + 5.), "2d 0h 0m 5s");
    }

    #[test]
    fn test_invalid_seconds_format_as_zero() {
        assert_eq!(format_dhms(-12.), "0s");
        assert_eq!(format_dhms(f64::NAN), "0s");
    }

    #[test]
    fn test_parse_recovers_formatted_total() -> Result<()> {
        for total in [0u64, 1, 59, 61, 3600, 3661, 86399, 86400, 1_000_000] {
            let parsed = format_dhms(total as f64).parse::<Dhms>()?;
            assert_eq!(parsed.total_seconds(), total);
        }
        Ok(())
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Dhms>().is_err());
        assert!("5x".parse::<Dhms>().is_err());
        assert!("h".parse::<Dhms>().is_err());
    }

    #[test]
    fn test_parse_rejects_overflowing_durations() {
        assert!("300000000000000d".parse::<Dhms>().is_err());
        assert!("18446744073709551615s 1s".parse::<Dhms>().is_err());
        assert_eq!(
            "18446744073709551615s".parse::<Dhms>().map(|d| d.total_seconds()).ok(),
            Some(u64::MAX)
        );
    }

    #[test]
    fn test_total_seconds_saturates() {
        let huge = Dhms {
            days: u64::MAX,
            hours: 1,
            minutes: 0,
            seconds: 0,
        };
        assert_eq!(huge.total_seconds(), u64::MAX);
    }
}
