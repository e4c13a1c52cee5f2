// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// unitmaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! Time parsing and the wall/monotonic timestamp pair.

use crate::error::*;
use nix::sys::time::TimeSpec;
use nix::time::{clock_gettime, ClockId};

/// USec infinity
pub const USEC_INFINITY: u64 = u64::MAX;

/// USec per Sec
pub const USEC_PER_SEC: u64 = 1_000_000;
/// USec per MSec
pub const USEC_PER_MSEC: u64 = 1_000;
/// NSec per USec
pub const NSEC_PER_USEC: u64 = 1_000;

/// USec per Minute
pub const USEC_PER_MINUTE: u64 = 60 * USEC_PER_SEC;
/// USec per Hour
pub const USEC_PER_HOUR: u64 = 60 * USEC_PER_MINUTE;
/// USec per Day
pub const USEC_PER_DAY: u64 = 24 * USEC_PER_HOUR;
/// USec per Week
pub const USEC_PER_WEEK: u64 = 7 * USEC_PER_DAY;

const TABLE: &[(&str, u64)] = &[
    ("seconds", USEC_PER_SEC),
    ("second", USEC_PER_SEC),
    ("sec", USEC_PER_SEC),
    ("minutes", USEC_PER_MINUTE),
    ("minute", USEC_PER_MINUTE),
    ("min", USEC_PER_MINUTE),
    ("msec", USEC_PER_MSEC),
    ("ms", USEC_PER_MSEC),
    ("m", USEC_PER_MINUTE),
    ("hours", USEC_PER_HOUR),
    ("hour", USEC_PER_HOUR),
    ("hr", USEC_PER_HOUR),
    ("h", USEC_PER_HOUR),
    ("days", USEC_PER_DAY),
    ("day", USEC_PER_DAY),
    ("d", USEC_PER_DAY),
    ("weeks", USEC_PER_WEEK),
    ("week", USEC_PER_WEEK),
    ("w", USEC_PER_WEEK),
    ("usec", 1),
    ("us", 1),
    ("s", USEC_PER_SEC),
];

fn extract_multiplier<'a>(p: &'a str, default_unit: u64) -> (&'a str, u64) {
    let trimmed = p.trim_start();
    for (suffix, usec) in TABLE {
        if let Some(rest) = trimmed.strip_prefix(suffix) {
            return (rest, *usec);
        }
    }
    (p, default_unit)
}

/// Parse a time span like "5s 500ms" into microseconds.
/// `default_unit` applies to numbers without a suffix.
pub fn parse_time(t: &str, default_unit: u64) -> Result<u64> {
    let mut p = t.trim();
    if p.is_empty() {
        return Err(Error::Invalid {
            what: "empty time string".to_string(),
        });
    }

    if let Some(rest) = p.strip_prefix("infinity") {
        if !rest.trim().is_empty() {
            return Err(Error::Invalid {
                what: t.to_string(),
            });
        }
        return Ok(USEC_INFINITY);
    }

    let mut usec: u64 = 0;
    let mut something = false;

    loop {
        p = p.trim_start();
        if p.is_empty() {
            if !something {
                return Err(Error::Invalid {
                    what: t.to_string(),
                });
            }
            break;
        }

        if p.starts_with('-') {
            return Err(Error::Invalid {
                what: t.to_string(),
            });
        }
        let body = p.strip_prefix('+').unwrap_or(p);

        let int_len = body.bytes().take_while(|b| b.is_ascii_digit()).count();
        let mut rest = &body[int_len..];
        let frac = if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = after_dot.bytes().take_while(|b| b.is_ascii_digit()).count();
            if frac_len == 0 {
                return Err(Error::Invalid {
                    what: t.to_string(),
                });
            }
            let frac = &after_dot[..frac_len];
            rest = &after_dot[frac_len..];
            frac
        } else {
            ""
        };
        if int_len == 0 && frac.is_empty() {
            return Err(Error::Invalid {
                what: t.to_string(),
            });
        }

        let (after_suffix, multiplier) = extract_multiplier(rest, default_unit);
        p = after_suffix;

        let integral: u64 = if int_len == 0 {
            0
        } else {
            body[..int_len].parse()?
        };
        if integral >= USEC_INFINITY / multiplier {
            return Err(Error::Invalid {
                what: format!("{} is out of range", t),
            });
        }
        usec = usec.saturating_add(integral * multiplier);

        let mut m = multiplier / 10;
        for b in frac.bytes() {
            usec = usec.saturating_add((b - b'0') as u64 * m);
            m /= 10;
        }

        something = true;
    }

    Ok(usec)
}

/// parse time to usec with seconds as the default unit
pub fn parse_sec(t: &str) -> Result<u64> {
    parse_time(t, USEC_PER_SEC)
}

fn timespec_to_usec(ts: TimeSpec) -> u64 {
    ts.tv_sec() as u64 * USEC_PER_SEC + ts.tv_nsec() as u64 / NSEC_PER_USEC
}

/// current CLOCK_REALTIME in usec
pub fn now_realtime() -> u64 {
    clock_gettime(ClockId::CLOCK_REALTIME).map_or(0, timespec_to_usec)
}

/// current CLOCK_MONOTONIC in usec
pub fn now_monotonic() -> u64 {
    clock_gettime(ClockId::CLOCK_MONOTONIC).map_or(0, timespec_to_usec)
}

/// convert a SystemTime to usec since the epoch
pub fn timespec_load(systime: std::time::SystemTime) -> u128 {
    match systime.duration_since(std::time::SystemTime::UNIX_EPOCH) {
        Ok(d) => d.as_micros(),
        Err(_) => USEC_INFINITY as u128,
    }
}

/// A wall-clock/monotonic pair taken at the same instant. The wall value
/// is for presentation, the monotonic one for arithmetic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DualTimestamp {
    /// CLOCK_REALTIME in usec
    pub realtime: u64,
    /// CLOCK_MONOTONIC in usec
    pub monotonic: u64,
}

impl DualTimestamp {
    /// take both clocks now
    pub fn now() -> Self {
        DualTimestamp {
            realtime: now_realtime(),
            monotonic: now_monotonic(),
        }
    }

    /// a timestamp is set once either clock moved away from zero
    pub fn is_set(&self) -> bool {
        self.realtime > 0 || self.monotonic > 0
    }

    /// "realtime monotonic" pair for serialization
    pub fn dump(&self) -> String {
        format!("{} {}", self.realtime, self.monotonic)
    }

    /// parse the output of `dump`
    pub fn parse(s: &str) -> Result<Self> {
        let mut it = s.split_whitespace();
        let realtime = it
            .next()
            .ok_or(Error::Invalid {
                what: s.to_string(),
            })?
            .parse()?;
        let monotonic = it
            .next()
            .ok_or(Error::Invalid {
                what: s.to_string(),
            })?
            .parse()?;
        Ok(DualTimestamp {
            realtime,
            monotonic,
        })
    }
}

/// The timestamps a unit keeps over its life cycle, advanced on every
/// state change.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitTimeStamp {
    pub state_change_timestamp: DualTimestamp,
    pub inactive_exit_timestamp: DualTimestamp,
    pub active_enter_timestamp: DualTimestamp,
    pub active_exit_timestamp: DualTimestamp,
    pub inactive_enter_timestamp: DualTimestamp,
    pub condition_timestamp: DualTimestamp,
    pub assert_timestamp: DualTimestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sec() {
        assert_eq!(parse_sec("5s").unwrap(), 5 * USEC_PER_SEC);
        assert_eq!(
            parse_sec("5s500ms").unwrap(),
            5 * USEC_PER_SEC + 500 * USEC_PER_MSEC
        );
        assert_eq!(
            parse_sec(" 5s 500ms  ").unwrap(),
            5 * USEC_PER_SEC + 500 * USEC_PER_MSEC
        );
        assert_eq!(
            parse_sec(" 5.5s  ").unwrap(),
            5 * USEC_PER_SEC + 500 * USEC_PER_MSEC
        );
        assert_eq!(parse_sec(" .22s ").unwrap(), 220 * USEC_PER_MSEC);
        assert_eq!(parse_sec("0.5min").unwrap(), 30 * USEC_PER_SEC);
        assert_eq!(parse_sec("2.5").unwrap(), 2500 * USEC_PER_MSEC);
        assert_eq!(parse_sec("23us").unwrap(), 23);
        assert_eq!(parse_sec("infinity").unwrap(), USEC_INFINITY);
        assert_eq!(parse_sec(" infinity ").unwrap(), USEC_INFINITY);
        assert_eq!(parse_sec("+3.1s").unwrap(), 3100 * USEC_PER_MSEC);

        assert!(parse_sec(" xyz ").is_err());
        assert!(parse_sec("").is_err());
        assert!(parse_sec(" . ").is_err());
        assert!(parse_sec(" 5. ").is_err());
        assert!(parse_sec(".s ").is_err());
        assert!(parse_sec("-5s ").is_err());
        assert!(parse_sec(" infinity .7").is_err());
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("5", 1).unwrap(), 5);
        assert_eq!(parse_time("5", USEC_PER_MSEC).unwrap(), 5 * USEC_PER_MSEC);
        assert_eq!(parse_time("5s", 1).unwrap(), 5 * USEC_PER_SEC);
        assert_eq!(parse_time("5s", USEC_PER_MSEC).unwrap(), 5 * USEC_PER_SEC);
    }

    #[test]
    fn test_dual_timestamp() {
        let ts = DualTimestamp::now();
        assert!(ts.is_set());
        let parsed = DualTimestamp::parse(&ts.dump()).unwrap();
        assert_eq!(ts, parsed);
        assert!(!DualTimestamp::default().is_set());
    }
}
