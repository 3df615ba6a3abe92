//! Marker line parsing.
//!
//! A marker line opens an embedded plan. Two field grammars are in the wild:
//!
//! ```text
//! positional: 2024-03-09 14:02:07 UTC [4242] sales,report,psql,10.0.0.7 LOG:  duration: 12.500 ms  plan:
//! key-value:  2024-03-09 14:02:07 UTC [4242] user=report,db=sales,app=psql,client=10.0.0.7 LOG:  duration: 12.500 ms  plan:
//! ```
//!
//! The positional grammar is the default.

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::MarkerFault;
use crate::record::{ConnectionMetadata, MarkerLine};

/// Token whose presence turns a log line into a marker line.
pub const DEFAULT_MARKER_TOKEN: &str = "plan:";

/// date, time, zone, pid, descriptor, level, and at least one trailing token.
const POSITIONAL_MIN_FIELDS: usize = 7;

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"duration: ([0-9]+(?:\.[0-9]+)?)").unwrap());

static KV_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4}-[0-9]{2}-[0-9]{2}) ([0-9]{2}:[0-9]{2}:[0-9]{2})\S* [A-Z]+").unwrap()
});

/// Field grammar of a marker line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerLayout {
    /// `date time tz pid db,user,app,client level ...`
    #[default]
    Positional,
    /// `date time tz ... user=..,db=..,app=..,client=.. ... duration: N ...`
    KeyValue,
}

impl MarkerLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positional => "positional",
            Self::KeyValue => "key-value",
        }
    }
}

impl fmt::Display for MarkerLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarkerLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positional" => Ok(Self::Positional),
            "key-value" | "key_value" | "kv" => Ok(Self::KeyValue),
            other => Err(format!(
                "unknown marker layout `{other}` (expected `positional` or `key-value`)"
            )),
        }
    }
}

/// Parse a line already known to carry the marker token.
pub fn parse_marker(line: &str, layout: MarkerLayout) -> Result<MarkerLine, MarkerFault> {
    match layout {
        MarkerLayout::Positional => parse_positional(line),
        MarkerLayout::KeyValue => parse_key_value(line),
    }
}

fn parse_positional(line: &str) -> Result<MarkerLine, MarkerFault> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < POSITIONAL_MIN_FIELDS {
        return Err(MarkerFault::TooFewFields {
            expected: POSITIONAL_MIN_FIELDS,
            found: fields.len(),
        });
    }

    let logged_at = parse_timestamp(fields[0], fields[1])?;
    let pid = parse_pid(fields[3]);

    let parts: Vec<&str> = fields[4].split(',').collect();
    let [database, user, application, client] = parts.as_slice() else {
        return Err(MarkerFault::DescriptorParts {
            descriptor: fields[4].to_string(),
            found: parts.len(),
        });
    };

    Ok(MarkerLine {
        metadata: ConnectionMetadata {
            database: database.to_string(),
            user: user.to_string(),
            application: application.to_string(),
            client: client.to_string(),
        },
        logged_at,
        pid,
        duration_ms: parse_duration(line),
    })
}

fn parse_key_value(line: &str) -> Result<MarkerLine, MarkerFault> {
    let caps = KV_PREFIX_RE
        .captures(line)
        .ok_or_else(|| MarkerFault::BadTimestamp(first_tokens(line, 3)))?;
    let logged_at = parse_timestamp(&caps[1], &caps[2])?;

    let descriptor = line
        .split_whitespace()
        .find(|token| token.starts_with("user="))
        .ok_or(MarkerFault::MissingDescriptor)?;

    let mut pairs: HashMap<&str, &str> = HashMap::new();
    for part in descriptor.split(',') {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| MarkerFault::InvalidPair(part.to_string()))?;
        pairs.insert(key, value);
    }

    let database = pairs.get("db").ok_or(MarkerFault::MissingKey("db"))?;
    let user = pairs.get("user").ok_or(MarkerFault::MissingKey("user"))?;
    let application = pairs
        .get("app")
        .or_else(|| pairs.get("application"))
        .copied()
        .unwrap_or_default();
    let client = pairs
        .get("client")
        .or_else(|| pairs.get("host"))
        .copied()
        .unwrap_or_default();

    let duration_ms = parse_duration(line).ok_or(MarkerFault::MissingDuration)?;
    let pid = line
        .split_whitespace()
        .find(|token| token.starts_with('['))
        .and_then(parse_pid);

    Ok(MarkerLine {
        metadata: ConnectionMetadata {
            database: database.to_string(),
            user: user.to_string(),
            application: application.to_string(),
            client: client.to_string(),
        },
        logged_at,
        pid,
        duration_ms: Some(duration_ms),
    })
}

/// Join date and time, dropping fractional seconds and any zone suffix.
fn parse_timestamp(date: &str, time: &str) -> Result<NaiveDateTime, MarkerFault> {
    let end = time
        .find(|c: char| !(c.is_ascii_digit() || c == ':'))
        .unwrap_or(time.len());
    let joined = format!("{date} {}", &time[..end]);
    NaiveDateTime::parse_from_str(&joined, "%Y-%m-%d %H:%M:%S")
        .map_err(|_| MarkerFault::BadTimestamp(format!("{date} {time}")))
}

fn parse_pid(field: &str) -> Option<u32> {
    field
        .trim_matches(|c: char| c == '[' || c == ']' || c == ':')
        .parse()
        .ok()
}

fn parse_duration(line: &str) -> Option<f64> {
    DURATION_RE
        .captures(line)
        .and_then(|caps| caps[1].parse().ok())
}

fn first_tokens(line: &str, n: usize) -> String {
    line.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const POSITIONAL: &str = "2024-03-09 14:02:07 UTC [4242] sales,report,psql,10.0.0.7 LOG:  duration: 12.500 ms  plan:";
    const KEY_VALUE: &str = "2024-03-09 14:02:07 UTC [4242]: user=report,db=sales,app=psql,client=10.0.0.7 LOG:  duration: 12.500 ms  plan:";

    fn expected_ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 2, 7)
            .unwrap()
    }

    #[test]
    fn test_positional_marker() {
        let marker = parse_marker(POSITIONAL, MarkerLayout::Positional).unwrap();
        assert_eq!(marker.logged_at, expected_ts());
        assert_eq!(marker.metadata.database, "sales");
        assert_eq!(marker.metadata.user, "report");
        assert_eq!(marker.metadata.application, "psql");
        assert_eq!(marker.metadata.client, "10.0.0.7");
        assert_eq!(marker.pid, Some(4242));
        assert_eq!(marker.duration_ms, Some(12.5));
    }

    #[test]
    fn test_positional_strips_fractional_seconds() {
        let line = "2024-03-09 14:02:07.913 UTC [77] a,b,c,d LOG: plan:";
        let marker = parse_marker(line, MarkerLayout::Positional).unwrap();
        assert_eq!(marker.logged_at, expected_ts());
        assert_eq!(marker.duration_ms, None);
    }

    #[test]
    fn test_positional_empty_descriptor_parts_are_kept() {
        let line = "2024-03-09 14:02:07 UTC [77] sales,,, LOG: plan:";
        let marker = parse_marker(line, MarkerLayout::Positional).unwrap();
        assert_eq!(marker.metadata.database, "sales");
        assert_eq!(marker.metadata.user, "");
        assert_eq!(marker.metadata.client, "");
    }

    #[test]
    fn test_positional_too_few_fields() {
        let err = parse_marker("2024-03-09 14:02:07 plan:", MarkerLayout::Positional).unwrap_err();
        assert_eq!(
            err,
            MarkerFault::TooFewFields {
                expected: 7,
                found: 3
            }
        );
    }

    #[test]
    fn test_positional_descriptor_part_count() {
        let line = "2024-03-09 14:02:07 UTC [77] sales,report,psql LOG: duration: 1.0 ms plan:";
        let err = parse_marker(line, MarkerLayout::Positional).unwrap_err();
        assert!(matches!(err, MarkerFault::DescriptorParts { found: 3, .. }));
    }

    #[test]
    fn test_positional_bad_timestamp() {
        let line = "garbage here UTC [77] a,b,c,d LOG: plan:";
        let err = parse_marker(line, MarkerLayout::Positional).unwrap_err();
        assert!(matches!(err, MarkerFault::BadTimestamp(_)));
    }

    #[test]
    fn test_positional_non_numeric_pid() {
        let line = "2024-03-09 14:02:07 UTC worker a,b,c,d LOG: plan:";
        let marker = parse_marker(line, MarkerLayout::Positional).unwrap();
        assert_eq!(marker.pid, None);
    }

    #[test]
    fn test_key_value_marker() {
        let marker = parse_marker(KEY_VALUE, MarkerLayout::KeyValue).unwrap();
        assert_eq!(marker.logged_at, expected_ts());
        assert_eq!(marker.metadata.database, "sales");
        assert_eq!(marker.metadata.user, "report");
        assert_eq!(marker.metadata.application, "psql");
        assert_eq!(marker.metadata.client, "10.0.0.7");
        assert_eq!(marker.pid, Some(4242));
        assert_eq!(marker.duration_ms, Some(12.5));
    }

    #[test]
    fn test_key_value_optional_keys_and_aliases() {
        let line = "2024-03-09 14:02:07 UTC user=report,db=sales,host=db1 LOG: duration: 3 ms plan:";
        let marker = parse_marker(line, MarkerLayout::KeyValue).unwrap();
        assert_eq!(marker.metadata.application, "");
        assert_eq!(marker.metadata.client, "db1");
        assert_eq!(marker.duration_ms, Some(3.0));
        assert_eq!(marker.pid, None);
    }

    #[test]
    fn test_key_value_requires_db_and_duration() {
        let no_db = "2024-03-09 14:02:07 UTC user=report,app=psql LOG: duration: 3 ms plan:";
        assert_eq!(
            parse_marker(no_db, MarkerLayout::KeyValue).unwrap_err(),
            MarkerFault::MissingKey("db")
        );

        let no_duration = "2024-03-09 14:02:07 UTC user=report,db=sales LOG: plan:";
        assert_eq!(
            parse_marker(no_duration, MarkerLayout::KeyValue).unwrap_err(),
            MarkerFault::MissingDuration
        );

        let bad_pair = "2024-03-09 14:02:07 UTC user=report,sales LOG: duration: 3 ms plan:";
        assert_eq!(
            parse_marker(bad_pair, MarkerLayout::KeyValue).unwrap_err(),
            MarkerFault::InvalidPair("sales".to_string())
        );
    }

    #[test]
    fn test_layouts_disagree_on_same_line() {
        // Four comma parts, so the positional grammar accepts it with the wrong fields.
        let misread = parse_marker(KEY_VALUE, MarkerLayout::Positional).unwrap();
        assert_eq!(misread.metadata.database, "user=report");
        assert_eq!(
            parse_marker(POSITIONAL, MarkerLayout::KeyValue).unwrap_err(),
            MarkerFault::MissingDescriptor
        );
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("positional".parse::<MarkerLayout>(), Ok(MarkerLayout::Positional));
        assert_eq!("Key-Value".parse::<MarkerLayout>(), Ok(MarkerLayout::KeyValue));
        assert!("csv".parse::<MarkerLayout>().is_err());
        assert_eq!(MarkerLayout::KeyValue.to_string(), "key-value");
    }
}
