//! Human-readable durations (`"30s"`, `"10m"`, `"1h 30m"`) for config files.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(&s).map_err(serde::de::Error::custom)
}

/// Same format for optional fields. A zero duration reads as `None`.
pub mod option {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: Option<String> = Option::deserialize(deserializer)?;
        match s {
            None => Ok(None),
            Some(s) => {
                let d = humantime::parse_duration(&s).map_err(serde::de::Error::custom)?;
                Ok((!d.is_zero()).then_some(d))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Holder {
        #[serde(with = "super")]
        every: Duration,
        #[serde(default, with = "super::option")]
        timeout: Option<Duration>,
    }

    #[test]
    fn parses_human_durations() {
        let h: Holder = serde_json::from_str(r#"{"every": "1m 30s", "timeout": "10m"}"#).unwrap();
        assert_eq!(h.every, Duration::from_secs(90));
        assert_eq!(h.timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn missing_or_zero_optional_is_none() {
        let h: Holder = serde_json::from_str(r#"{"every": "5s"}"#).unwrap();
        assert_eq!(h.timeout, None);
        let h: Holder = serde_json::from_str(r#"{"every": "5s", "timeout": "0s"}"#).unwrap();
        assert_eq!(h.timeout, None);
    }

    #[test]
    fn round_trips_through_strings() {
        let h = Holder {
            every: Duration::from_secs(30),
            timeout: None,
        };
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, r#"{"every":"30s","timeout":null}"#);
    }
}
