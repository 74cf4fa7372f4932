//! Utility functions and helpers for configuration

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Serde helper module for Duration serialization as seconds
pub mod serde_duration {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(seconds))
    }
}

/// Default functions for serde
pub fn default_true() -> bool {
    true
}

pub fn default_false() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Timed {
        #[serde(with = "serde_duration")]
        grace: Duration,
    }

    #[test]
    fn test_duration_as_seconds() {
        let parsed: Timed = serde_yaml::from_str("grace: 7").unwrap();
        assert_eq!(parsed.grace, Duration::from_secs(7));

        let yaml = serde_yaml::to_string(&Timed { grace: Duration::from_secs(3) }).unwrap();
        assert_eq!(yaml.trim(), "grace: 3");
    }
}
