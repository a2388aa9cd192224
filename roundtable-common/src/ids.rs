//! Snowflake identifiers
//!
//! Guilds, channels and participants are all identified by 64-bit snowflakes.
//! They travel over JSON as decimal strings (JavaScript clients lose
//! precision above 2^53) but numeric input is accepted as well.

use crate::{Error, Result};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                parse_snowflake(s, $label).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                deserializer.deserialize_any(SnowflakeVisitor($label)).map(Self)
            }
        }
    };
}

snowflake_id!(
    /// Guild (server) identifier; one playback session per guild
    GuildId,
    "guild"
);

snowflake_id!(
    /// Voice or text channel identifier
    ChannelId,
    "channel"
);

snowflake_id!(
    /// Identity of a participant who submits items
    ParticipantId,
    "participant"
);

fn parse_snowflake(s: &str, label: &str) -> Result<u64> {
    let trimmed = s.trim();
    trimmed
        .parse::<u64>()
        .map_err(|e| Error::InvalidInput(format!("Invalid {} id '{}': {}", label, trimmed, e)))
}

struct SnowflakeVisitor(&'static str);

impl<'de> Visitor<'de> for SnowflakeVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a {} snowflake as a decimal string or integer", self.0)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<u64, E> {
        u64::try_from(v).map_err(|_| E::custom(format!("negative {} id: {}", self.0, v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<u64, E> {
        parse_snowflake(v, self.0).map_err(E::custom)
    }
}
