use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Integer identity of a ledger tracked by a validator node.
///
/// Ledger ids are small integers assigned when a ledger type is
/// introduced. They key the audit schema's per-ledger maps, so after a
/// round trip through JSON (where map keys become strings) they must
/// deserialize back to integers; the `Deserialize` impl accepts both
/// an integer and its decimal-string form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LedgerId(pub u64);

impl LedgerId {
    /// The pool (node membership) ledger.
    pub const POOL: LedgerId = LedgerId(0);
    /// The domain (application transaction) ledger.
    pub const DOMAIN: LedgerId = LedgerId(1);
    /// The config ledger.
    pub const CONFIG: LedgerId = LedgerId(2);
    /// The audit ledger: one entry per ordered batch.
    pub const AUDIT: LedgerId = LedgerId(3);

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerId({})", self.0)
    }
}

impl From<u64> for LedgerId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl Serialize for LedgerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for LedgerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = LedgerId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a ledger id as an integer or decimal string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<LedgerId, E> {
                Ok(LedgerId(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<LedgerId, E> {
                if v < 0 {
                    return Err(E::custom(TypeError::InvalidLedgerId(v.to_string())));
                }
                Ok(LedgerId(v as u64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<LedgerId, E> {
                v.parse::<u64>()
                    .map(LedgerId)
                    .map_err(|_| E::custom(TypeError::InvalidLedgerId(v.to_string())))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Name of a validator node.
///
/// Primaries are ordered sequences of `NodeId`s; ordering is significant
/// and equality is positional.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
