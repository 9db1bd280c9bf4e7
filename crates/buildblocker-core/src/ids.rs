//! Identifiers for queue items, builds and nodes.
//!
//! Queue item and build ids are time-ordered UUIDv7 values written with a
//! short kind prefix (`qi_…`, `bld_…`). That prefixed form is what appears in
//! logs and in serialized snapshots; parsing also accepts a bare UUID.

use crate::error::Error;
use schemars::JsonSchema;
use schemars::r#gen::SchemaGenerator;
use schemars::schema::Schema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! prefixed_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(Uuid);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// A fresh time-ordered id.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", Self::PREFIX, self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_prefixed(s, Self::PREFIX).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }

        impl JsonSchema for $name {
            fn schema_name() -> String {
                stringify!($name).to_string()
            }

            fn json_schema(generator: &mut SchemaGenerator) -> Schema {
                String::json_schema(generator)
            }
        }
    };
}

fn parse_prefixed(s: &str, prefix: &'static str) -> Result<Uuid, Error> {
    let raw = s
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(s);
    Uuid::parse_str(raw).map_err(|_| Error::InvalidId {
        kind: prefix,
        value: s.to_string(),
    })
}

prefixed_id!(
    /// A queue item; unique for the item's whole stay in the queue.
    QueueItemId,
    "qi"
);
prefixed_id!(
    /// One execution of a task on a node.
    BuildId,
    "bld"
);

/// Name of an execution node (an agent, or the built-in controller).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct NodeName(String);

impl NodeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_item_id_display() {
        let id = QueueItemId::new();
        assert!(id.to_string().starts_with("qi_"));
    }

    #[test]
    fn test_build_id_parse_with_and_without_prefix() {
        let id = BuildId::new();
        let prefixed: BuildId = id.to_string().parse().unwrap();
        let bare: BuildId = id.as_uuid().to_string().parse().unwrap();
        assert_eq!(id, prefixed);
        assert_eq!(id, bare);
    }

    #[test]
    fn test_wrong_prefix_is_rejected() {
        let id = BuildId::new();
        let err = id.to_string().parse::<QueueItemId>().unwrap_err();
        assert!(matches!(err, Error::InvalidId { kind: "qi", .. }));
    }

    #[test]
    fn test_ids_serialize_prefixed() {
        let id = QueueItemId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));

        let back: QueueItemId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
