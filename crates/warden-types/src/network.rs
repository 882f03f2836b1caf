//! Remote network-management wire types.
//!
//! Field names follow the remote API (`tagsByName`, `physicalAddress`,
//! `lastSeen`); everything else the API sends is ignored.

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Timestamp, UNKNOWN_STATUS};

/// A `[tag_id, value]` pair as stored on a member.
pub type TagEntry = [u32; 2];

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Network descriptor with its tag schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    /// Network ID.
    pub id: String,
    /// Tag schema keyed by human-readable tag name.
    #[serde(rename = "tagsByName", default, deserialize_with = "null_as_default")]
    pub tags_by_name: BTreeMap<String, TagDefinition>,
}

/// One declared tag: its numeric id, default value, and enum names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDefinition {
    /// Numeric tag id stored on members.
    pub id: u32,
    /// Value assumed when a member carries no entry for this tag.
    #[serde(default)]
    pub default: Option<u32>,
    /// Enum name to numeric value.
    #[serde(default, deserialize_with = "null_as_default")]
    pub enums: BTreeMap<String, u32>,
}

/// Member descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Member configuration (id and tags).
    pub config: MemberConfig,
    /// Last observed physical address, optionally suffixed with `/port`.
    #[serde(rename = "physicalAddress", default)]
    pub physical_address: Option<String>,
    /// Last seen, in epoch milliseconds.
    #[serde(rename = "lastSeen", default, deserialize_with = "null_as_default")]
    pub last_seen: u64,
}

/// Member configuration as exchanged with the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberConfig {
    /// Member ID.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// Tag entries.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<TagEntry>,
}

/// Body of a tag update request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagUpdate {
    /// Replacement configuration; only tags are sent.
    pub config: TagUpdateConfig,
}

/// Replacement tag list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagUpdateConfig {
    /// Full replacement tag list.
    pub tags: Vec<TagEntry>,
}

impl Network {
    /// Look up a tag definition by name.
    pub fn tag(&self, name: &str) -> Option<&TagDefinition> {
        self.tags_by_name.get(name)
    }

    /// Resolve a `(tag_name, enum_name)` pair to its numeric `[id, value]`.
    pub fn resolve(&self, tag_name: &str, enum_name: &str) -> Option<TagEntry> {
        let tag = self.tag(tag_name)?;
        let value = tag.enums.get(enum_name)?;
        Some([tag.id, *value])
    }

    /// Name of the member's current value for `tag_name`.
    ///
    /// Falls back to the tag's default value, then to `"unknown"`.
    pub fn tag_value_name(&self, member: &Member, tag_name: &str) -> String {
        let Some(tag) = self.tag(tag_name) else {
            return UNKNOWN_STATUS.to_string();
        };
        member
            .tag_value(tag.id)
            .or(tag.default)
            .and_then(|value| tag.enum_name(value))
            .unwrap_or(UNKNOWN_STATUS)
            .to_string()
    }
}

impl TagDefinition {
    /// Reverse lookup of an enum value.
    pub fn enum_name(&self, value: u32) -> Option<&str> {
        self.enums
            .iter()
            .find(|(_, v)| **v == value)
            .map(|(name, _)| name.as_str())
    }
}

impl Member {
    /// Member ID.
    pub fn id(&self) -> &str {
        &self.config.id
    }

    /// Value of the given tag id, if the member carries one.
    pub fn tag_value(&self, tag_id: u32) -> Option<u32> {
        self.config
            .tags
            .iter()
            .find(|[id, _]| *id == tag_id)
            .map(|[_, value]| *value)
    }

    /// Physical address with any `/port` suffix stripped.
    ///
    /// `None` when absent, empty or unparseable.
    pub fn address(&self) -> Option<IpAddr> {
        let raw = self.physical_address.as_deref()?.trim();
        let host = raw.split('/').next().unwrap_or(raw);
        host.parse().ok()
    }

    /// Last seen, converted to epoch seconds.
    pub fn last_seen_secs(&self) -> Timestamp {
        self.last_seen / 1000
    }

    /// Tag list with `entry` replacing any existing entry for its tag id.
    ///
    /// Other entries keep their order; a new tag is appended.
    pub fn tags_with(&self, entry: TagEntry) -> Vec<TagEntry> {
        let mut tags = self.config.tags.clone();
        match tags.iter_mut().find(|[id, _]| *id == entry[0]) {
            Some(existing) => *existing = entry,
            None => tags.push(entry),
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> Network {
        serde_json::from_value(serde_json::json!({
            "id": "abc123",
            "tagsByName": {
                "status": {"id": 1, "default": 0, "enums": {"allowed": 0, "blocked": 1}}
            }
        }))
        .expect("parse network")
    }

    fn member(tags: serde_json::Value, address: &str) -> Member {
        serde_json::from_value(serde_json::json!({
            "config": {"id": "member1", "tags": tags},
            "physicalAddress": address,
            "lastSeen": 1_700_000_000_123u64
        }))
        .expect("parse member")
    }

    #[test]
    fn test_parse_network_schema() {
        let net = network();
        let tag = net.tag("status").expect("status tag");
        assert_eq!(tag.id, 1);
        assert_eq!(tag.default, Some(0));
        assert_eq!(net.resolve("status", "blocked"), Some([1, 1]));
        assert_eq!(net.resolve("status", "banished"), None);
        assert_eq!(net.resolve("color", "blocked"), None);
    }

    #[test]
    fn test_null_default_and_missing_schema() {
        let net: Network = serde_json::from_value(serde_json::json!({
            "id": "n",
            "tagsByName": {"status": {"id": 3, "default": null, "enums": {}}}
        }))
        .expect("parse");
        assert_eq!(net.tag("status").and_then(|t| t.default), None);

        let bare: Network = serde_json::from_str(r#"{"id":"n"}"#).expect("parse");
        assert!(bare.tags_by_name.is_empty());
    }

    #[test]
    fn test_member_null_fields() {
        let m: Member = serde_json::from_value(serde_json::json!({
            "config": {"id": "member2", "tags": null},
            "physicalAddress": null,
            "lastSeen": null
        }))
        .expect("parse");
        assert_eq!(m.id(), "member2");
        assert!(m.config.tags.is_empty());
        assert_eq!(m.last_seen_secs(), 0);
        assert_eq!(m.address(), None);

        let net: Network =
            serde_json::from_str(r#"{"id":"n","tagsByName":null}"#).expect("parse");
        assert!(net.tags_by_name.is_empty());
    }

    #[test]
    fn test_tag_value_name() {
        let net = network();
        assert_eq!(net.tag_value_name(&member(serde_json::json!([[1, 1]]), ""), "status"), "blocked");
        // Falls back to the default value.
        assert_eq!(net.tag_value_name(&member(serde_json::json!([]), ""), "status"), "allowed");
        // Value outside the enum.
        assert_eq!(net.tag_value_name(&member(serde_json::json!([[1, 9]]), ""), "status"), "unknown");
        assert_eq!(net.tag_value_name(&member(serde_json::json!([]), ""), "color"), "unknown");
    }

    #[test]
    fn test_member_address() {
        assert_eq!(
            member(serde_json::json!([]), "192.168.1.1").address(),
            Some("192.168.1.1".parse().expect("ip"))
        );
        assert_eq!(
            member(serde_json::json!([]), "203.0.113.9/9993").address(),
            Some("203.0.113.9".parse().expect("ip"))
        );
        assert_eq!(member(serde_json::json!([]), "").address(), None);
        assert_eq!(member(serde_json::json!([]), "garbage").address(), None);
    }

    #[test]
    fn test_last_seen_secs() {
        assert_eq!(member(serde_json::json!([]), "").last_seen_secs(), 1_700_000_000);
    }

    #[test]
    fn test_tags_with_replaces_and_preserves() {
        let m = member(serde_json::json!([[2, 7], [1, 0]]), "");
        assert_eq!(m.tags_with([1, 1]), vec![[2, 7], [1, 1]]);

        let m = member(serde_json::json!([[2, 7]]), "");
        assert_eq!(m.tags_with([1, 1]), vec![[2, 7], [1, 1]]);
    }

    #[test]
    fn test_tag_update_body() {
        let body = TagUpdate {
            config: TagUpdateConfig {
                tags: vec![[2, 7], [1, 1]],
            },
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json, serde_json::json!({"config": {"tags": [[2, 7], [1, 1]]}}));
    }
}
