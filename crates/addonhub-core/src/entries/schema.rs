//! AddonEntry schema and validation.
//!
//! Entry sources are JSON arrays of objects. Each object is checked against a
//! static field table before anything is trusted: required keys must be
//! present, every key must be known and every value must have the declared
//! shape. One bad object rejects the whole batch.

use crate::{AddonHubError, Result};
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Shape a field's JSON value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// A string with at least one character.
    NonEmptyString,
    String,
    /// Object with string values.
    StringMap,
    /// Array of strings.
    StringList,
    /// String that compiles as a regular expression.
    Regex,
}

/// One row of the entry field table.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub shape: FieldShape,
}

const fn field(name: &'static str, required: bool, shape: FieldShape) -> FieldSpec {
    FieldSpec {
        name,
        required,
        shape,
    }
}

/// Every key an entry object may carry.
pub const ENTRY_FIELDS: &[FieldSpec] = &[
    field("id", true, FieldShape::NonEmptyString),
    field("username", true, FieldShape::NonEmptyString),
    field("branch", false, FieldShape::String),
    field("assets", false, FieldShape::StringMap),
    field("asset_prefix", false, FieldShape::String),
    field("repository", false, FieldShape::String),
    field("tag_pattern", false, FieldShape::Regex),
    field("token", false, FieldShape::String),
    field("platforms", false, FieldShape::StringList),
];

impl FieldSpec {
    fn check(&self, value: &Value) -> Result<()> {
        let ok = match self.shape {
            FieldShape::NonEmptyString => value.as_str().is_some_and(|s| !s.is_empty()),
            FieldShape::String => value.is_string(),
            FieldShape::StringMap => value
                .as_object()
                .is_some_and(|map| map.values().all(Value::is_string)),
            FieldShape::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            FieldShape::Regex => match value.as_str() {
                Some(pattern) => {
                    TagPattern::new(pattern)?;
                    true
                }
                None => false,
            },
        };
        if ok {
            Ok(())
        } else {
            Err(AddonHubError::schema(format!(
                "Expected {} for '{}'",
                self.shape.describe(),
                self.name
            )))
        }
    }
}

impl FieldShape {
    fn describe(self) -> &'static str {
        match self {
            FieldShape::NonEmptyString => "non-empty string",
            FieldShape::String => "string",
            FieldShape::StringMap => "map of strings",
            FieldShape::StringList => "list of strings",
            FieldShape::Regex => "regular expression string",
        }
    }
}

/// A compiled tag pattern, matched against the whole tag.
#[derive(Debug, Clone)]
pub struct TagPattern {
    source: String,
    regex: Regex,
}

impl TagPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            AddonHubError::schema(format!("Invalid tag_pattern {:?}: {}", pattern, e))
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, tag: &str) -> bool {
        self.regex.is_match(tag)
    }

    /// Comparable version of `tag`, or `None` when the tag doesn't match.
    ///
    /// That is the `version` group if the pattern names one, else group 1 if
    /// there is one, else the whole tag.
    pub fn captured_version<'t>(&self, tag: &'t str) -> Option<&'t str> {
        let captures = self.regex.captures(tag)?;
        let group = captures
            .name("version")
            .or_else(|| captures.get(1))
            .or_else(|| captures.get(0))?;
        Some(group.as_str())
    }
}

impl PartialEq for TagPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for TagPattern {}

impl Serialize for TagPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

/// A validated manifest entry for one addon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddonEntry {
    pub id: String,
    #[serde(rename = "username")]
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(rename = "branch", skip_serializing_if = "Option::is_none")]
    pub explicit_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_pattern: Option<TagPattern>,
    #[serde(rename = "assets", skip_serializing_if = "BTreeMap::is_empty")]
    pub asset_overrides: BTreeMap<String, String>,
    #[serde(rename = "asset_prefix", skip_serializing_if = "String::is_empty")]
    pub asset_path_prefix: String,
    #[serde(rename = "token", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(rename = "platforms", skip_serializing_if = "Option::is_none")]
    pub supported_platforms: Option<Vec<String>>,
}

impl AddonEntry {
    /// Entry with only the required fields set.
    pub fn new(id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            repository: None,
            explicit_ref: None,
            tag_pattern: None,
            asset_overrides: BTreeMap::new(),
            asset_path_prefix: String::new(),
            access_token: None,
            supported_platforms: None,
        }
    }

    /// Validate one JSON object against [`ENTRY_FIELDS`].
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| AddonHubError::schema("Expecting object for entry"))?;

        for spec in ENTRY_FIELDS.iter().filter(|spec| spec.required) {
            if !object.contains_key(spec.name) {
                return Err(AddonHubError::schema(format!(
                    "Key '{}' is required",
                    spec.name
                )));
            }
        }
        for (key, value) in object {
            let spec = ENTRY_FIELDS
                .iter()
                .find(|spec| spec.name == key)
                .ok_or_else(|| AddonHubError::schema(format!("Key '{}' is not valid", key)))?;
            spec.check(value)?;
        }

        Self::from_checked(object)
    }

    fn from_checked(object: &Map<String, Value>) -> Result<Self> {
        let string = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);

        let tag_pattern = match object.get("tag_pattern").and_then(Value::as_str) {
            Some(pattern) => Some(TagPattern::new(pattern)?),
            None => None,
        };
        let asset_overrides = object
            .get("assets")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        let supported_platforms = object
            .get("platforms")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            });

        Ok(Self {
            id: string("id").unwrap_or_default(),
            owner: string("username").unwrap_or_default(),
            repository: string("repository"),
            explicit_ref: string("branch"),
            tag_pattern,
            asset_overrides,
            asset_path_prefix: string("asset_prefix").unwrap_or_default(),
            access_token: string("token"),
            supported_platforms,
        })
    }

    /// Repository name, defaulting to the addon id.
    pub fn repository(&self) -> &str {
        self.repository
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(&self.id)
    }

    /// Explicit branch or tag, ignoring an empty string.
    pub fn explicit_ref(&self) -> Option<&str> {
        self.explicit_ref.as_deref().filter(|r| !r.is_empty())
    }

    /// Whether the entry may be served on the platform named `platform_name`.
    ///
    /// A missing or empty `platforms` list allows every platform.
    pub fn supports_platform(&self, platform_name: &str) -> bool {
        match &self.supported_platforms {
            Some(platforms) if !platforms.is_empty() => {
                platforms.iter().any(|p| p == platform_name)
            }
            _ => true,
        }
    }
}

/// Validate a whole batch. Any invalid entry rejects all of them.
pub fn validate_entries(data: &Value) -> Result<Vec<AddonEntry>> {
    let items = data
        .as_array()
        .ok_or_else(|| AddonHubError::schema("Expecting list for entries"))?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            AddonEntry::from_value(item).map_err(|e| match e {
                AddonHubError::InvalidSchema { message } => {
                    AddonHubError::schema(format!("entry #{}: {}", index, message))
                }
                other => other,
            })
        })
        .collect()
}

/// Parse and validate a JSON document of entries.
pub fn parse_entries(text: &str) -> Result<Vec<AddonEntry>> {
    let data: Value = serde_json::from_str(text)
        .map_err(|e| AddonHubError::schema(format!("Entries are not valid JSON: {}", e)))?;
    validate_entries(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema_error(value: Value) -> String {
        match validate_entries(&value) {
            Err(AddonHubError::InvalidSchema { message }) => message,
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_minimal_entry() {
        let entries =
            validate_entries(&json!([{"id": "plugin.video.foo", "username": "octo"}])).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.repository(), "plugin.video.foo");
        assert_eq!(entry.explicit_ref(), None);
        assert!(entry.asset_overrides.is_empty());
        assert!(entry.supports_platform("linux-x64"));
    }

    #[test]
    fn test_full_entry() {
        let entries = validate_entries(&json!([{
            "id": "script.module.bar",
            "username": "octo",
            "branch": "dev",
            "assets": {"zip": "release_asset://v{version}/bar-{system}.zip"},
            "asset_prefix": "src/",
            "repository": "bar",
            "tag_pattern": "v(\\d+\\.\\d+)",
            "token": "secret",
            "platforms": ["linux-x64", "android-arm64"]
        }]))
        .unwrap();
        let entry = &entries[0];
        assert_eq!(entry.repository(), "bar");
        assert_eq!(entry.explicit_ref(), Some("dev"));
        assert_eq!(entry.asset_path_prefix, "src/");
        assert_eq!(entry.access_token.as_deref(), Some("secret"));
        assert!(entry.supports_platform("android-arm64"));
        assert!(!entry.supports_platform("windows-x64"));

        let mut everywhere = AddonEntry::new("a", "o");
        everywhere.supported_platforms = Some(Vec::new());
        assert!(everywhere.supports_platform("windows-x64"));
        assert_eq!(
            entry.tag_pattern.as_ref().unwrap().as_str(),
            "v(\\d+\\.\\d+)"
        );
    }

    #[test]
    fn test_missing_required_key() {
        let message = schema_error(json!([{"id": "a"}]));
        assert!(message.contains("'username' is required"), "{}", message);
    }

    #[test]
    fn test_empty_required_value() {
        let message = schema_error(json!([{"id": "", "username": "octo"}]));
        assert!(message.contains("'id'"), "{}", message);
    }

    #[test]
    fn test_unknown_key_rejects_batch() {
        let message = schema_error(json!([
            {"id": "a", "username": "o"},
            {"id": "b", "username": "o", "colour": "blue"}
        ]));
        assert!(message.contains("entry #1"), "{}", message);
        assert!(message.contains("'colour' is not valid"), "{}", message);
    }

    #[test]
    fn test_wrong_types() {
        schema_error(json!([{"id": "a", "username": "o", "branch": 3}]));
        schema_error(json!([{"id": "a", "username": "o", "assets": {"zip": 1}}]));
        schema_error(json!([{"id": "a", "username": "o", "assets": ["zip"]}]));
        schema_error(json!([{"id": "a", "username": "o", "platforms": "linux-x64"}]));
        schema_error(json!([{"id": "a", "username": "o", "platforms": [1]}]));
    }

    #[test]
    fn test_invalid_regex() {
        let message = schema_error(json!([{"id": "a", "username": "o", "tag_pattern": "v(\\d+"}]));
        assert!(message.contains("tag_pattern"), "{}", message);
    }

    #[test]
    fn test_not_a_list() {
        schema_error(json!({"id": "a", "username": "o"}));
        schema_error(json!(["a"]));
    }

    #[test]
    fn test_parse_entries_rejects_bad_json() {
        assert!(matches!(
            parse_entries("[{"),
            Err(AddonHubError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn test_tag_pattern_captures() {
        let named = TagPattern::new(r"release-(?P<version>\d+(\.\d+)*)").unwrap();
        assert_eq!(named.captured_version("release-1.2.3"), Some("1.2.3"));
        assert_eq!(named.captured_version("release-x"), None);

        let numbered = TagPattern::new(r"v(\d+\.\d+)").unwrap();
        assert_eq!(numbered.captured_version("v1.2"), Some("1.2"));

        let whole = TagPattern::new(r"\d+\.\d+").unwrap();
        assert_eq!(whole.captured_version("1.2"), Some("1.2"));
    }

    #[test]
    fn test_tag_pattern_matches_whole_tag() {
        let pattern = TagPattern::new(r"v\d+").unwrap();
        assert!(pattern.is_match("v1"));
        assert!(!pattern.is_match("v1-beta"));
        assert!(!pattern.is_match("xv1"));
    }

    #[test]
    fn test_serializes_back_to_source_shape() {
        let source = json!([{
            "id": "a",
            "username": "o",
            "branch": "main",
            "tag_pattern": "v(.*)",
            "platforms": ["linux-x64"]
        }]);
        let entries = validate_entries(&source).unwrap();
        let value = serde_json::to_value(&entries).unwrap();
        assert_eq!(value, source);
    }
}
