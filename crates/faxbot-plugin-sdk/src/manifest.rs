use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// File name of the manifest expected at every plugin package root.
pub const MANIFEST_FILE: &str = "manifest.json";

/// A plugin's self-description, shipped as `manifest.json` next to its sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PluginManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub categories: Vec<Category>,
    pub capabilities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub hipaa_compliant: bool,
    pub requires_baa: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_schema: Option<Value>,
}

impl PluginManifest {
    pub fn has_capability(&self, cap: &str) -> bool {
        self.capabilities.iter().any(|c| c == cap)
    }

    pub fn has_category(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    /// Strict semver parse of `version`; `None` for versions such as `1.0.0rc1`.
    pub fn semver(&self) -> Option<semver::Version> {
        semver::Version::parse(&self.version).ok()
    }

    /// Untyped JSON form, the shape the validators consume.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Closed set of category tags a manifest may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Outbound,
    Inbound,
    Storage,
    Auth,
    Messaging,
    Transform,
    Custom,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Outbound,
        Category::Inbound,
        Category::Storage,
        Category::Auth,
        Category::Messaging,
        Category::Transform,
        Category::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Outbound => "outbound",
            Category::Inbound => "inbound",
            Category::Storage => "storage",
            Category::Auth => "auth",
            Category::Messaging => "messaging",
            Category::Transform => "transform",
            Category::Custom => "custom",
        }
    }

    /// Capability names of which a plugin in this category must declare at
    /// least one. Empty for categories without a mapping.
    pub fn required_capabilities(self) -> &'static [&'static str] {
        match self {
            Category::Outbound => &["send_fax", "get_status"],
            Category::Inbound => &["receive_fax", "list_inbound"],
            Category::Storage => &["put", "get", "delete"],
            Category::Auth => &["authenticate", "validate_token"],
            Category::Messaging => &["send_message", "get_message_status"],
            Category::Transform | Category::Custom => &[],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category `{s}`"))
    }
}
