//! Placement type definitions.

use serde::{Deserialize, Serialize};

use crate::topology::types::DeviceId;

/// Attribute key used for placement tags when the policy does not name one.
pub const DEFAULT_TAG_KEY: &str = "mytag";

fn default_tag_key() -> String {
    DEFAULT_TAG_KEY.to_string()
}

fn default_replicas() -> usize {
    1
}

/// A named placement policy for one application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementSpec {
    pub name: String,
    pub application: String,
    /// Device attribute the tags are matched against
    #[serde(default = "default_tag_key")]
    pub tag_key: String,
    /// Selector used by entries that do not carry their own tag list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Scale map: which processing modules to deploy and how many replicas
    #[serde(default)]
    pub modules: Vec<ScaledModule>,
}

/// One entry of a placement scale map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaledModule {
    pub module: String,
    #[serde(default = "default_replicas")]
    pub replicas: usize,
    /// One tag per replica index; a single tag is reused for every replica
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl PlacementSpec {
    pub fn new(name: impl Into<String>, application: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            application: application.into(),
            tag_key: default_tag_key(),
            tag: None,
            modules: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Scale `module` to `replicas`, using the policy-wide tag.
    pub fn scale(mut self, module: impl Into<String>, replicas: usize) -> Self {
        self.modules.push(ScaledModule {
            module: module.into(),
            replicas,
            tags: None,
        });
        self
    }

    /// Scale `module` with an explicit per-replica tag list.
    pub fn scale_with_tags(mut self, module: impl Into<String>, replicas: usize, tags: &[&str]) -> Self {
        self.modules.push(ScaledModule {
            module: module.into(),
            replicas,
            tags: Some(tags.iter().map(|t| t.to_string()).collect()),
        });
        self
    }
}

/// Instruction to run one instance of `module` on `device`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Deployment {
    pub module: String,
    pub device: DeviceId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_parsing_defaults() {
        let yaml = r#"
name: onCloud1
application: app_1
tag: cloud1
modules:
  - module: Service1
  - module: Service2
    replicas: 2
    tags: [cloud2, cloud3]
"#;
        let spec: PlacementSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.tag_key, "mytag");
        assert_eq!(spec.tag.as_deref(), Some("cloud1"));
        assert_eq!(spec.modules[0].replicas, 1);
        assert!(spec.modules[0].tags.is_none());
        assert_eq!(spec.modules[1].tags.as_ref().map(Vec::len), Some(2));
    }
}
