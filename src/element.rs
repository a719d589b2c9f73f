//! Generated BuildStream element descriptors and their `.bst` rendering.

use std::collections::BTreeMap;

use serde::Serialize;

/// A `sources:` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub kind: String,
    pub path: String,
}

/// One element to be written as `<name>.bst`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDescriptor {
    /// File stem of the element.
    pub name: String,
    /// Element plugin, e.g. `aosp_cc` or `import`.
    pub kind: String,
    pub variables: BTreeMap<String, String>,
    /// Element paths in dependency order.
    pub dependencies: Vec<String>,
    pub sources: Vec<Source>,
    /// Plugin configuration (`import` elements use `source`/`target`).
    pub config: BTreeMap<String, String>,
}

/// Field order here is the order keys appear in the rendered file.
#[derive(Serialize)]
struct BstDocument<'a> {
    kind: &'a str,
    #[serde(skip_serializing_if = "is_empty_slice")]
    depends: &'a [String],
    #[serde(skip_serializing_if = "is_empty_slice")]
    sources: &'a [Source],
    #[serde(skip_serializing_if = "is_empty_map")]
    variables: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "is_empty_map")]
    config: &'a BTreeMap<String, String>,
}

fn is_empty_slice<T>(items: &&[T]) -> bool {
    items.is_empty()
}

fn is_empty_map(map: &&BTreeMap<String, String>) -> bool {
    map.is_empty()
}

impl ElementDescriptor {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        ElementDescriptor {
            name: name.into(),
            kind: kind.into(),
            variables: BTreeMap::new(),
            dependencies: Vec::new(),
            sources: Vec::new(),
            config: BTreeMap::new(),
        }
    }

    pub fn variable(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    /// Set a variable unless the value is empty.
    pub fn set_nonempty(&mut self, key: &str, value: String) {
        if !value.is_empty() {
            self.variables.insert(key.to_string(), value);
        }
    }

    /// Path of the element file, relative to the output directory.
    pub fn file_name(&self, prefix: Option<&str>) -> String {
        match prefix {
            Some(p) if !p.is_empty() => format!("{}/{}.bst", p.trim_end_matches('/'), self.name),
            _ => format!("{}.bst", self.name),
        }
    }

    /// Render as a `.bst` YAML document.
    pub fn to_bst(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&BstDocument {
            kind: &self.kind,
            depends: &self.dependencies,
            sources: &self.sources,
            variables: &self.variables,
            config: &self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_with_prefix() {
        let element = ElementDescriptor::new("libbz", "aosp_cc");
        assert_eq!(element.file_name(None), "libbz.bst");
        assert_eq!(element.file_name(Some("")), "libbz.bst");
        assert_eq!(
            element.file_name(Some("external/bzip2/")),
            "external/bzip2/libbz.bst"
        );
    }

    #[test]
    fn test_bst_section_order_and_omission() {
        let mut element = ElementDescriptor::new("libbz", "aosp_cc");
        element.dependencies.push("base/aosp-sdk.bst".to_string());
        element.set_nonempty("build-type", "static".to_string());
        element.set_nonempty("extra-cflags", String::new());

        let text = element.to_bst().unwrap();
        let kind_at = text.find("kind:").unwrap();
        let depends_at = text.find("depends:").unwrap();
        let variables_at = text.find("variables:").unwrap();
        assert!(kind_at < depends_at && depends_at < variables_at);
        assert!(!text.contains("sources:"));
        assert!(!text.contains("config:"));
        assert!(!text.contains("extra-cflags"));

        let doc: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
        assert_eq!(doc["kind"].as_str(), Some("aosp_cc"));
        assert_eq!(doc["variables"]["build-type"].as_str(), Some("static"));
        assert_eq!(doc["depends"][0].as_str(), Some("base/aosp-sdk.bst"));
    }
}
