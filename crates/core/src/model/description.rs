use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::{Address, ClassDescriptor, Dataset};

/// Error raised while reading or parsing a textual description.
#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("Failed to read description at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid YAML description: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid JSON description: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk shape of a description. Class bodies may be `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDocument {
    version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    globals: BTreeMap<Address, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    functions: BTreeMap<Address, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    classes: BTreeMap<String, Option<ClassDescriptor>>,
}

impl From<DatasetDocument> for Dataset {
    fn from(doc: DatasetDocument) -> Self {
        let classes = doc
            .classes
            .into_iter()
            .map(|(name, body)| {
                let mut class = body.unwrap_or_default();
                class.name = name.clone();
                (name, class)
            })
            .collect();
        Dataset { version: doc.version, globals: doc.globals, functions: doc.functions, classes }
    }
}

impl From<Dataset> for DatasetDocument {
    fn from(dataset: Dataset) -> Self {
        DatasetDocument {
            version: dataset.version,
            globals: dataset.globals,
            functions: dataset.functions,
            classes: dataset.classes.into_iter().map(|(name, class)| (name, Some(class))).collect(),
        }
    }
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn zero_as_none<'de, D>(deserializer: D) -> Result<Option<Address>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Address>::deserialize(deserializer)?.filter(|addr| *addr != 0))
}

impl Dataset {
    /// Parse a YAML description (integer keys may be written in `0x` hex).
    pub fn from_yaml_str(text: &str) -> Result<Self, DescriptionError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parse a JSON description. JSON object keys are strings, so addresses are
    /// written as decimal strings.
    pub fn from_json_str(text: &str) -> Result<Self, DescriptionError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a description from disk, choosing the format by extension
    /// (`.json` is JSON, anything else is YAML).
    pub fn from_path(path: &Path) -> Result<Self, DescriptionError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| DescriptionError::Io { path: path.to_path_buf(), source })?;
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_yaml_layout() {
        let text = r#"
version: "2021.11.16.0000.0000"
globals:
  0x140500000: g_foo
functions:
  0x140100000: Client::System::Framework::Create
classes:
  Foo:
    vtbl: 0x141000100
    vfuncs:
      0: Ctor
      1: Dtor
  Bar:
    inherits_from: Foo
    vtbl: 0x141000200
    vfuncs:
      1: Dtor2
    funcs:
      0x140200000: Bar::Update
  Empty:
"#;
        let dataset = Dataset::from_yaml_str(text).expect("parse");
        assert_eq!(dataset.version, "2021.11.16.0000.0000");
        assert_eq!(dataset.globals.get(&0x1_4050_0000).map(String::as_str), Some("g_foo"));
        let bar = &dataset.classes["Bar"];
        assert_eq!(bar.name, "Bar");
        assert_eq!(bar.inherits_from.as_deref(), Some("Foo"));
        assert_eq!(bar.vtable_base, Some(0x1_4100_0200));
        assert_eq!(bar.direct_functions.len(), 1);
        let empty = &dataset.classes["Empty"];
        assert_eq!(empty.name, "Empty");
        assert!(empty.vtable_base.is_none());
        assert!(empty.vtable_slots.is_empty());
    }

    #[test]
    fn zero_vtable_means_none() {
        let dataset =
            Dataset::from_yaml_str("version: v1\nclasses:\n  A:\n    vtbl: 0\n    vfuncs:\n")
                .expect("parse");
        assert!(dataset.classes["A"].vtable_base.is_none());
        assert!(dataset.classes["A"].vtable_slots.is_empty());
    }

    #[test]
    fn json_and_yaml_describe_the_same_dataset() {
        let yaml = Dataset::from_yaml_str("version: v1\nglobals:\n  16: g_a\n").expect("yaml");
        let json =
            Dataset::from_json_str(r#"{"version":"v1","globals":{"16":"g_a"}}"#).expect("json");
        assert_eq!(yaml, json);
    }

    #[test]
    fn missing_version_is_rejected() {
        let err = Dataset::from_yaml_str("globals: {}\n").unwrap_err();
        assert!(err.to_string().contains("Invalid YAML description"));
    }
}
