//! PHP extension table.
//!
//! Which extensions the php fixture loads depends on the PHP release family
//! (`major.minor`). The mapping is data, embedded from
//! `data/php_extensions.yml`, so a new family is a YAML change only.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::version::major_minor;

const BUILTIN_TABLE: &str = include_str!("../../data/php_extensions.yml");

#[derive(Debug, Error)]
pub enum ExtensionTableError {
  #[error("failed to parse extension table: {0}")]
  Parse(#[from] serde_yaml::Error),

  #[error("family {family} references unknown group '{group}'")]
  UnknownGroup { family: String, group: String },

  #[error("alias {alias} points to undefined family '{target}'")]
  DanglingAlias { alias: String, target: String },

  #[error("no extension family for PHP versions: {}", versions.join(", "))]
  UnmappedFamilies { versions: Vec<String> },
}

#[derive(Debug, Deserialize)]
struct TableDocument {
  groups: BTreeMap<String, Vec<String>>,
  families: BTreeMap<String, FamilyDocument>,
  #[serde(default)]
  aliases: BTreeMap<String, String>,
  #[serde(default)]
  zend_extensions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FamilyDocument {
  #[serde(default)]
  groups: Vec<String>,
  #[serde(default)]
  extra: Vec<String>,
}

/// Resolved mapping from `major.minor` family to its extension list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionTable {
  families: BTreeMap<String, Vec<String>>,
  zend_extensions: Vec<String>,
}

impl ExtensionTable {
  /// The table shipped with the library.
  pub fn builtin() -> Result<Self, ExtensionTableError> {
    Self::from_yaml(BUILTIN_TABLE)
  }

  /// Parse and validate a table document. Groups and aliases are expanded
  /// once here; lookups afterwards are plain map reads.
  pub fn from_yaml(document: &str) -> Result<Self, ExtensionTableError> {
    let doc: TableDocument = serde_yaml::from_str(document)?;
    let mut families = BTreeMap::new();

    for (family, spec) in &doc.families {
      let mut extensions = Vec::new();
      for group in &spec.groups {
        let members = doc.groups.get(group).ok_or_else(|| ExtensionTableError::UnknownGroup {
          family: family.clone(),
          group: group.clone(),
        })?;
        extensions.extend(members.iter().cloned());
      }
      extensions.extend(spec.extra.iter().cloned());
      families.insert(family.clone(), extensions);
    }

    for (alias, target) in &doc.aliases {
      let extensions = families
        .get(target)
        .cloned()
        .ok_or_else(|| ExtensionTableError::DanglingAlias {
          alias: alias.clone(),
          target: target.clone(),
        })?;
      families.insert(alias.clone(), extensions);
    }

    Ok(Self {
      families,
      zend_extensions: doc.zend_extensions,
    })
  }

  /// Extensions for the family of `version`, or `None` when the family is
  /// not in the table. Callers omit extensions entirely in that case.
  pub fn extensions_for(&self, version: &str) -> Option<&[String]> {
    let family = major_minor(version);
    match self.families.get(&family) {
      Some(extensions) => Some(extensions.as_slice()),
      None => {
        warn!(version = %version, family = %family, "no extension family for PHP version, omitting extensions");
        None
      }
    }
  }

  pub fn has_family(&self, version: &str) -> bool {
    self.families.contains_key(&major_minor(version))
  }

  /// Fail if any of `versions` has no family in the table.
  pub fn validate_coverage<S: AsRef<str>>(&self, versions: &[S]) -> Result<(), ExtensionTableError> {
    let unmapped: Vec<String> = versions
      .iter()
      .map(|v| v.as_ref())
      .filter(|v| !self.has_family(v))
      .map(str::to_string)
      .collect();

    if unmapped.is_empty() {
      Ok(())
    } else {
      Err(ExtensionTableError::UnmappedFamilies { versions: unmapped })
    }
  }

  pub fn families(&self) -> impl Iterator<Item = &str> {
    self.families.keys().map(String::as_str)
  }

  pub fn zend_extensions(&self) -> &[String] {
    &self.zend_extensions
  }
}
