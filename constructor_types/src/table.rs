use crate::types::TypeDef;
use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating descriptor tables.
#[derive(Debug, Error)]
pub enum TypeTableError {
    #[error("failed to read type table '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse type table YAML: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("invalid type expression '{expression}': {reason}")]
    InvalidTypeExpression { expression: String, reason: String },

    #[error("type '{type_name}' declares parameter '{parameter}' more than once")]
    DuplicateParameter { type_name: String, parameter: String },
}

/* On-disk shape of a descriptor file */
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "kebab-case")]
struct TypeFile {
    #[serde(default)]
    types: Vec<TypeDef>,
}

/// Statically registered descriptor table, keyed by type name.
///
/// Types keep their registration order; registering a name twice replaces
/// the earlier definition in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeTable {
    types: IndexMap<String, TypeDef>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from type definitions, validating parameter names.
    pub fn from_defs(defs: impl IntoIterator<Item = TypeDef>) -> Result<Self, TypeTableError> {
        let mut table = Self::new();
        for def in defs {
            table.insert(def)?;
        }
        Ok(table)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, TypeTableError> {
        let file: TypeFile = serde_yml::from_str(yaml)?;
        Self::from_defs(file.types)
    }

    /// Load a descriptor file from disk.
    pub fn load(path: &Path) -> Result<Self, TypeTableError> {
        let contents = std::fs::read_to_string(path).map_err(|source| TypeTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Register (or replace) one type definition.
    pub fn insert(&mut self, def: TypeDef) -> Result<(), TypeTableError> {
        let mut seen = HashSet::new();
        for param in &def.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(TypeTableError::DuplicateParameter {
                    type_name: def.name.clone(),
                    parameter: param.name.clone(),
                });
            }
        }
        self.types.insert(def.name.clone(), def);
        Ok(())
    }

    /// Merge another table into this one; definitions from `other` win.
    pub fn merge(&mut self, other: TypeTable) {
        for (name, def) in other.types {
            self.types.insert(name, def);
        }
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeDef> {
        self.types.get(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Serialize the table back into the YAML file format.
    pub fn to_yaml_string(&self) -> Result<String, TypeTableError> {
        let file = TypeFile {
            types: self.types.values().cloned().collect(),
        };
        Ok(serde_yml::to_string(&file)?)
    }
}
