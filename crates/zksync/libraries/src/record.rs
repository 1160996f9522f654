use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::LibraryRegistryError;

/// A contract that zksolc could not fully link because some libraries are not deployed yet.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkMissingLibrary {
    /// Name of the contract requiring linkage.
    pub contract_name: String,
    /// Source file of the contract.
    pub contract_path: String,
    /// Fully qualified (`path:Name`) libraries the contract still needs.
    pub missing_libraries: Vec<String>,
}

impl ZkMissingLibrary {
    /// Creates a new record.
    pub fn new(
        contract_path: impl Into<String>,
        contract_name: impl Into<String>,
        missing_libraries: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            contract_name: contract_name.into(),
            contract_path: contract_path.into(),
            missing_libraries: missing_libraries.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the `path:Name` identifier of this contract.
    pub fn id(&self) -> LibraryId {
        LibraryId { path: self.contract_path.clone(), name: self.contract_name.clone() }
    }

    /// Parses the missing library identifiers.
    pub fn dependencies(
        &self,
    ) -> impl Iterator<Item = Result<LibraryId, LibraryRegistryError>> + '_ {
        self.missing_libraries.iter().map(|id| id.parse())
    }
}

/// A fully qualified library identifier, `path:Name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryId {
    /// Source file of the library.
    pub path: String,
    /// Library name.
    pub name: String,
}

impl FromStr for LibraryId {
    type Err = LibraryRegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // the name never contains `:`, paths may (windows drive letters)
        match s.rsplit_once(':') {
            Some((path, name)) if !path.is_empty() && !name.is_empty() => {
                Ok(Self { path: path.to_string(), name: name.to_string() })
            }
            _ => Err(LibraryRegistryError::InvalidLibraryId(s.to_string())),
        }
    }
}

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.name)
    }
}
