use std::{
    collections::{HashMap, hash_map::Entry},
    fmt,
    str::FromStr,
};

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::{LibraryId, LibraryRegistryError, Result, ZkMissingLibrary};

/// A library that can be deployed, as identified by [`resolve_libraries`].
///
/// Parsed from `path:Name`, or from a bare `Name` matching any path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct DeployableLibrary {
    /// Source file of the library, if known.
    pub path: Option<String>,
    /// Library name.
    pub name: String,
}

impl DeployableLibrary {
    fn matches(&self, path: &str, name: &str) -> bool {
        self.name == name && self.path.as_deref().is_none_or(|own| own == path)
    }
}

impl FromStr for DeployableLibrary {
    type Err = LibraryRegistryError;

    fn from_str(s: &str) -> Result<Self> {
        if s.contains(':') {
            return s.parse::<LibraryId>().map(Into::into);
        }
        if s.is_empty() {
            return Err(LibraryRegistryError::InvalidLibraryId(s.to_string()));
        }
        Ok(Self { path: None, name: s.to_string() })
    }
}

impl fmt::Display for DeployableLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{path}:{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl From<LibraryId> for DeployableLibrary {
    fn from(id: LibraryId) -> Self {
        Self { path: Some(id.path), name: id.name }
    }
}

/// Returns the order in which the recorded libraries have to be deployed.
///
/// Libraries matching `already_deployed` are skipped, and a deployed entry without a path
/// matches a library of that name in any file. Repeated records of the same contract are merged,
/// keeping the position of the first one and the missing libraries of all of them. Every library
/// is placed after all the libraries it depends on.
pub fn resolve_libraries(
    missing_libraries: Vec<ZkMissingLibrary>,
    already_deployed: &[DeployableLibrary],
) -> Result<Vec<DeployableLibrary>> {
    trace!(?missing_libraries, ?already_deployed, "filtering out missing libraries");

    let is_deployed = |path: &str, name: &str| {
        already_deployed.iter().any(|deployed| deployed.matches(path, name))
    };

    // position in `pending` of every recorded contract
    let mut positions: HashMap<LibraryId, usize> = HashMap::new();
    let mut pending: Vec<(LibraryId, Vec<LibraryId>)> =
        Vec::with_capacity(missing_libraries.len());
    for lib in missing_libraries {
        if is_deployed(&lib.contract_path, &lib.contract_name) {
            continue;
        }
        let mut dependencies = lib.dependencies().collect::<Result<Vec<_>>>()?;
        dependencies.retain(|dep| !is_deployed(&dep.path, &dep.name));

        match positions.entry(lib.id()) {
            Entry::Occupied(entry) => {
                // the same contract reported again, possibly with other missing libraries
                let (_, known) = &mut pending[*entry.get()];
                for dep in dependencies {
                    if !known.contains(&dep) {
                        known.push(dep);
                    }
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(pending.len());
                pending.push((lib.id(), dependencies));
            }
        }
    }

    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let Some(ready) = pending.iter().position(|(_, deps)| deps.is_empty()) else {
            warn!(?pending, "unable to find library ready to be deployed");
            return Err(LibraryRegistryError::DependencyCycle(
                pending.iter().map(|(id, _)| id.to_string()).collect(),
            ));
        };
        let (next, _) = pending.remove(ready);

        for (id, deps) in &mut pending {
            deps.retain(|dep| {
                let keep = *dep != next;
                if !keep {
                    debug!(name = id.name, dependency = next.name, "deployed library dependency");
                }
                keep
            });
        }

        ordered.push(next.into());
    }

    Ok(ordered)
}
