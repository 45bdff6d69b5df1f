use std::collections::BTreeMap;
use std::path::PathBuf;

use remind_core::{error::PlatformError, ids::IdSequence};

use crate::store::{read_json, update_json, HostPaths};

const DISPLAY_KEY: &str = "display";
const ACTIVATION_KEY: &str = "activation";

type CounterTable = BTreeMap<String, u32>;

/// Id sequence kept in `counters.json`, so every process on the same host
/// home draws from one sequence and never reissues an id a previous
/// process handed out.
#[derive(Debug, Clone)]
pub struct FileSequence {
    path: PathBuf,
    key: &'static str,
}

impl FileSequence {
    pub fn display_ids(paths: &HostPaths) -> Self {
        Self {
            path: paths.counters_file(),
            key: DISPLAY_KEY,
        }
    }

    pub fn activations(paths: &HostPaths) -> Self {
        Self {
            path: paths.counters_file(),
            key: ACTIVATION_KEY,
        }
    }
}

impl IdSequence for FileSequence {
    fn allocate(&self) -> Result<u32, PlatformError> {
        update_json(&self.path, |table: &mut CounterTable| {
            let next = table.entry(self.key.to_owned()).or_insert(0);
            let id = *next;
            *next = next.wrapping_add(1);
            id
        })
        .map_err(|err| PlatformError::Other(format!("{err:#}")))
    }

    fn upcoming(&self) -> Result<u32, PlatformError> {
        let table: CounterTable =
            read_json(&self.path).map_err(|err| PlatformError::Other(format!("{err:#}")))?;
        Ok(table.get(self.key).copied().unwrap_or(0))
    }
}
