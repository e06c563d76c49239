use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::SharedApplication;
use crate::error::{PartylineError, Result};

/// Where a request path lands in the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Matched mount key, `None` when the default application takes it
    pub mount: Option<String>,
    /// Portion of the path consumed by the mount
    pub script: String,
    /// Portion left for the application
    pub path_info: String,
}

/// Sub-path to application mapping, fixed once built.
///
/// Keeps the order mounts were given in so invitations go out in a
/// predictable order.
#[derive(Clone, Default)]
pub struct MountTable {
    entries: Vec<(String, SharedApplication)>,
    index: HashMap<String, usize>,
}

impl fmt::Debug for MountTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(key, _)| key))
            .finish()
    }
}

impl MountTable {
    /// Build a table; every key must start with `/`.
    ///
    /// A repeated key replaces the earlier application.
    pub fn new<I, K>(mounts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, SharedApplication)>,
        K: Into<String>,
    {
        let mut table = MountTable::default();
        for (key, app) in mounts {
            let key = key.into();
            if !key.starts_with('/') {
                return Err(PartylineError::InvalidMount { mount: key });
            }
            if let Some(&slot) = table.index.get(&key) {
                warn!(mount = %key, "Replaced existing mount");
                table.entries[slot].1 = app;
                continue;
            }
            info!(mount = %key, total_mounts = table.entries.len() + 1, "Application mounted");
            table.index.insert(key.clone(), table.entries.len());
            table.entries.push((key, app));
        }
        Ok(table)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SharedApplication> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mount keys in the order they were given
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Mounted applications in mount order, as shared handles
    pub fn applications(&self) -> impl Iterator<Item = (&str, SharedApplication)> {
        self.entries
            .iter()
            .map(|(key, app)| (key.as_str(), Arc::clone(app)))
    }

    /// Find the most specific mount for `path`.
    ///
    /// Walks from the full path toward the root, moving one trailing
    /// segment at a time from `script` to `path_info` and checking `script`
    /// against the table at every step. Once no `/` is left, the remaining
    /// `script` (normally empty) gets one exact lookup before falling back
    /// to the default application. `script + path_info == path` always.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Resolution {
        let mut script = path.to_string();
        let mut path_info = String::new();

        while let Some(cut) = script.rfind('/') {
            if self.index.contains_key(&script) {
                return Resolution {
                    mount: Some(script.clone()),
                    script,
                    path_info,
                };
            }
            let segment = script.split_off(cut);
            path_info.insert_str(0, &segment);
        }

        let mount = self.index.contains_key(&script).then(|| script.clone());
        Resolution {
            mount,
            script,
            path_info,
        }
    }
}
