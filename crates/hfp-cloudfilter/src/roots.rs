//! Cloud root registry: the set of local directories owned by sync providers.
//!
//! Sources are merged in a fixed order (personal account, business account,
//! business slots, environment overrides, home defaults, configured roots).
//! Later sources only add roots not already present. Comparison is
//! case-insensitive and separator-agnostic.

use hfp_core::config::CloudConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::environment::{EnvironmentProvider, RootSource, SystemEnvironment};

/// A directory known to be the top of a cloud-sync mount.
#[derive(Debug, Clone, Serialize)]
pub struct CloudRoot {
    pub path: PathBuf,
    pub source: RootSource,
    /// Folded form used for prefix comparison
    #[serde(skip)]
    key: String,
}

impl CloudRoot {
    fn new(path: PathBuf, source: RootSource) -> Self {
        let key = fold_path(&path);
        CloudRoot { path, source, key }
    }

    /// True when `folded` (see [`fold_path`]) is this root or lies beneath it.
    pub fn contains(&self, folded: &str) -> bool {
        match folded.strip_prefix(self.key.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || self.key.ends_with('/'),
            None => false,
        }
    }
}

/// Lowercase a path and unify separators to `/`, without a trailing slash.
pub fn fold_path(path: &Path) -> String {
    let mut folded = path.to_string_lossy().replace('\\', "/").to_lowercase();
    while folded.len() > 1 && folded.ends_with('/') && !folded.ends_with(":/") {
        folded.pop();
    }
    folded
}

/// Lazily discovered, process-lifetime set of cloud roots.
pub struct CloudRootRegistry {
    provider: Box<dyn EnvironmentProvider>,
    business_slots: u32,
    extra_roots: Vec<PathBuf>,
    roots: OnceLock<Vec<CloudRoot>>,
}

impl CloudRootRegistry {
    pub fn new(provider: impl EnvironmentProvider + 'static) -> Self {
        Self::with_config(provider, &CloudConfig::default())
    }

    pub fn with_config(provider: impl EnvironmentProvider + 'static, config: &CloudConfig) -> Self {
        CloudRootRegistry {
            provider: Box::new(provider),
            business_slots: config.business_slots,
            extra_roots: config.extra_roots.clone(),
            roots: OnceLock::new(),
        }
    }

    /// Registry over the live system environment.
    pub fn system(config: &CloudConfig) -> Self {
        Self::with_config(SystemEnvironment, config)
    }

    /// Process-wide registry over the live system with default settings.
    ///
    /// The first caller's discovery is published; concurrent first calls
    /// may both run discovery but only one result is kept.
    pub fn global() -> Arc<CloudRootRegistry> {
        static GLOBAL: OnceLock<Arc<CloudRootRegistry>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(Self::system(&CloudConfig::default())))
            .clone()
    }

    /// Discovered roots, computed on first use and cached.
    pub fn roots(&self) -> &[CloudRoot] {
        self.roots.get_or_init(|| self.discover())
    }

    /// First root containing `path`, if any.
    pub fn find(&self, path: &Path) -> Option<&CloudRoot> {
        let folded = fold_path(path);
        self.roots().iter().find(|root| root.contains(&folded))
    }

    /// Run discovery against every source without touching the cache.
    pub fn discover(&self) -> Vec<CloudRoot> {
        let mut roots: Vec<CloudRoot> = Vec::new();

        let mut sources = vec![RootSource::PersonalAccount, RootSource::BusinessAccount];
        sources.extend((1..=self.business_slots).map(RootSource::BusinessSlot));
        sources.push(RootSource::EnvOverride);
        sources.push(RootSource::HomeDefault);

        for source in sources {
            let candidates = match self.provider.candidates(source) {
                Ok(c) => c,
                Err(e) => {
                    warn!(%source, "skipping cloud root source: {e:#}");
                    continue;
                }
            };
            for candidate in candidates {
                add_candidate(&mut roots, &candidate, source);
            }
        }

        for extra in &self.extra_roots {
            add_candidate(&mut roots, &extra.to_string_lossy(), RootSource::Configured);
        }

        info!(count = roots.len(), "discovered cloud roots");
        roots
    }
}

impl std::fmt::Debug for CloudRootRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudRootRegistry")
            .field("business_slots", &self.business_slots)
            .field("extra_roots", &self.extra_roots)
            .field("roots", &self.roots.get())
            .finish()
    }
}

fn add_candidate(roots: &mut Vec<CloudRoot>, candidate: &str, source: RootSource) {
    let trimmed = candidate.trim().trim_matches('"');
    if trimmed.is_empty() {
        return;
    }

    let path = std::path::absolute(trimmed).unwrap_or_else(|_| PathBuf::from(trimmed));
    if !path.is_dir() {
        debug!(%source, path = %path.display(), "cloud root candidate is not a directory");
        return;
    }

    let root = CloudRoot::new(path, source);
    if roots.iter().any(|r| r.key == root.key) {
        return;
    }
    debug!(%source, path = %root.path.display(), "cloud root");
    roots.push(root);
}
