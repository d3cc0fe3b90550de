//! On-demand materialization: obtain readable bytes for a possibly
//! cloud-only file.
//!
//! Resident and non-cloud files are opened directly. For placeholders (and
//! paths whose state could not be determined) the flow is:
//!
//! 1. Read a small prefix to make the sync agent start fetching
//! 2. Wait a fixed settle delay
//! 3. Re-classify; open if the file became resident
//! 4. Otherwise open once more as a last resort
//!
//! Every step is bounded: one delay, one retry, no backoff loop. Whether a
//! prefix read fully materializes large files depends on the sync agent, so
//! the trigger is best-effort.

use hfp_core::config::CloudConfig;
use hfp_core::error::KEEP_LOCAL_HINT;
use hfp_core::{HfpError, HfpResult, MaterializationState};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::placeholder::Classifier;

/// Bounds for the materialization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HydrationPolicy {
    /// Bytes read to trigger the sync agent
    pub probe_bytes: usize,
    /// Wait after a successful trigger read before re-checking
    pub settle_delay: Duration,
}

impl Default for HydrationPolicy {
    fn default() -> Self {
        Self::from(&CloudConfig::default())
    }
}

impl From<&CloudConfig> for HydrationPolicy {
    fn from(config: &CloudConfig) -> Self {
        HydrationPolicy {
            probe_bytes: config.probe_bytes.max(1),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
        }
    }
}

/// An opened file and the state it was classified with before opening.
#[derive(Debug)]
pub struct Materialized {
    pub file: File,
    pub state: MaterializationState,
    /// True when the file was only obtained through the last-resort open
    pub last_resort: bool,
}

/// Opens files, materializing cloud placeholders first.
#[derive(Debug)]
pub struct Materializer {
    classifier: Classifier,
    policy: HydrationPolicy,
}

impl Materializer {
    pub fn new(classifier: Classifier, policy: HydrationPolicy) -> Self {
        Materializer { classifier, policy }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn policy(&self) -> HydrationPolicy {
        self.policy
    }

    /// Open `path` for reading, materializing it first if it is a placeholder.
    ///
    /// # Errors
    /// - [`HfpError::SourceUnavailable`] if a non-placeholder file cannot be opened
    /// - [`HfpError::OnDemandUnavailable`] if a placeholder could not be materialized
    pub fn ensure_available(&self, path: &Path) -> HfpResult<Materialized> {
        let state = self.classifier.classify(path);
        debug!(path = %path.display(), %state, "ensuring availability");

        if !state.needs_materialization() {
            let file = File::open(path).map_err(|source| {
                if state.is_cloud() {
                    warn!(path = %path.display(), "cloud file failed to open: {source}; {KEEP_LOCAL_HINT}");
                }
                HfpError::SourceUnavailable {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            return Ok(Materialized {
                file,
                state,
                last_resort: false,
            });
        }

        info!(path = %path.display(), %state, "on-demand file, attempting to materialize");

        match self.trigger(path) {
            Ok(n) => {
                debug!(path = %path.display(), bytes = n, "materialization triggered");
                std::thread::sleep(self.policy.settle_delay);

                let after = self.classifier.classify(path);
                if after == MaterializationState::Resident {
                    if let Ok(file) = File::open(path) {
                        info!(path = %path.display(), "materialized");
                        return Ok(Materialized {
                            file,
                            state,
                            last_resort: false,
                        });
                    }
                }
                debug!(path = %path.display(), state = %after, "still not resident after trigger");
            }
            Err(e) => {
                debug!(path = %path.display(), "trigger read failed: {e}");
            }
        }

        // The sync agent may hydrate on open even when the trigger did not
        // behave as expected.
        match File::open(path) {
            Ok(file) => {
                info!(path = %path.display(), "opened on-demand file on last resort");
                Ok(Materialized {
                    file,
                    state,
                    last_resort: true,
                })
            }
            Err(source) => {
                warn!(path = %path.display(), "on-demand file could not be synced: {source}; {KEEP_LOCAL_HINT}");
                Err(HfpError::OnDemandUnavailable {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    /// Read up to `probe_bytes` from the start of the file. Fails if the file
    /// cannot be opened or yields no bytes.
    fn trigger(&self, path: &Path) -> std::io::Result<usize> {
        let mut file = File::open(path)?;
        let mut buf = vec![0u8; self.policy.probe_bytes];
        let n = file.read(&mut buf)?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "trigger read returned no data",
            ));
        }
        Ok(n)
    }
}
