//! Append-only diagnostic log for hosts without a console.
//!
//! Each event opens the file, appends, and closes it again, so the log can be
//! inspected or deleted while the host process keeps running. Write failures
//! are swallowed: logging must never affect thumbnail generation.

use hfp_core::config::LogConfig;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    path: Arc<PathBuf>,
}

impl DiagnosticLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DiagnosticLog {
            path: Arc::new(path.into()),
        }
    }

    pub fn from_config(config: &LogConfig) -> Self {
        Self::new(config.resolved_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Writer handed out per event.
pub struct DiagnosticWriter {
    path: Arc<PathBuf>,
}

impl Write for DiagnosticWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(self.path.as_path()) {
            let _ = file.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for DiagnosticLog {
    type Writer = DiagnosticWriter;

    fn make_writer(&'a self) -> Self::Writer {
        DiagnosticWriter {
            path: self.path.clone(),
        }
    }
}

/// Install the diagnostic log as the global subscriber, once per process.
///
/// Returns false when logging is disabled or another subscriber is already
/// installed.
pub fn install(config: &LogConfig) -> bool {
    static INSTALLED: OnceLock<bool> = OnceLock::new();
    *INSTALLED.get_or_init(|| {
        if !config.enabled {
            return false;
        }
        let log = DiagnosticLog::from_config(config);
        let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
        let installed = tracing_subscriber::fmt()
            .with_writer(log.clone())
            .with_ansi(false)
            .with_env_filter(filter)
            .try_init()
            .is_ok();
        if installed {
            let exe = std::env::current_exe()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "<unknown>".into());
            tracing::info!(log = %log.path().display(), "component loaded from {exe}");
        }
        installed
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let log = DiagnosticLog::new(dir.path().join("diag.log"));
        let subscriber = tracing_subscriber::fmt()
            .with_writer(log.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("first event");
            tracing::warn!(bytes = 0, "second event");
        });

        let content = std::fs::read_to_string(log.path()).unwrap();
        let first = content.find("first event").unwrap();
        let second = content.find("second event").unwrap();
        assert!(first < second);
        assert!(content.contains("bytes=0"));
    }

    #[test]
    fn unwritable_path_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let log = DiagnosticLog::new(dir.path().join("missing").join("diag.log"));
        let mut w = log.make_writer();
        assert_eq!(w.write(b"dropped").unwrap(), 7);
        w.flush().unwrap();
        assert!(!log.path().exists());
    }

    #[test]
    fn path_from_config() {
        let config = LogConfig {
            path: Some(PathBuf::from("/tmp/custom.log")),
            ..LogConfig::default()
        };
        assert_eq!(DiagnosticLog::from_config(&config).path(), Path::new("/tmp/custom.log"));
    }
}
