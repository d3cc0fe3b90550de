//! Environment providers: where cloud root candidates come from.
//!
//! Each [`RootSource`] is queried independently so that an unreadable
//! registry key or a missing variable never hides the other sources.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Registry key holding the provider's per-account configuration.
pub const ACCOUNTS_KEY: &str = r"Software\Microsoft\OneDrive\Accounts";

/// Registry key of the sync client itself.
pub const CLIENT_KEY: &str = r"Software\Microsoft\OneDrive";

/// Environment variables that declare sync roots directly.
pub const ROOT_ENV_VARS: [&str; 3] = ["OneDriveCommercial", "OneDriveConsumer", "OneDrive"];

/// Conventional root folder names under the user's home directory.
pub const HOME_DEFAULT_FOLDERS: [&str; 2] = ["OneDrive", "OneDrive - Personal"];

/// One origin of cloud root candidates, queried in discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootSource {
    /// Primary personal account folder
    PersonalAccount,
    /// Primary business account folder
    BusinessAccount,
    /// Secondary business account slot (1-based)
    BusinessSlot(u32),
    /// Commercial/consumer environment overrides
    EnvOverride,
    /// Default folder names under the home directory
    HomeDefault,
    /// Roots listed in the configuration file
    Configured,
}

impl std::fmt::Display for RootSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PersonalAccount => f.write_str("personal account"),
            Self::BusinessAccount => f.write_str("business account"),
            Self::BusinessSlot(n) => write!(f, "business slot {n}"),
            Self::EnvOverride => f.write_str("environment"),
            Self::HomeDefault => f.write_str("home default"),
            Self::Configured => f.write_str("configured"),
        }
    }
}

/// Supplies raw candidate strings for each root source.
///
/// Candidates are unvalidated; the registry drops empty entries and paths
/// that are not existing directories.
pub trait EnvironmentProvider: Send + Sync {
    fn candidates(&self, source: RootSource) -> Result<Vec<String>>;
}

/// Reads the live system: registry (Windows only), environment variables,
/// and the user's home directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnvironment;

impl SystemEnvironment {
    fn home_dir() -> Option<PathBuf> {
        ["USERPROFILE", "HOME"]
            .iter()
            .filter_map(|var| std::env::var_os(var))
            .find(|v| !v.is_empty())
            .map(PathBuf::from)
    }
}

impl EnvironmentProvider for SystemEnvironment {
    fn candidates(&self, source: RootSource) -> Result<Vec<String>> {
        match source {
            RootSource::PersonalAccount => registry::personal_folder(),
            RootSource::BusinessAccount => registry::account_folder("Business1"),
            RootSource::BusinessSlot(n) => registry::account_folder(&format!("Business{n}")),
            RootSource::EnvOverride => Ok(ROOT_ENV_VARS
                .iter()
                .filter_map(|var| std::env::var(var).ok())
                .collect()),
            RootSource::HomeDefault => Ok(Self::home_dir()
                .map(|home| {
                    HOME_DEFAULT_FOLDERS
                        .iter()
                        .map(|name| home.join(name).to_string_lossy().into_owned())
                        .collect()
                })
                .unwrap_or_default()),
            // Configured roots come from HfpConfig, not from the environment
            RootSource::Configured => Ok(Vec::new()),
        }
    }
}

/// Fixed candidates per source, for deterministic discovery in tests and
/// for hosts that resolve account configuration themselves.
#[derive(Debug, Default, Clone)]
pub struct StaticEnvironment {
    entries: HashMap<RootSource, std::result::Result<Vec<String>, String>>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add candidates for a source.
    pub fn with(mut self, source: RootSource, candidates: Vec<String>) -> Self {
        self.entries.insert(source, Ok(candidates));
        self
    }

    /// Make a source fail when queried.
    pub fn failing(mut self, source: RootSource, message: &str) -> Self {
        self.entries.insert(source, Err(message.to_string()));
        self
    }
}

impl EnvironmentProvider for StaticEnvironment {
    fn candidates(&self, source: RootSource) -> Result<Vec<String>> {
        match self.entries.get(&source) {
            Some(Ok(list)) => Ok(list.clone()),
            Some(Err(msg)) => anyhow::bail!("{source}: {msg}"),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(target_os = "windows")]
mod registry {
    use anyhow::Result;
    use windows::core::HSTRING;
    use windows::Win32::Foundation::{ERROR_FILE_NOT_FOUND, ERROR_SUCCESS};
    use windows::Win32::System::Registry::{RegGetValueW, HKEY_CURRENT_USER, RRF_RT_REG_SZ};

    use super::{ACCOUNTS_KEY, CLIENT_KEY};

    /// Personal account: `UserFolder`, then `PersonalFolder`, then the client key.
    pub fn personal_folder() -> Result<Vec<String>> {
        let personal = format!(r"{ACCOUNTS_KEY}\Personal");
        for (key, value) in [
            (personal.as_str(), "UserFolder"),
            (personal.as_str(), "PersonalFolder"),
            (CLIENT_KEY, "UserFolder"),
        ] {
            if let Some(path) = read_user_string(key, value)? {
                return Ok(vec![path]);
            }
        }
        Ok(Vec::new())
    }

    /// `UserFolder` of a named account (`Business1`, `Business2`, ...).
    pub fn account_folder(account: &str) -> Result<Vec<String>> {
        let key = format!(r"{ACCOUNTS_KEY}\{account}");
        Ok(read_user_string(&key, "UserFolder")?.into_iter().collect())
    }

    fn read_user_string(subkey: &str, value: &str) -> Result<Option<String>> {
        let subkey_w = HSTRING::from(subkey);
        let value_w = HSTRING::from(value);

        let mut size: u32 = 0;
        let status = unsafe {
            RegGetValueW(
                HKEY_CURRENT_USER,
                &subkey_w,
                &value_w,
                RRF_RT_REG_SZ,
                None,
                None,
                Some(&mut size as *mut u32),
            )
        };
        if status == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        if status != ERROR_SUCCESS {
            anyhow::bail!("reading HKCU\\{subkey}\\{value}: error {}", status.0);
        }

        let mut buf = vec![0u16; (size as usize).div_ceil(2)];
        let status = unsafe {
            RegGetValueW(
                HKEY_CURRENT_USER,
                &subkey_w,
                &value_w,
                RRF_RT_REG_SZ,
                None,
                Some(buf.as_mut_ptr().cast()),
                Some(&mut size as *mut u32),
            )
        };
        if status != ERROR_SUCCESS {
            anyhow::bail!("reading HKCU\\{subkey}\\{value}: error {}", status.0);
        }

        let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
        let text = String::from_utf16_lossy(&buf[..len]);
        Ok((!text.is_empty()).then_some(text))
    }
}

#[cfg(not(target_os = "windows"))]
mod registry {
    use anyhow::Result;

    pub fn personal_folder() -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    pub fn account_folder(_account: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_environment_returns_configured_candidates() {
        let env = StaticEnvironment::new()
            .with(RootSource::PersonalAccount, vec!["/a".into()])
            .failing(RootSource::EnvOverride, "denied");

        assert_eq!(env.candidates(RootSource::PersonalAccount).unwrap(), vec!["/a"]);
        assert!(env.candidates(RootSource::BusinessAccount).unwrap().is_empty());
        let err = env.candidates(RootSource::EnvOverride).unwrap_err();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn system_environment_never_lists_configured_roots() {
        assert!(SystemEnvironment
            .candidates(RootSource::Configured)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn source_display() {
        assert_eq!(RootSource::BusinessSlot(3).to_string(), "business slot 3");
        assert_eq!(RootSource::HomeDefault.to_string(), "home default");
    }
}
