use serde::{Deserialize, Serialize};

/// Local availability of a file addressed by path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterializationState {
    /// Not inside any cloud-sync location
    NotCloud,
    /// Inside a cloud-sync location and fully present on disk
    Resident,
    /// Cloud-only placeholder; content must be fetched on access
    Placeholder,
    /// Metadata lookup failed; treat as a possible placeholder
    Unknown,
}

impl MaterializationState {
    /// True when content may have to be fetched before it can be trusted.
    pub fn needs_materialization(self) -> bool {
        matches!(self, Self::Placeholder | Self::Unknown)
    }

    /// True for every state reached through a cloud root or path heuristic.
    pub fn is_cloud(self) -> bool {
        !matches!(self, Self::NotCloud)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotCloud => "not_cloud",
            Self::Resident => "resident",
            Self::Placeholder => "placeholder",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for MaterializationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the host should interpret the alpha channel of a returned bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaType {
    #[default]
    Unknown,
    /// Straight RGB, alpha ignored
    Rgb,
    /// Straight (non-premultiplied) ARGB
    Argb,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_is_treated_like_placeholder() {
        assert!(MaterializationState::Unknown.needs_materialization());
        assert!(MaterializationState::Placeholder.needs_materialization());
        assert!(!MaterializationState::Resident.needs_materialization());
        assert!(!MaterializationState::NotCloud.needs_materialization());
    }

    #[test]
    fn cloud_states() {
        assert!(!MaterializationState::NotCloud.is_cloud());
        assert!(MaterializationState::Resident.is_cloud());
        assert!(MaterializationState::Unknown.is_cloud());
    }

    #[test]
    fn display_matches_serde_names() {
        assert_eq!(MaterializationState::NotCloud.to_string(), "not_cloud");
        assert_eq!(MaterializationState::Placeholder.to_string(), "placeholder");
    }
}
