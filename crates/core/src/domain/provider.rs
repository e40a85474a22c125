use serde::{Deserialize, Serialize};
use std::fmt;

/// Source a service provider belongs to.
///
/// The derived ordering is the discovery order: core providers are walked
/// first, then the platform, then expansions. A later provider may replace
/// a service an earlier one already built.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCategory {
    Core,
    Platform,
    Expansion,
}

impl ProviderCategory {
    pub const ALL: [ProviderCategory; 3] = [
        ProviderCategory::Core,
        ProviderCategory::Platform,
        ProviderCategory::Expansion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Platform => "platform",
            Self::Expansion => "expansion",
        }
    }
}

impl fmt::Display for ProviderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
