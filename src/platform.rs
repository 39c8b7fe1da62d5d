//! # Platforms and Target Selectors
//!
//! Platform tags and `target.<selector>` keys are mapped at load time onto
//! closed enumerations, so matching a target section against a platform set is
//! a total function instead of string comparison.
//!
//! A [`TargetSelector`] is either an aggregate family (`win`/`windows`, `unix`,
//! `linux`, `osx`/`macos`) or one concrete [`Platform`]. A family matches when
//! any platform of the resolved set belongs to it; a concrete selector matches
//! by membership. An empty platform set means "no restriction" and matches
//! every selector.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A concrete platform tag, e.g. `linux-64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Platform {
    Linux32,
    Linux64,
    LinuxAarch64,
    LinuxArmV6l,
    LinuxArmV7l,
    LinuxPpc64le,
    LinuxPpc64,
    LinuxS390X,
    LinuxRiscv32,
    LinuxRiscv64,
    Osx64,
    OsxArm64,
    Win32,
    Win64,
    WinArm64,
    EmscriptenWasm32,
    WasiWasm32,
    NoArch,
}

const PLATFORM_NAMES: [(Platform, &str); 18] = [
    (Platform::Linux32, "linux-32"),
    (Platform::Linux64, "linux-64"),
    (Platform::LinuxAarch64, "linux-aarch64"),
    (Platform::LinuxArmV6l, "linux-armv6l"),
    (Platform::LinuxArmV7l, "linux-armv7l"),
    (Platform::LinuxPpc64le, "linux-ppc64le"),
    (Platform::LinuxPpc64, "linux-ppc64"),
    (Platform::LinuxS390X, "linux-s390x"),
    (Platform::LinuxRiscv32, "linux-riscv32"),
    (Platform::LinuxRiscv64, "linux-riscv64"),
    (Platform::Osx64, "osx-64"),
    (Platform::OsxArm64, "osx-arm64"),
    (Platform::Win32, "win-32"),
    (Platform::Win64, "win-64"),
    (Platform::WinArm64, "win-arm64"),
    (Platform::EmscriptenWasm32, "emscripten-wasm32"),
    (Platform::WasiWasm32, "wasi-wasm32"),
    (Platform::NoArch, "noarch"),
];

impl Platform {
    pub fn as_str(&self) -> &'static str {
        PLATFORM_NAMES
            .iter()
            .find(|(platform, _)| platform == self)
            .map(|(_, name)| *name)
            .unwrap_or("noarch")
    }

    /// The family this platform belongs to, if any.
    pub fn family(&self) -> Option<Family> {
        match self {
            Platform::Linux32
            | Platform::Linux64
            | Platform::LinuxAarch64
            | Platform::LinuxArmV6l
            | Platform::LinuxArmV7l
            | Platform::LinuxPpc64le
            | Platform::LinuxPpc64
            | Platform::LinuxS390X
            | Platform::LinuxRiscv32
            | Platform::LinuxRiscv64 => Some(Family::Linux),
            Platform::Osx64 | Platform::OsxArm64 => Some(Family::Osx),
            Platform::Win32 | Platform::Win64 | Platform::WinArm64 => Some(Family::Win),
            Platform::EmscriptenWasm32 | Platform::WasiWasm32 | Platform::NoArch => None,
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PLATFORM_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(platform, _)| *platform)
            .ok_or_else(|| format!("unknown platform '{}'", s))
    }
}

impl TryFrom<String> for Platform {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Platform> for String {
    fn from(value: Platform) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate platform classes usable as target selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    Win,
    Unix,
    Linux,
    Osx,
}

impl Family {
    /// Whether `platform` is a member of this family.
    pub fn contains(&self, platform: Platform) -> bool {
        match (self, platform.family()) {
            (Family::Unix, Some(Family::Linux | Family::Osx)) => true,
            (family, Some(own)) => *family == own,
            (_, None) => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Win => "win",
            Family::Unix => "unix",
            Family::Linux => "linux",
            Family::Osx => "osx",
        }
    }
}

/// The key of a `target.<selector>` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetSelector {
    Family(Family),
    Platform(Platform),
}

impl TargetSelector {
    /// Whether a section under this selector applies to `platforms`.
    ///
    /// An empty platform set places no restriction and matches everything.
    pub fn matches(&self, platforms: &BTreeSet<Platform>) -> bool {
        if platforms.is_empty() {
            return true;
        }
        match self {
            TargetSelector::Family(family) => platforms.iter().any(|p| family.contains(*p)),
            TargetSelector::Platform(platform) => platforms.contains(platform),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetSelector::Family(family) => family.as_str(),
            TargetSelector::Platform(platform) => platform.as_str(),
        }
    }
}

impl FromStr for TargetSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let family = match s {
            "win" | "windows" => Some(Family::Win),
            "unix" => Some(Family::Unix),
            "linux" => Some(Family::Linux),
            "osx" | "macos" => Some(Family::Osx),
            _ => None,
        };
        match family {
            Some(family) => Ok(TargetSelector::Family(family)),
            None => s
                .parse::<Platform>()
                .map(TargetSelector::Platform)
                .map_err(|_| format!("unknown target selector '{}'", s)),
        }
    }
}

impl TryFrom<String> for TargetSelector {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TargetSelector> for String {
    fn from(value: TargetSelector) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TargetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective platform set of a project.
///
/// An explicit, non-empty override wins. Otherwise the project's own
/// declaration is used, then the first non-empty set among its upstream
/// projects in topological order. An empty result places no restriction.
pub fn resolve_platforms<'a>(
    own: &BTreeSet<Platform>,
    upstream_in_order: impl IntoIterator<Item = &'a BTreeSet<Platform>>,
    explicit: Option<&BTreeSet<Platform>>,
) -> BTreeSet<Platform> {
    if let Some(explicit) = explicit.filter(|set| !set.is_empty()) {
        return explicit.clone();
    }
    if !own.is_empty() {
        return own.clone();
    }
    upstream_in_order
        .into_iter()
        .find(|set| !set.is_empty())
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(platforms: &[Platform]) -> BTreeSet<Platform> {
        platforms.iter().copied().collect()
    }

    #[test]
    fn test_platform_round_trip_names() {
        for (platform, name) in PLATFORM_NAMES {
            assert_eq!(platform.as_str(), name);
            assert_eq!(name.parse::<Platform>().unwrap(), platform);
        }
        assert!("beos-64".parse::<Platform>().is_err());
    }

    #[test]
    fn test_selector_aliases() {
        assert_eq!(
            "windows".parse::<TargetSelector>().unwrap(),
            TargetSelector::Family(Family::Win)
        );
        assert_eq!(
            "macos".parse::<TargetSelector>().unwrap(),
            TargetSelector::Family(Family::Osx)
        );
        assert_eq!(
            "linux-64".parse::<TargetSelector>().unwrap(),
            TargetSelector::Platform(Platform::Linux64)
        );
        assert!("amiga".parse::<TargetSelector>().is_err());
    }

    #[test]
    fn test_family_matching() {
        let linux = set(&[Platform::Linux64]);
        assert!(TargetSelector::Family(Family::Linux).matches(&linux));
        assert!(TargetSelector::Family(Family::Unix).matches(&linux));
        assert!(!TargetSelector::Family(Family::Win).matches(&linux));
        assert!(!TargetSelector::Family(Family::Osx).matches(&linux));

        let mixed = set(&[Platform::Win64, Platform::OsxArm64]);
        assert!(TargetSelector::Family(Family::Win).matches(&mixed));
        assert!(TargetSelector::Family(Family::Unix).matches(&mixed));
        assert!(!TargetSelector::Family(Family::Linux).matches(&mixed));
    }

    #[test]
    fn test_concrete_matching() {
        let platforms = set(&[Platform::Linux64, Platform::Win64]);
        assert!(TargetSelector::Platform(Platform::Win64).matches(&platforms));
        assert!(!TargetSelector::Platform(Platform::Win32).matches(&platforms));
    }

    #[test]
    fn test_empty_set_matches_everything() {
        let empty = BTreeSet::new();
        assert!(TargetSelector::Family(Family::Win).matches(&empty));
        assert!(TargetSelector::Platform(Platform::OsxArm64).matches(&empty));
    }

    #[test]
    fn test_wasm_is_not_unix() {
        let wasm = set(&[Platform::EmscriptenWasm32]);
        assert!(!TargetSelector::Family(Family::Unix).matches(&wasm));
        assert!(TargetSelector::Platform(Platform::EmscriptenWasm32).matches(&wasm));
    }

    #[test]
    fn test_resolve_platforms_precedence() {
        let own = set(&[Platform::Linux64]);
        let upstream = [set(&[]), set(&[Platform::Win64]), set(&[Platform::Osx64])];

        assert_eq!(resolve_platforms(&own, &upstream, None), own);
        assert_eq!(
            resolve_platforms(&BTreeSet::new(), &upstream, None),
            set(&[Platform::Win64])
        );
        assert!(resolve_platforms(&BTreeSet::new(), &[], None).is_empty());

        let explicit = set(&[Platform::OsxArm64]);
        assert_eq!(resolve_platforms(&own, &upstream, Some(&explicit)), explicit);
        assert_eq!(resolve_platforms(&own, &upstream, Some(&BTreeSet::new())), own);
    }
}
