//! # Declaration Model
//!
//! This module defines the schema of a `pixi.devenv.toml` file and the typed,
//! validated [`Project`] built from it.
//!
//! Parsing happens in two steps:
//!
//! 1.  **Raw schema (`Raw*` types)**: a direct `serde` mapping of the TOML text,
//!     accepting the shorthand forms users write (a bare version string for a
//!     spec, a bare path for an upstream entry, a boolean or a list for an
//!     inheritance toggle).
//! 2.  **Validation (`Project::from_raw`)**: normalizes the shorthands, parses
//!     version specifiers, maps platform tags and target keys onto their closed
//!     enumerations and reports any problem as [`Error::Schema`].
//!
//! ## Example
//!
//! ```
//! use std::path::Path;
//! use pixi_devenv::project::{parse, Project};
//!
//! let raw = parse(
//!     r#"
//! [devenv]
//! name = "calc"
//! platforms = ["linux-64"]
//! upstream = ["../core"]
//!
//! [devenv.dependencies]
//! attrs = "*"
//! "#,
//!     Path::new("/ws/calc"),
//! )
//! .unwrap();
//! let project = Project::from_raw(raw, Path::new("/ws/calc")).unwrap();
//! assert_eq!(project.name().as_str(), "calc");
//! assert_eq!(project.upstream()[0].path, "../core");
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::platform::{Platform, TargetSelector};
use crate::version::VersionSpec;

/// Name of the declaration file inside a project directory.
pub const DEVENV_FILE: &str = "pixi.devenv.toml";

/// Unique identifier of a project within a graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProjectName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProjectName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

////// RAW SCHEMA //////

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRoot {
    devenv: RawDeclaration,
}

/// The `[devenv]` table exactly as written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RawDeclaration {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub upstream: Vec<RawUpstream>,
    #[serde(default)]
    pub inherit: RawInheritance,
    #[serde(default)]
    pub dependencies: BTreeMap<String, RawSpec>,
    #[serde(default)]
    pub pypi_dependencies: BTreeMap<String, RawSpec>,
    #[serde(default)]
    pub constraints: BTreeMap<String, RawSpec>,
    #[serde(default)]
    pub env_vars: BTreeMap<String, RawEnvVar>,
    #[serde(default)]
    pub target: BTreeMap<String, RawSection>,
    #[serde(default)]
    pub feature: BTreeMap<String, RawFeature>,
    #[serde(default)]
    pub environments: BTreeMap<String, RawEnvironment>,
}

/// An entry of `upstream`: `"../core"` or `{ path = "../core" }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawUpstream {
    Path(String),
    Table { path: String },
}

/// A package spec: `">=7.2"` or `{ version = ">=7.2", build = "...", channel = "..." }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawSpec {
    Version(String),
    Detailed(RawDetailedSpec),
}

/// The table form of a package spec. Keys other than these are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDetailedSpec {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub build: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

/// An environment variable value.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawEnvVar {
    Scalar(String),
    List(Vec<String>),
    Prepend { prepend: Vec<String> },
    Append { append: Vec<String> },
}

/// An inheritance toggle: `true`, `["core"]`, `{ include = [...] }` or
/// `{ exclude = [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawInherit {
    Bool(bool),
    List(Vec<String>),
    Include { include: Vec<String> },
    Exclude { exclude: Vec<String> },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RawInheritance {
    #[serde(default)]
    pub dependencies: Option<RawInherit>,
    #[serde(default)]
    pub pypi_dependencies: Option<RawInherit>,
    #[serde(default)]
    pub env_vars: Option<RawInherit>,
    #[serde(default)]
    pub features: BTreeMap<String, RawInherit>,
}

/// Dependencies, constraints and env-vars of one scope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RawSection {
    #[serde(default)]
    pub dependencies: BTreeMap<String, RawSpec>,
    #[serde(default)]
    pub pypi_dependencies: BTreeMap<String, RawSpec>,
    #[serde(default)]
    pub constraints: BTreeMap<String, RawSpec>,
    #[serde(default)]
    pub env_vars: BTreeMap<String, RawEnvVar>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RawFeature {
    #[serde(default)]
    pub dependencies: BTreeMap<String, RawSpec>,
    #[serde(default)]
    pub pypi_dependencies: BTreeMap<String, RawSpec>,
    #[serde(default)]
    pub constraints: BTreeMap<String, RawSpec>,
    #[serde(default)]
    pub env_vars: BTreeMap<String, RawEnvVar>,
    #[serde(default)]
    pub target: BTreeMap<String, RawSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawEnvironment {
    Features(Vec<String>),
    Table {
        #[serde(default)]
        features: Vec<String>,
        #[serde(default, rename = "solve-group")]
        solve_group: Option<String>,
        #[serde(default, rename = "no-default-feature")]
        no_default_feature: bool,
    },
}

/// Parse the text of a `pixi.devenv.toml` file into its raw `[devenv]` table.
///
/// `location` is only used for error reporting.
pub fn parse(content: &str, location: &Path) -> Result<RawDeclaration> {
    toml::from_str::<RawRoot>(content)
        .map(|root| root.devenv)
        .map_err(|e| Error::Schema {
            location: location.to_path_buf(),
            message: e.to_string(),
        })
}

////// VALIDATED MODEL //////

/// A reference to an upstream project, relative to the declaring project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub path: String,
}

/// A single package requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Spec {
    pub version: VersionSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl Spec {
    /// A spec with only a version constraint.
    pub fn from_version(version: VersionSpec) -> Self {
        Self {
            version,
            build: None,
            channel: None,
        }
    }

    pub fn is_version_only(&self) -> bool {
        self.build.is_none() && self.channel.is_none()
    }
}

/// How list values combine with the inherited value of the same variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListDirection {
    /// New values go in front of the inherited ones.
    #[default]
    Prepend,
    /// New values go after the inherited ones.
    Append,
}

/// Value of an environment variable.
///
/// A scalar sets the variable. A list holds path-like entries that are joined
/// with the platform separator when rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EnvVarValue {
    Scalar(String),
    List {
        values: Vec<String>,
        direction: ListDirection,
    },
}

/// Declarations of one scope: dependencies, constraints and env-vars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub dependencies: BTreeMap<String, Spec>,
    pub pypi_dependencies: BTreeMap<String, Spec>,
    pub constraints: BTreeMap<String, Spec>,
    pub env_vars: BTreeMap<String, EnvVarValue>,
}

/// An unscoped base section plus platform-targeted sections layered on top.
///
/// Used both for a project's defaults and for each of its features.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aspect {
    pub base: Section,
    pub targets: BTreeMap<TargetSelector, Section>,
}

impl Aspect {
    /// Target sections whose selector applies to `platforms`.
    ///
    /// A target section that does not match is left out entirely.
    pub fn applicable_targets<'a>(
        &'a self,
        platforms: &'a BTreeSet<Platform>,
    ) -> impl Iterator<Item = (&'a TargetSelector, &'a Section)> + 'a {
        self.targets
            .iter()
            .filter(move |(selector, _)| selector.matches(platforms))
    }
}

/// Which upstream projects a category is inherited from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InheritMode {
    #[default]
    All,
    None,
    OnlyFrom(BTreeSet<ProjectName>),
    Except(BTreeSet<ProjectName>),
}

impl InheritMode {
    /// Whether contributions of `project` are inherited.
    pub fn allows(&self, project: &ProjectName) -> bool {
        match self {
            InheritMode::All => true,
            InheritMode::None => false,
            InheritMode::OnlyFrom(names) => names.contains(project),
            InheritMode::Except(names) => !names.contains(project),
        }
    }

    /// Project names referenced by this mode.
    pub fn named_projects(&self) -> impl Iterator<Item = &ProjectName> {
        let names = match self {
            InheritMode::OnlyFrom(names) | InheritMode::Except(names) => Some(names),
            InheritMode::All | InheritMode::None => None,
        };
        names.into_iter().flatten()
    }

    fn from_raw(raw: Option<RawInherit>, default: InheritMode) -> Self {
        let names = |list: Vec<String>| list.into_iter().map(ProjectName::from).collect();
        match raw {
            None => default,
            Some(RawInherit::Bool(true)) => InheritMode::All,
            Some(RawInherit::Bool(false)) => InheritMode::None,
            Some(RawInherit::List(list)) | Some(RawInherit::Include { include: list }) => {
                InheritMode::OnlyFrom(names(list))
            }
            Some(RawInherit::Exclude { exclude }) => InheritMode::Except(names(exclude)),
        }
    }
}

/// Inheritance toggles of a project.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Inheritance {
    pub dependencies: InheritMode,
    pub pypi_dependencies: InheritMode,
    pub env_vars: InheritMode,
    /// Upstream features to fold into the starting project. Empty by default.
    pub features: BTreeMap<String, InheritMode>,
}

/// An environment definition, passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solve_group: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_default_feature: bool,
}

/// One validated project declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    name: ProjectName,
    location: PathBuf,
    channels: Vec<String>,
    platforms: BTreeSet<Platform>,
    upstream: Vec<Upstream>,
    inherit: Inheritance,
    defaults: Aspect,
    features: BTreeMap<String, Aspect>,
    environments: BTreeMap<String, Environment>,
}

impl Project {
    /// Validate a raw declaration loaded from `location`.
    pub fn from_raw(raw: RawDeclaration, location: &Path) -> Result<Self> {
        let schema_error = |message: String| Error::Schema {
            location: location.to_path_buf(),
            message,
        };

        let name = match raw.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => ProjectName::from(name),
            _ => return Err(schema_error("missing required field 'name'".to_string())),
        };

        let platforms = raw
            .platforms
            .iter()
            .map(|p| p.parse::<Platform>())
            .collect::<std::result::Result<BTreeSet<_>, _>>()
            .map_err(schema_error)?;

        let upstream = raw
            .upstream
            .into_iter()
            .map(|entry| {
                let path = match entry {
                    RawUpstream::Path(path) | RawUpstream::Table { path } => path,
                };
                if path.trim().is_empty() {
                    Err(schema_error("upstream entries must be non-empty paths".to_string()))
                } else {
                    Ok(Upstream { path })
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let inherit = Inheritance {
            dependencies: InheritMode::from_raw(raw.inherit.dependencies, InheritMode::All),
            pypi_dependencies: InheritMode::from_raw(
                raw.inherit.pypi_dependencies,
                InheritMode::All,
            ),
            env_vars: InheritMode::from_raw(raw.inherit.env_vars, InheritMode::All),
            features: raw
                .inherit
                .features
                .into_iter()
                .map(|(feature, mode)| (feature, InheritMode::from_raw(Some(mode), InheritMode::None)))
                .collect(),
        };

        let defaults = build_aspect(
            RawSection {
                dependencies: raw.dependencies,
                pypi_dependencies: raw.pypi_dependencies,
                constraints: raw.constraints,
                env_vars: raw.env_vars,
            },
            raw.target,
        )
        .map_err(schema_error)?;

        let features = raw
            .feature
            .into_iter()
            .map(|(feature_name, feature)| {
                let aspect = build_aspect(
                    RawSection {
                        dependencies: feature.dependencies,
                        pypi_dependencies: feature.pypi_dependencies,
                        constraints: feature.constraints,
                        env_vars: feature.env_vars,
                    },
                    feature.target,
                )
                .map_err(|message| schema_error(format!("feature '{}': {}", feature_name, message)))?;
                Ok((feature_name, aspect))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        let environments = raw
            .environments
            .into_iter()
            .map(|(env_name, env)| {
                let env = match env {
                    RawEnvironment::Features(features) => Environment {
                        features,
                        solve_group: None,
                        no_default_feature: false,
                    },
                    RawEnvironment::Table {
                        features,
                        solve_group,
                        no_default_feature,
                    } => Environment {
                        features,
                        solve_group,
                        no_default_feature,
                    },
                };
                (env_name, env)
            })
            .collect();

        Ok(Self {
            name,
            location: location.to_path_buf(),
            channels: raw.channels,
            platforms,
            upstream,
            inherit,
            defaults,
            features,
            environments,
        })
    }

    pub fn name(&self) -> &ProjectName {
        &self.name
    }

    /// Directory the declaration was loaded from.
    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Platforms declared by this project itself (possibly empty).
    pub fn platforms(&self) -> &BTreeSet<Platform> {
        &self.platforms
    }

    pub fn upstream(&self) -> &[Upstream] {
        &self.upstream
    }

    pub fn inherit(&self) -> &Inheritance {
        &self.inherit
    }

    pub fn defaults(&self) -> &Aspect {
        &self.defaults
    }

    pub fn features(&self) -> &BTreeMap<String, Aspect> {
        &self.features
    }

    pub fn environments(&self) -> &BTreeMap<String, Environment> {
        &self.environments
    }
}

fn build_aspect(
    base: RawSection,
    targets: BTreeMap<String, RawSection>,
) -> std::result::Result<Aspect, String> {
    let base = build_section(base)?;
    let targets = targets
        .into_iter()
        .map(|(selector, section)| {
            let parsed = selector.parse::<TargetSelector>()?;
            let section =
                build_section(section).map_err(|e| format!("target '{}': {}", selector, e))?;
            Ok((parsed, section))
        })
        .collect::<std::result::Result<BTreeMap<_, _>, String>>()?;
    Ok(Aspect { base, targets })
}

fn build_section(raw: RawSection) -> std::result::Result<Section, String> {
    Ok(Section {
        dependencies: build_specs(raw.dependencies)?,
        pypi_dependencies: build_specs(raw.pypi_dependencies)?,
        constraints: build_specs(raw.constraints)?,
        env_vars: raw
            .env_vars
            .into_iter()
            .map(|(name, value)| (name, build_env_var(value)))
            .collect(),
    })
}

fn build_specs(raw: BTreeMap<String, RawSpec>) -> std::result::Result<BTreeMap<String, Spec>, String> {
    raw.into_iter()
        .map(|(package, spec)| {
            let (version, build, channel) = match spec {
                RawSpec::Version(version) => (version, None, None),
                RawSpec::Detailed(RawDetailedSpec {
                    version,
                    build,
                    channel,
                }) => (version.unwrap_or_else(|| "*".to_string()), build, channel),
            };
            let version = VersionSpec::parse(&version)
                .map_err(|e| format!("package '{}': {}", package, e))?;
            let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
            Ok((
                package,
                Spec {
                    version,
                    build: non_empty(build),
                    channel: non_empty(channel),
                },
            ))
        })
        .collect()
}

fn build_env_var(raw: RawEnvVar) -> EnvVarValue {
    match raw {
        RawEnvVar::Scalar(value) => EnvVarValue::Scalar(value),
        RawEnvVar::List(values) | RawEnvVar::Prepend { prepend: values } => EnvVarValue::List {
            values,
            direction: ListDirection::Prepend,
        },
        RawEnvVar::Append { append } => EnvVarValue::List {
            values: append,
            direction: ListDirection::Append,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Family;

    const COMPLETE: &str = r#"
[devenv]
name = "gui"
channels = ["conda-forge", "company"]
platforms = ["win-64", "linux-64"]
upstream = [
    "../core",
    { path = "../calc" }
]

[devenv.inherit]
dependencies = false
pypi-dependencies = ["core"]
env-vars = { exclude = ["calc"] }

[devenv.inherit.features]
py310 = true
py310-test = ["core"]

[devenv.dependencies]
boltons = "*"
pytest = { version = "*", build = "a" }

[devenv.pypi-dependencies]
pytest-mock = "*"

[devenv.constraints]
qt = ">=5.15"

[devenv.target.win.dependencies]
pywin32 = ">=3.20"

[devenv.target.win.constraints]
vc = ">=14"

[devenv.env-vars]
PYTHONPATH = ['{{ devenv_project_dir }}/src']
PATH = { append = ["{{ devenv_project_dir }}/bin"] }
JOBS = "6"

[devenv.feature.python310]
dependencies = { python = "3.10.*" }
constraints = { mypy = ">=1.15" }
env-vars = { CONDA_PY = "310" }

[devenv.feature.compile.target.unix.dependencies]
rhash = { version = ">=1.4.3", channel = "https://company.com/get/conda-forge" }

[devenv.environments]
default = ["python310"]
ci = { features = ["python310", "compile"], solve-group = "default" }
"#;

    fn load(content: &str) -> Result<Project> {
        let location = Path::new("/ws/gui");
        Project::from_raw(parse(content, location)?, location)
    }

    #[test]
    fn test_parse_complete_declaration() {
        let project = load(COMPLETE).unwrap();

        assert_eq!(project.name().as_str(), "gui");
        assert_eq!(project.location(), Path::new("/ws/gui"));
        assert_eq!(project.channels(), ["conda-forge", "company"]);
        assert!(project.platforms().contains(&Platform::Win64));
        assert_eq!(
            project.upstream(),
            [
                Upstream {
                    path: "../core".to_string()
                },
                Upstream {
                    path: "../calc".to_string()
                }
            ]
        );

        let inherit = project.inherit();
        assert_eq!(inherit.dependencies, InheritMode::None);
        assert!(inherit.pypi_dependencies.allows(&ProjectName::from("core")));
        assert!(!inherit.pypi_dependencies.allows(&ProjectName::from("calc")));
        assert!(!inherit.env_vars.allows(&ProjectName::from("calc")));
        assert_eq!(inherit.features["py310"], InheritMode::All);

        let base = &project.defaults().base;
        assert_eq!(base.dependencies["pytest"].build.as_deref(), Some("a"));
        assert!(base.dependencies["boltons"].version.is_any());
        assert_eq!(base.constraints["qt"].version.as_str(), ">=5.15");
        assert_eq!(base.env_vars["JOBS"], EnvVarValue::Scalar("6".to_string()));
        assert_eq!(
            base.env_vars["PATH"],
            EnvVarValue::List {
                values: vec!["{{ devenv_project_dir }}/bin".to_string()],
                direction: ListDirection::Append,
            }
        );

        let win = &project.defaults().targets[&TargetSelector::Family(Family::Win)];
        assert!(win.dependencies.contains_key("pywin32"));
        assert!(win.constraints.contains_key("vc"));

        let compile = &project.features()["compile"];
        let unix = &compile.targets[&TargetSelector::Family(Family::Unix)];
        assert_eq!(
            unix.dependencies["rhash"].channel.as_deref(),
            Some("https://company.com/get/conda-forge")
        );

        assert_eq!(project.environments()["default"].features, ["python310"]);
        assert_eq!(
            project.environments()["ci"].solve_group.as_deref(),
            Some("default")
        );
    }

    #[test]
    fn test_missing_name_is_schema_error() {
        let error = load("[devenv]\nchannels = []\n").unwrap_err();
        assert!(matches!(error, Error::Schema { .. }));
        assert!(error.to_string().contains("name"));
    }

    #[test]
    fn test_unknown_platform_is_schema_error() {
        let error = load("[devenv]\nname = \"a\"\nplatforms = [\"beos-64\"]\n").unwrap_err();
        assert!(matches!(error, Error::Schema { .. }));
        assert!(error.to_string().contains("beos-64"));
    }

    #[test]
    fn test_unknown_target_is_schema_error() {
        let error = load(
            "[devenv]\nname = \"a\"\n[devenv.target.amiga.dependencies]\nfoo = \"*\"\n",
        )
        .unwrap_err();
        assert!(error.to_string().contains("amiga"));
    }

    #[test]
    fn test_empty_upstream_is_schema_error() {
        let error = load("[devenv]\nname = \"a\"\nupstream = [\"\"]\n").unwrap_err();
        assert!(error.to_string().contains("upstream"));
    }

    #[test]
    fn test_malformed_upstream_is_schema_error() {
        let error = load("[devenv]\nname = \"a\"\nupstream = [42]\n").unwrap_err();
        assert!(matches!(error, Error::Schema { .. }));
    }

    #[test]
    fn test_invalid_version_is_schema_error() {
        let error = load("[devenv]\nname = \"a\"\n[devenv.dependencies]\nfoo = \">=1..2\"\n")
            .unwrap_err();
        assert!(matches!(error, Error::Schema { .. }));
        assert!(error.to_string().contains("foo"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let error = load("[devenv]\nname = \"a\"\npypy-dependencies = {}\n").unwrap_err();
        assert!(matches!(error, Error::Schema { .. }));
    }

    #[test]
    fn test_feature_inheritance_defaults_to_nothing() {
        let project = load("[devenv]\nname = \"a\"\n").unwrap();
        assert!(project.inherit().features.is_empty());
        assert_eq!(project.inherit().dependencies, InheritMode::All);
    }

    #[test]
    fn test_unknown_spec_key_is_rejected() {
        let error = load(
            "[devenv]\nname = \"a\"\n[devenv.pypi-dependencies]\nrequests = { version = \"*\", extras = [\"socks\"] }\n",
        )
        .unwrap_err();
        assert!(matches!(error, Error::Schema { .. }));
    }

    #[test]
    fn test_detailed_spec_defaults_version() {
        let project = load(
            "[devenv]\nname = \"a\"\n[devenv.dependencies]\nqt = { channel = \"qt-channel\" }\n",
        )
        .unwrap();
        let qt = &project.defaults().base.dependencies["qt"];
        assert_eq!(qt.version.as_str(), "*");
        assert_eq!(qt.channel.as_deref(), Some("qt-channel"));
    }

    #[test]
    fn test_applicable_targets_filters_by_platform() {
        let project = load(COMPLETE).unwrap();
        let linux: BTreeSet<Platform> = [Platform::Linux64].into_iter().collect();
        assert_eq!(project.defaults().applicable_targets(&linux).count(), 0);

        let windows: BTreeSet<Platform> = [Platform::Win64].into_iter().collect();
        assert_eq!(project.defaults().applicable_targets(&windows).count(), 1);
    }
}
