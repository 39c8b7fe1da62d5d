//! Phase 4: Writing `pixi.toml`
//!
//! This is the final phase of the `pixi-devenv` pipeline. It renders a
//! [`ConsolidatedProject`] into the `pixi.toml` next to the starting project,
//! editing the existing document in place so hand-written content survives.
//!
//! ## Process
//!
//! 1.  **Workspace fields**: `[workspace]` `name`, `channels` and `platforms`
//!     are set. A missing `[workspace]` table is created. An empty platform set
//!     leaves the existing `platforms` untouched.
//!
//! 2.  **Managed tables**: `dependencies`, `pypi-dependencies`, `activation.env`,
//!     `target`, `feature` and `environments` are replaced as a whole and marked
//!     with a `# Managed by devenv` comment. A managed table that no longer has
//!     content is removed. Each dependency carries a `# From: ...` comment
//!     naming the projects it came from.
//!
//! 3.  **Env vars**: Plain scalars go to `activation.env`. Lists and values that
//!     reference other variables are shell specific and are rendered under
//!     `target.unix` and `target.win`, with the current value of the variable
//!     appended to lists.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use toml_edit::{value, Array, DocumentMut, InlineTable, Item, Table, Value};

use super::consolidate::{ConsolidatedProject, MergedAspect, MergedSection};
use crate::error::Result;
use crate::merge::{merge_env_var, MergedEnvVar, MergedSpec};
use crate::project::{EnvVarValue, Environment};

/// Comment attached to every table and field owned by `pixi-devenv`.
pub const MANAGED_COMMENT: &str = "Managed by devenv";

/// Name of the downstream manager's configuration file.
pub const PIXI_FILE: &str = "pixi.toml";

const MANAGED_TABLES: [&str; 5] = [
    "dependencies",
    "pypi-dependencies",
    "target",
    "feature",
    "environments",
];

static VARIABLE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap()
});

/// Render `project` into the `pixi.toml` document `existing`.
pub fn render(existing: &str, project: &ConsolidatedProject) -> Result<String> {
    let mut doc = existing.parse::<DocumentMut>()?;

    update_workspace(&mut doc, project);

    let mut tables = aspect_tables(&project.defaults);
    if !project.features.is_empty() {
        let mut features = managed_table();
        for (name, aspect) in &project.features {
            let AspectTables {
                managed,
                activation_env,
            } = aspect_tables(aspect);
            let mut feature = managed_table();
            for (key, item) in managed {
                feature.insert(key, item);
            }
            if let Some(env) = activation_env {
                let mut activation = managed_table();
                activation.insert("env", env);
                feature.insert("activation", Item::Table(activation));
            }
            features.insert(name, Item::Table(feature));
        }
        tables.managed.push(("feature", Item::Table(features)));
    }
    if !project.environments.is_empty() {
        tables
            .managed
            .push(("environments", environments_table(&project.environments)));
    }

    let root = doc.as_table_mut();
    for key in MANAGED_TABLES {
        if is_managed(root.get(key)) {
            root.remove(key);
        }
    }
    for (key, item) in tables.managed {
        root.insert(key, item);
    }
    update_activation_env(root, tables.activation_env);

    Ok(doc.to_string())
}

/// Render `project` into `<dir>/pixi.toml` and write it back.
pub fn execute(dir: &Path, project: &ConsolidatedProject) -> Result<String> {
    let file = dir.join(PIXI_FILE);
    let existing = fs::read_to_string(&file)?;
    let rendered = render(&existing, project)?;
    if rendered != existing {
        fs::write(&file, &rendered)?;
    }
    Ok(rendered)
}

fn update_workspace(doc: &mut DocumentMut, project: &ConsolidatedProject) {
    let root = doc.as_table_mut();
    if !root.get("workspace").is_some_and(Item::is_table) {
        root.insert("workspace", Item::Table(Table::new()));
    }
    let workspace = &mut doc["workspace"];

    workspace["name"] = managed_value(project.name.as_str().into());
    workspace["channels"] = managed_value(Value::Array(
        project.channels.iter().map(String::as_str).collect::<Array>(),
    ));
    if !project.platforms.is_empty() {
        workspace["platforms"] = managed_value(Value::Array(
            project.platforms.iter().map(|p| p.as_str()).collect::<Array>(),
        ));
    } else if let Some(table) = workspace.as_table_mut() {
        if is_managed_value(table.get("platforms")) {
            table.remove("platforms");
        }
    }
}

fn update_activation_env(root: &mut Table, env: Option<Item>) {
    if is_managed(root.get("activation")) {
        root.remove("activation");
    }

    let Some(env) = env else {
        if let Some(activation) = root.get_mut("activation").and_then(Item::as_table_mut) {
            if is_managed(activation.get("env")) {
                activation.remove("env");
            }
        }
        return;
    };

    if !root.get("activation").is_some_and(Item::is_table) {
        root.insert("activation", Item::Table(managed_table()));
    }
    if let Some(activation) = root.get_mut("activation").and_then(Item::as_table_mut) {
        activation.insert("env", env);
    }
}

/// Tables rendered from one aspect.
struct AspectTables {
    managed: Vec<(&'static str, Item)>,
    activation_env: Option<Item>,
}

fn aspect_tables(aspect: &MergedAspect) -> AspectTables {
    let mut managed = Vec::new();
    if let Some(table) = dependencies_table(&aspect.base.dependencies) {
        managed.push(("dependencies", table));
    }
    if let Some(table) = dependencies_table(&aspect.base.pypi_dependencies) {
        managed.push(("pypi-dependencies", table));
    }

    let (generic, shell_specific) = split_env_vars(&aspect.base.env_vars);
    let activation_env = (!generic.is_empty()).then(|| {
        let mut env = managed_table();
        for (name, text) in generic {
            env.insert(name, value(text));
        }
        Item::Table(env)
    });

    let mut targets: BTreeMap<String, (Option<&MergedSection>, BTreeMap<String, MergedEnvVar>)> =
        BTreeMap::new();
    for (selector, section) in &aspect.target {
        targets.insert(
            selector.to_string(),
            (Some(section), section.env_vars.clone()),
        );
    }
    if !shell_specific.is_empty() {
        for shell in [Shell::Unix, Shell::Windows] {
            let (_, env_vars) = targets.entry(shell.target().to_string()).or_default();
            for (name, inherited) in &shell_specific {
                let merged = match env_vars.remove(*name) {
                    Some(own) => merge_env_var(Some((*inherited).clone()), own),
                    None => (*inherited).clone(),
                };
                env_vars.insert(name.to_string(), merged);
            }
        }
    }

    if !targets.is_empty() {
        let mut target_table = managed_table();
        for (name, (section, env_vars)) in targets {
            let mut table = managed_table();
            if let Some(section) = section {
                if let Some(deps) = dependencies_table(&section.dependencies) {
                    table.insert("dependencies", deps);
                }
                if let Some(deps) = dependencies_table(&section.pypi_dependencies) {
                    table.insert("pypi-dependencies", deps);
                }
            }
            if !env_vars.is_empty() {
                let mut activation = managed_table();
                activation.insert("env", render_env(Shell::for_target(&name), &env_vars));
                table.insert("activation", Item::Table(activation));
            }
            target_table.insert(&name, Item::Table(table));
        }
        managed.push(("target", Item::Table(target_table)));
    }

    AspectTables {
        managed,
        activation_env,
    }
}

fn dependencies_table(dependencies: &BTreeMap<String, MergedSpec>) -> Option<Item> {
    if dependencies.is_empty() {
        return None;
    }
    let mut table = managed_table();
    for (name, merged) in dependencies {
        let spec = &merged.spec;
        let mut rendered = if spec.is_version_only() {
            Value::from(spec.version.as_str())
        } else {
            let mut inline = InlineTable::new();
            inline.insert("version", spec.version.as_str().into());
            if let Some(build) = &spec.build {
                inline.insert("build", build.as_str().into());
            }
            if let Some(channel) = &spec.channel {
                inline.insert("channel", channel.as_str().into());
            }
            Value::InlineTable(inline)
        };
        let sources = merged
            .sources
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        rendered
            .decor_mut()
            .set_suffix(format!(" # From: {}", sources));
        table.insert(name, Item::Value(rendered));
    }
    Some(Item::Table(table))
}

fn environments_table(environments: &BTreeMap<String, Environment>) -> Item {
    let mut table = managed_table();
    for (name, env) in environments {
        let features = env.features.iter().map(String::as_str).collect::<Array>();
        let rendered = if env.solve_group.is_none() && !env.no_default_feature {
            Value::Array(features)
        } else {
            let mut inline = InlineTable::new();
            inline.insert("features", Value::Array(features));
            if let Some(group) = &env.solve_group {
                inline.insert("solve-group", group.as_str().into());
            }
            if env.no_default_feature {
                inline.insert("no-default-feature", true.into());
            }
            Value::InlineTable(inline)
        };
        table.insert(name, Item::Value(rendered));
    }
    Item::Table(table)
}

/// Split env vars into plain scalars and shell specific values.
#[allow(clippy::type_complexity)]
fn split_env_vars(
    vars: &BTreeMap<String, MergedEnvVar>,
) -> (BTreeMap<&str, String>, BTreeMap<&str, &MergedEnvVar>) {
    let mut generic = BTreeMap::new();
    let mut shell_specific = BTreeMap::new();
    for (name, var) in vars {
        match &var.value {
            EnvVarValue::Scalar(text) if !VARIABLE_REFERENCE.is_match(text) => {
                generic.insert(name.as_str(), text.clone());
            }
            _ => {
                shell_specific.insert(name.as_str(), var);
            }
        }
    }
    (generic, shell_specific)
}

fn render_env(shell: Shell, vars: &BTreeMap<String, MergedEnvVar>) -> Item {
    let mut env = managed_table();
    for (name, var) in vars {
        let text = match &var.value {
            EnvVarValue::Scalar(text) => shell.substitute(text),
            EnvVarValue::List { values, .. } => values
                .iter()
                .map(|v| shell.substitute(v))
                .chain(std::iter::once(shell.reference(name)))
                .collect::<Vec<_>>()
                .join(shell.separator()),
        };
        env.insert(name, value(text));
    }
    Item::Table(env)
}

/// Shell family a target's activation scripts run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shell {
    Unix,
    Windows,
}

impl Shell {
    fn for_target(target: &str) -> Self {
        if target.starts_with("win") {
            Shell::Windows
        } else {
            Shell::Unix
        }
    }

    fn target(&self) -> &'static str {
        match self {
            Shell::Unix => "unix",
            Shell::Windows => "win",
        }
    }

    fn separator(&self) -> &'static str {
        match self {
            Shell::Unix => ":",
            Shell::Windows => ";",
        }
    }

    fn reference(&self, name: &str) -> String {
        match self {
            Shell::Unix => format!("${}", name),
            Shell::Windows => format!("%{}%", name),
        }
    }

    /// Rewrite `$VAR` and `${VAR}` references into this shell's syntax.
    fn substitute(&self, text: &str) -> String {
        VARIABLE_REFERENCE
            .replace_all(text, |caps: &Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                self.reference(name)
            })
            .into_owned()
    }
}

fn managed_table() -> Table {
    let mut table = Table::new();
    table.decor_mut().set_suffix(format!(" # {}", MANAGED_COMMENT));
    table
}

fn managed_value(mut rendered: Value) -> Item {
    rendered
        .decor_mut()
        .set_suffix(format!(" # {}", MANAGED_COMMENT));
    Item::Value(rendered)
}

fn is_managed(item: Option<&Item>) -> bool {
    item.and_then(Item::as_table)
        .and_then(|table| table.decor().suffix())
        .and_then(|suffix| suffix.as_str())
        .is_some_and(|suffix| suffix.contains(MANAGED_COMMENT))
}

fn is_managed_value(item: Option<&Item>) -> bool {
    item.and_then(Item::as_value)
        .and_then(|value| value.decor().suffix())
        .and_then(|suffix| suffix.as_str())
        .is_some_and(|suffix| suffix.contains(MANAGED_COMMENT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::MergedSpec;
    use crate::platform::{Platform, TargetSelector};
    use crate::project::{ListDirection, ProjectName, Spec};
    use crate::version::VersionSpec;
    use std::collections::BTreeSet;

    fn spec(version: &str, sources: &[&str]) -> MergedSpec {
        MergedSpec {
            spec: Spec::from_version(VersionSpec::parse(version).unwrap()),
            sources: sources.iter().map(|s| ProjectName::from(*s)).collect(),
        }
    }

    fn env(value: EnvVarValue) -> MergedEnvVar {
        MergedEnvVar::new(value, ProjectName::from("calc"))
    }

    fn project() -> ConsolidatedProject {
        let mut defaults = MergedAspect::default();
        defaults
            .base
            .dependencies
            .insert("qt".to_string(), spec(">=5.16,<6", &["calc", "core"]));
        defaults
            .base
            .env_vars
            .insert("JOBS".to_string(), env(EnvVarValue::Scalar("6".to_string())));
        defaults.base.env_vars.insert(
            "PYTHONPATH".to_string(),
            env(EnvVarValue::List {
                values: vec!["$PIXI_PROJECT_ROOT/src".to_string()],
                direction: ListDirection::Prepend,
            }),
        );

        ConsolidatedProject {
            name: ProjectName::from("calc"),
            channels: vec!["conda-forge".to_string()],
            platforms: BTreeSet::from([Platform::Linux64, Platform::Win64]),
            defaults,
            features: BTreeMap::new(),
            environments: BTreeMap::new(),
        }
    }

    #[test]
    fn test_empty_platforms_remove_managed_entry() {
        let first = render("", &project()).unwrap();
        assert!(first.contains("platforms"));

        let mut without = project();
        without.platforms.clear();
        let second = render(&first, &without).unwrap();
        let doc = second.parse::<DocumentMut>().unwrap();
        assert!(doc["workspace"].get("platforms").is_none());

        let own = "[workspace]\nplatforms = [\"osx-64\"]\n";
        let kept = render(own, &without).unwrap();
        assert!(kept.contains("platforms = [\"osx-64\"]"));
    }

    #[test]
    fn test_render_creates_workspace_and_tables() {
        let rendered = render("", &project()).unwrap();
        let doc = rendered.parse::<DocumentMut>().unwrap();

        assert_eq!(doc["workspace"]["name"].as_str(), Some("calc"));
        assert_eq!(doc["dependencies"]["qt"].as_str(), Some(">=5.16,<6"));
        assert_eq!(doc["activation"]["env"]["JOBS"].as_str(), Some("6"));
        assert_eq!(
            doc["target"]["unix"]["activation"]["env"]["PYTHONPATH"].as_str(),
            Some("$PIXI_PROJECT_ROOT/src:$PYTHONPATH")
        );
        assert_eq!(
            doc["target"]["win"]["activation"]["env"]["PYTHONPATH"].as_str(),
            Some("%PIXI_PROJECT_ROOT%/src;%PYTHONPATH%")
        );
        assert!(rendered.contains("# From: calc, core"));
        assert!(rendered.contains(MANAGED_COMMENT));
    }

    #[test]
    fn test_render_preserves_hand_written_content() {
        let existing = "[workspace]\nname = \"old\"\nauthors = [\"me\"]\n\n[tasks]\ntest = \"pytest\"\n\n[dependencies]\nstale = \"*\"\n";
        let rendered = render(existing, &project()).unwrap();
        let doc = rendered.parse::<DocumentMut>().unwrap();

        assert_eq!(doc["workspace"]["name"].as_str(), Some("calc"));
        assert!(doc["workspace"]["authors"].is_array());
        assert_eq!(doc["tasks"]["test"].as_str(), Some("pytest"));
        assert!(doc["dependencies"].get("stale").is_none());
    }

    #[test]
    fn test_render_is_idempotent() {
        let first = render("[workspace]\nname = \"calc\"\n", &project()).unwrap();
        let second = render(&first, &project()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_stale_managed_tables_removed() {
        let first = render("", &project()).unwrap();
        let mut empty = project();
        empty.defaults = MergedAspect::default();
        let second = render(&first, &empty).unwrap();
        let doc = second.parse::<DocumentMut>().unwrap();
        assert!(doc.get("dependencies").is_none());
        assert!(doc.get("target").is_none());
        assert!(doc.get("activation").is_none());
    }

    #[test]
    fn test_qualified_spec_renders_inline_table() {
        let mut project = project();
        let mut pytest = spec(">=7", &["core"]);
        pytest.spec.channel = Some("conda-forge".to_string());
        project
            .defaults
            .base
            .dependencies
            .insert("pytest".to_string(), pytest);

        let rendered = render("", &project).unwrap();
        let doc = rendered.parse::<DocumentMut>().unwrap();
        let inline = doc["dependencies"]["pytest"].as_inline_table().unwrap();
        assert_eq!(inline.get("channel").and_then(|v| v.as_str()), Some("conda-forge"));
    }

    #[test]
    fn test_target_features_and_environments() {
        let mut project = project();
        let mut section = MergedSection::default();
        section
            .dependencies
            .insert("pywin32".to_string(), spec("*", &["core"]));
        project.defaults.target.insert(
            TargetSelector::Platform(Platform::Win64),
            section,
        );

        let mut feature = MergedAspect::default();
        feature
            .base
            .dependencies
            .insert("python".to_string(), spec("3.10.*", &["core"]));
        project.features.insert("py310".to_string(), feature);
        project.environments.insert(
            "default".to_string(),
            Environment {
                features: vec!["py310".to_string()],
                solve_group: None,
                no_default_feature: false,
            },
        );
        project.environments.insert(
            "test".to_string(),
            Environment {
                features: vec!["py310".to_string()],
                solve_group: Some("default".to_string()),
                no_default_feature: false,
            },
        );

        let rendered = render("", &project).unwrap();
        let doc = rendered.parse::<DocumentMut>().unwrap();
        assert_eq!(doc["target"]["win-64"]["dependencies"]["pywin32"].as_str(), Some("*"));
        assert_eq!(
            doc["feature"]["py310"]["dependencies"]["python"].as_str(),
            Some("3.10.*")
        );
        assert!(doc["environments"]["default"].is_array());
        assert_eq!(
            doc["environments"]["test"]["solve-group"].as_str(),
            Some("default")
        );
    }

    #[test]
    fn test_shell_substitution() {
        assert_eq!(Shell::Windows.substitute("${HOME}/x:$PATH"), "%HOME%/x:%PATH%");
        assert_eq!(Shell::Unix.substitute("${HOME}/x"), "$HOME/x");
        assert_eq!(Shell::for_target("win-64"), Shell::Windows);
        assert_eq!(Shell::for_target("linux-64"), Shell::Unix);
    }
}
