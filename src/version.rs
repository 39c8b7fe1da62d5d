//! # Version Ranges
//!
//! Conda-style version ordering and version specifiers with real range
//! semantics. A specifier such as `>=5.16,<6` is compiled into a normalized
//! union of intervals so that two specifiers can be intersected exactly and an
//! empty intersection detected, instead of gluing the strings together.
//!
//! ## Ordering
//!
//! Versions are split into components on `.`, `_` and `-`, and every component
//! into numeric and alphabetic runs. Numbers compare numerically; `dev` sorts
//! before every other string, `post` after everything, other strings compare
//! lexicographically and before numbers. Missing components are padded with
//! `0`, so `1.0 == 1.0.0` and `1.0a1 < 1.0`. An optional `N!` epoch takes
//! precedence and a `+local` suffix is ignored.
//!
//! ## Specifier grammar
//!
//! | Form        | Meaning                                   |
//! |-------------|-------------------------------------------|
//! | `*`, empty  | any version                               |
//! | `1.2`       | exactly `1.2`                             |
//! | `==1.2`     | exactly `1.2`                             |
//! | `1.2.*`     | prefix match, `>=1.2,<1.3`                |
//! | `=1.2`      | prefix match, `>=1.2,<1.3`                |
//! | `!=1.2`     | anything but `1.2`                        |
//! | `~=1.4.3`   | compatible release, `>=1.4.3,<1.5`        |
//! | `>= > <= <` | half-open ranges                          |
//!
//! `,` is AND and `|` is OR, AND binding tighter.

use std::cmp::Ordering;
use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// A version specifier that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version specifier '{spec}': {reason}")]
pub struct VersionParseError {
    pub spec: String,
    pub reason: String,
}

impl VersionParseError {
    fn new(spec: &str, reason: impl Into<String>) -> Self {
        Self {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Atom {
    Num(u64),
    Str(String),
}

impl Atom {
    fn rank(&self) -> u8 {
        match self {
            Atom::Str(s) if s == "dev" => 0,
            Atom::Str(s) if s == "post" => 3,
            Atom::Str(_) => 1,
            Atom::Num(_) => 2,
        }
    }

    fn compare(&self, other: &Atom) -> Ordering {
        match (self, other) {
            (Atom::Num(a), Atom::Num(b)) => a.cmp(b),
            (Atom::Str(a), Atom::Str(b)) if self.rank() == other.rank() => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

const PAD: Atom = Atom::Num(0);

/// A single conda-style version, e.g. `1.2.3`, `2024.1`, `1.0rc1`, `1!2.0`.
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    components: Vec<Vec<Atom>>,
    text: String,
}

impl Version {
    /// Parse a version string.
    pub fn parse(text: &str) -> Result<Self, VersionParseError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(VersionParseError::new(text, "empty version"));
        }
        let lowered = trimmed.to_lowercase();

        let (epoch, rest) = match lowered.split_once('!') {
            Some((epoch, rest)) => {
                let epoch = epoch
                    .parse::<u64>()
                    .map_err(|_| VersionParseError::new(text, "epoch must be a number"))?;
                (epoch, rest)
            }
            None => (0, lowered.as_str()),
        };
        let public = rest.split('+').next().unwrap_or_default();

        let mut components = Vec::new();
        for raw in public.split(['.', '_', '-']) {
            if raw.is_empty() {
                return Err(VersionParseError::new(text, "empty version component"));
            }
            components.push(parse_component(raw).map_err(|reason| VersionParseError::new(text, reason))?);
        }

        Ok(Self {
            epoch,
            components,
            text: trimmed.to_string(),
        })
    }

    /// The version text as written.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The smallest version strictly above every version starting with this
    /// one as a prefix: `3.10` becomes `3.11`.
    fn bump_prefix(&self) -> Result<Version, VersionParseError> {
        let mut components = self.components.clone();
        let last = components
            .last_mut()
            .ok_or_else(|| VersionParseError::new(&self.text, "empty version"))?;
        match last.first().cloned() {
            Some(Atom::Num(n)) => {
                let next = n
                    .checked_add(1)
                    .ok_or_else(|| VersionParseError::new(&self.text, "version component is too large"))?;
                *last = vec![Atom::Num(next)];
            }
            _ => {
                return Err(VersionParseError::new(
                    &self.text,
                    "prefix match requires a numeric last component",
                ))
            }
        }
        let body = components
            .iter()
            .map(|component| render_component(component))
            .collect::<Vec<_>>()
            .join(".");
        let text = if self.epoch > 0 {
            format!("{}!{}", self.epoch, body)
        } else {
            body
        };
        Ok(Version {
            epoch: self.epoch,
            components,
            text,
        })
    }

    /// This version without its last component: `1.4.3` becomes `1.4`.
    fn parent(&self) -> Option<Version> {
        if self.components.len() < 2 {
            return None;
        }
        let components = self.components[..self.components.len() - 1].to_vec();
        let text = components
            .iter()
            .map(|component| render_component(component))
            .collect::<Vec<_>>()
            .join(".");
        Some(Version {
            epoch: self.epoch,
            components,
            text,
        })
    }
}

fn parse_component(raw: &str) -> Result<Vec<Atom>, String> {
    let mut atoms = Vec::new();
    let mut chars = raw.chars().peekable();
    while let Some(&ch) = chars.peek() {
        if ch.is_ascii_digit() {
            let mut digits = String::new();
            while let Some(&d) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                digits.push(d);
                chars.next();
            }
            let number = digits
                .parse()
                .map_err(|_| format!("number '{}' is too large", digits))?;
            atoms.push(Atom::Num(number));
        } else if ch.is_ascii_alphabetic() {
            let mut letters = String::new();
            while let Some(&l) = chars.peek() {
                if !l.is_ascii_alphabetic() {
                    break;
                }
                letters.push(l);
                chars.next();
            }
            if atoms.is_empty() {
                atoms.push(PAD);
            }
            atoms.push(Atom::Str(letters));
        } else {
            return Err(format!("invalid character in '{}'", raw));
        }
    }
    Ok(atoms)
}

fn render_component(component: &[Atom]) -> String {
    let skip = matches!(component, [Atom::Num(0), Atom::Str(_), ..]);
    component
        .iter()
        .skip(usize::from(skip))
        .map(|atom| match atom {
            Atom::Num(n) => n.to_string(),
            Atom::Str(s) => s.clone(),
        })
        .collect()
}

fn compare_padded(a: &[Atom], b: &[Atom]) -> Ordering {
    for i in 0..a.len().max(b.len()) {
        let left = a.get(i).unwrap_or(&PAD);
        let right = b.get(i).unwrap_or(&PAD);
        match left.compare(right) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch.cmp(&other.epoch).then_with(|| {
            let pad = vec![PAD];
            for i in 0..self.components.len().max(other.components.len()) {
                let left = self.components.get(i).unwrap_or(&pad);
                let right = other.components.get(i).unwrap_or(&pad);
                match compare_padded(left, right) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            Ordering::Equal
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Bound {
    Unbounded,
    Included(Version),
    Excluded(Version),
}

impl Bound {
    fn version(&self) -> Option<&Version> {
        match self {
            Bound::Unbounded => None,
            Bound::Included(v) | Bound::Excluded(v) => Some(v),
        }
    }
}

fn cmp_lower(a: &Bound, b: &Bound) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Less,
        (_, Bound::Unbounded) => Ordering::Greater,
        (Bound::Included(x), Bound::Included(y)) | (Bound::Excluded(x), Bound::Excluded(y)) => {
            x.cmp(y)
        }
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Less),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Greater),
    }
}

fn cmp_upper(a: &Bound, b: &Bound) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Greater,
        (_, Bound::Unbounded) => Ordering::Less,
        (Bound::Included(x), Bound::Included(y)) | (Bound::Excluded(x), Bound::Excluded(y)) => {
            x.cmp(y)
        }
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Greater),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Less),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Interval {
    lower: Bound,
    upper: Bound,
}

impl Interval {
    fn full() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    fn exact(v: Version) -> Self {
        Self {
            lower: Bound::Included(v.clone()),
            upper: Bound::Included(v),
        }
    }

    fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
            (Bound::Included(a), Bound::Included(b)) => a > b,
            (lower, upper) => match (lower.version(), upper.version()) {
                (Some(a), Some(b)) => a >= b,
                _ => false,
            },
        }
    }

    fn contains(&self, v: &Version) -> bool {
        let above = match &self.lower {
            Bound::Unbounded => true,
            Bound::Included(l) => v >= l,
            Bound::Excluded(l) => v > l,
        };
        let below = match &self.upper {
            Bound::Unbounded => true,
            Bound::Included(u) => v <= u,
            Bound::Excluded(u) => v < u,
        };
        above && below
    }

    fn intersect(&self, other: &Interval) -> Interval {
        let lower = if cmp_lower(&self.lower, &other.lower) == Ordering::Less {
            other.lower.clone()
        } else {
            self.lower.clone()
        };
        let upper = if cmp_upper(&self.upper, &other.upper) == Ordering::Greater {
            other.upper.clone()
        } else {
            self.upper.clone()
        };
        Interval { lower, upper }
    }

    /// Whether `next` (which starts at or after `self`) overlaps or touches
    /// `self`, so that the two can be merged into one interval.
    fn touches(&self, next: &Interval) -> bool {
        match (&self.upper, &next.lower) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => true,
            (upper, lower) => match (upper.version(), lower.version()) {
                (Some(u), Some(l)) => match u.cmp(l) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => {
                        !matches!((upper, lower), (Bound::Excluded(_), Bound::Excluded(_)))
                    }
                },
                _ => true,
            },
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.lower, &self.upper) {
            (Bound::Unbounded, Bound::Unbounded) => f.write_str("*"),
            (Bound::Included(a), Bound::Included(b)) if a == b => write!(f, "=={}", a),
            (lower, upper) => {
                let mut parts = Vec::new();
                match lower {
                    Bound::Included(v) => parts.push(format!(">={}", v)),
                    Bound::Excluded(v) => parts.push(format!(">{}", v)),
                    Bound::Unbounded => {}
                }
                match upper {
                    Bound::Included(v) => parts.push(format!("<={}", v)),
                    Bound::Excluded(v) => parts.push(format!("<{}", v)),
                    Bound::Unbounded => {}
                }
                f.write_str(&parts.join(","))
            }
        }
    }
}

/// A normalized union of disjoint, non-empty, sorted version intervals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSet {
    intervals: Vec<Interval>,
}

impl VersionSet {
    /// The set of all versions.
    pub fn full() -> Self {
        Self {
            intervals: vec![Interval::full()],
        }
    }

    fn from_intervals(intervals: Vec<Interval>) -> Self {
        let mut intervals: Vec<Interval> =
            intervals.into_iter().filter(|i| !i.is_empty()).collect();
        intervals.sort_by(|a, b| cmp_lower(&a.lower, &b.lower));

        let mut merged: Vec<Interval> = Vec::new();
        for interval in intervals {
            match merged.last_mut() {
                Some(last) if last.touches(&interval) => {
                    if cmp_upper(&interval.upper, &last.upper) == Ordering::Greater {
                        last.upper = interval.upper;
                    }
                }
                _ => merged.push(interval),
            }
        }
        Self { intervals: merged }
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn is_full(&self) -> bool {
        matches!(
            self.intervals.as_slice(),
            [Interval {
                lower: Bound::Unbounded,
                upper: Bound::Unbounded
            }]
        )
    }

    pub fn contains(&self, v: &Version) -> bool {
        self.intervals.iter().any(|i| i.contains(v))
    }

    pub fn intersect(&self, other: &VersionSet) -> VersionSet {
        let mut result = Vec::new();
        for a in &self.intervals {
            for b in &other.intervals {
                result.push(a.intersect(b));
            }
        }
        Self::from_intervals(result)
    }

    pub fn union(&self, other: &VersionSet) -> VersionSet {
        let mut all = self.intervals.clone();
        all.extend(other.intervals.iter().cloned());
        Self::from_intervals(all)
    }
}

impl fmt::Display for VersionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .intervals
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>();
        f.write_str(&rendered.join("|"))
    }
}

/// A version specifier: the text as written plus its compiled range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpec {
    text: String,
    set: VersionSet,
}

impl VersionSpec {
    /// The `*` specifier, matching any version.
    pub fn any() -> Self {
        Self {
            text: "*".to_string(),
            set: VersionSet::full(),
        }
    }

    /// Parse a specifier such as `>=5.16,<6` or `3.10.*|>=3.12`.
    pub fn parse(text: &str) -> Result<Self, VersionParseError> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::any());
        }

        let mut set: Option<VersionSet> = None;
        for alternative in trimmed.split('|') {
            let mut conjunction = VersionSet::full();
            for clause in alternative.split(',') {
                conjunction = conjunction.intersect(&parse_clause(text, clause)?);
            }
            set = Some(match set {
                Some(existing) => existing.union(&conjunction),
                None => conjunction,
            });
        }

        Ok(Self {
            text: trimmed.to_string(),
            set: set.unwrap_or_else(VersionSet::full),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn set(&self) -> &VersionSet {
        &self.set
    }

    pub fn is_any(&self) -> bool {
        self.set.is_full()
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.set.contains(version)
    }

    /// Intersect two specifiers, returning `None` when no version satisfies
    /// both.
    ///
    /// When the result equals one of the operands, that operand's text is kept
    /// as written; otherwise a canonical rendering of the range is produced.
    pub fn intersect(&self, other: &VersionSpec) -> Option<VersionSpec> {
        if other.is_any() {
            return Some(self.clone());
        }
        if self.is_any() {
            return Some(other.clone());
        }

        let set = self.set.intersect(&other.set);
        if set.is_empty() {
            None
        } else if set == self.set {
            Some(self.clone())
        } else if set == other.set {
            Some(other.clone())
        } else {
            Some(VersionSpec {
                text: set.to_string(),
                set,
            })
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for VersionSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

const OPERATORS: [&str; 8] = ["==", "!=", ">=", "<=", "~=", ">", "<", "="];

fn parse_clause(spec: &str, clause: &str) -> Result<VersionSet, VersionParseError> {
    let clause = clause.trim();
    if clause.is_empty() {
        return Err(VersionParseError::new(spec, "empty clause"));
    }
    if clause == "*" {
        return Ok(VersionSet::full());
    }

    let (op, rest) = OPERATORS
        .iter()
        .find_map(|op| clause.strip_prefix(op).map(|rest| (*op, rest.trim())))
        .unwrap_or(("", clause));

    let (version_text, wildcard) = match rest.strip_suffix(".*") {
        Some(prefix) => (prefix, true),
        None => (rest, false),
    };
    let version = Version::parse(version_text).map_err(|e| VersionParseError {
        spec: spec.to_string(),
        reason: e.reason,
    })?;

    let interval = |lower: Bound, upper: Bound| VersionSet::from_intervals(vec![Interval { lower, upper }]);

    let set = match (op, wildcard) {
        ("" | "==", false) => VersionSet::from_intervals(vec![Interval::exact(version)]),
        ("" | "==" | "=", true) | ("=", false) => prefix_set(spec, &version)?,
        ("!=", false) => VersionSet::from_intervals(vec![
            Interval {
                lower: Bound::Unbounded,
                upper: Bound::Excluded(version.clone()),
            },
            Interval {
                lower: Bound::Excluded(version),
                upper: Bound::Unbounded,
            },
        ]),
        ("!=", true) => {
            let upper = version.bump_prefix().map_err(|e| VersionParseError::new(spec, e.reason))?;
            VersionSet::from_intervals(vec![
                Interval {
                    lower: Bound::Unbounded,
                    upper: Bound::Excluded(version),
                },
                Interval {
                    lower: Bound::Included(upper),
                    upper: Bound::Unbounded,
                },
            ])
        }
        (">=", _) => interval(Bound::Included(version), Bound::Unbounded),
        (">", _) => interval(Bound::Excluded(version), Bound::Unbounded),
        ("<=", _) => interval(Bound::Unbounded, Bound::Included(version)),
        ("<", _) => interval(Bound::Unbounded, Bound::Excluded(version)),
        ("~=", false) => {
            let parent = version.parent().ok_or_else(|| {
                VersionParseError::new(spec, "'~=' requires at least two version components")
            })?;
            let upper = parent
                .bump_prefix()
                .map_err(|e| VersionParseError::new(spec, e.reason))?;
            interval(Bound::Included(version), Bound::Excluded(upper))
        }
        (op, _) => {
            return Err(VersionParseError::new(
                spec,
                format!("operator '{}' cannot be combined with '.*'", op),
            ))
        }
    };
    Ok(set)
}

fn prefix_set(spec: &str, version: &Version) -> Result<VersionSet, VersionParseError> {
    let upper = version
        .bump_prefix()
        .map_err(|e| VersionParseError::new(spec, e.reason))?;
    Ok(VersionSet::from_intervals(vec![Interval {
        lower: Bound::Included(version.clone()),
        upper: Bound::Excluded(upper),
    }]))
}
