use super::version::Version;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
    Compatible,
    Arbitrary,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::Compatible => "~=",
            Operator::Arbitrary => "===",
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Operator::Equal),
            "!=" => Ok(Operator::NotEqual),
            "<=" => Ok(Operator::LessEqual),
            ">=" => Ok(Operator::GreaterEqual),
            "<" => Ok(Operator::Less),
            ">" => Ok(Operator::Greater),
            "~=" => Ok(Operator::Compatible),
            "===" => Ok(Operator::Arbitrary),
            other => Err(format!("unknown comparison operator '{}'", other)),
        }
    }
}

/// One comparison clause such as `>=1.10` or `==2.*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub op: Operator,
    pub version: Version,
    pub wildcard: bool,
    raw_version: String,
}

fn clause_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(===|~=|==|!=|<=|>=|<|>)\s*([^\s,;]+)$").expect("clause pattern is valid")
    })
}

impl Constraint {
    pub fn matches(&self, candidate: &Version) -> bool {
        match self.op {
            Operator::Equal if self.wildcard => self.prefix_matches(candidate),
            Operator::NotEqual if self.wildcard => !self.prefix_matches(candidate),
            Operator::Equal => candidate == &self.version,
            Operator::NotEqual => candidate != &self.version,
            Operator::LessEqual => candidate <= &self.version,
            Operator::GreaterEqual => candidate >= &self.version,
            Operator::Less => candidate < &self.version,
            Operator::Greater => candidate > &self.version,
            Operator::Compatible => {
                // ~=X.Y.Z means >=X.Y.Z and ==X.Y.*
                let prefix = self.version.release.len() - 1;
                candidate >= &self.version
                    && (0..prefix).all(|i| candidate.segment(i) == self.version.segment(i))
            }
            Operator::Arbitrary => candidate.to_string() == self.raw_version,
        }
    }

    fn prefix_matches(&self, candidate: &Version) -> bool {
        self.version
            .release
            .iter()
            .enumerate()
            .all(|(i, segment)| candidate.segment(i) == *segment)
    }
}

impl FromStr for Constraint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clause = s.trim();
        if clause.is_empty() {
            return Err("empty version constraint".to_string());
        }

        let caps = clause_regex()
            .captures(clause)
            .ok_or_else(|| format!("'{}' is not a comparison expression", clause))?;
        let op: Operator = caps[1].parse()?;
        let raw_version = caps[2].to_string();

        let (version_text, wildcard) = match raw_version.strip_suffix(".*") {
            Some(stripped) => (stripped, true),
            None => (raw_version.as_str(), false),
        };

        if wildcard && !matches!(op, Operator::Equal | Operator::NotEqual) {
            return Err(format!(
                "wildcard versions are only allowed with == and !=, found '{}'",
                clause
            ));
        }

        let version: Version = version_text.parse()?;
        if op == Operator::Compatible && version.release.len() < 2 {
            return Err(format!(
                "'~=' needs at least two release segments, found '{}'",
                clause
            ));
        }

        Ok(Constraint {
            op,
            version,
            wildcard,
            raw_version,
        })
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.raw_version)
    }
}

/// A single manifest entry: package name, optional extras, version
/// constraints and an optional environment marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub extras: Vec<String>,
    pub constraints: Vec<Constraint>,
    pub marker: Option<String>,
}

fn requirement_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[(?P<extras>[^\]]*)\])?\s*(?P<rest>.*)$",
        )
        .expect("requirement pattern is valid")
    })
}

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-_.]+").expect("name pattern is valid"))
}

/// Lowercase the name and collapse runs of `-`, `_` and `.` into `-`,
/// so `Python_Dateutil` and `python-dateutil` compare equal.
pub fn normalize_name(name: &str) -> String {
    name_regex().replace_all(&name.to_ascii_lowercase(), "-").into_owned()
}

impl Requirement {
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn is_pinned(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c.op, Operator::Equal | Operator::Arbitrary) && !c.wildcard)
    }

    pub fn is_satisfied_by(&self, version: &Version) -> bool {
        self.constraints.iter().all(|c| c.matches(version))
    }

    /// Whether at least one version could satisfy every constraint.
    ///
    /// Works on the tightest lower and upper bounds plus exact pins, which
    /// catches contradictions like `<2,>=3`, `==1.0,!=1.0` or `~=23.1,>=24`.
    pub fn has_feasible_range(&self) -> bool {
        let mut lower: Option<Bound> = None;
        let mut upper: Option<Bound> = None;

        for c in &self.constraints {
            match c.op {
                Operator::Equal if c.wildcard => {
                    // ==X.Y.* spans [X.Y.dev0, X.(Y+1).dev0)
                    let len = c.version.release.len();
                    lower = tighter_lower(lower, (earliest(c.version.release.clone()), true));
                    upper = tighter_upper(upper, (earliest(bumped(&c.version.release, len)), false));
                }
                Operator::Compatible => {
                    // ~=X.Y.Z adds ==X.Y.*
                    let len = c.version.release.len() - 1;
                    lower = tighter_lower(lower, (c.version.clone(), true));
                    upper = tighter_upper(upper, (earliest(bumped(&c.version.release, len)), false));
                }
                _ if c.wildcard => {}
                Operator::GreaterEqual => lower = tighter_lower(lower, (c.version.clone(), true)),
                Operator::Greater => lower = tighter_lower(lower, (c.version.clone(), false)),
                Operator::LessEqual => upper = tighter_upper(upper, (c.version.clone(), true)),
                Operator::Less => upper = tighter_upper(upper, (c.version.clone(), false)),
                Operator::Equal => {
                    lower = tighter_lower(lower, (c.version.clone(), true));
                    upper = tighter_upper(upper, (c.version.clone(), true));
                }
                Operator::NotEqual | Operator::Arbitrary => {}
            }
        }

        if let (Some((lo, lo_incl)), Some((hi, hi_incl))) = (&lower, &upper) {
            if lo > hi || (lo == hi && !(*lo_incl && *hi_incl)) {
                return false;
            }
            if lo == hi {
                // A single admissible version must not be excluded explicitly.
                return self
                    .constraints
                    .iter()
                    .filter(|c| c.op == Operator::NotEqual)
                    .all(|c| c.matches(lo));
            }
        }
        true
    }
}

/// A version bound and whether it is inclusive.
type Bound = (Version, bool);

/// `release[..len]` with its last segment incremented.
fn bumped(release: &[u64], len: usize) -> Vec<u64> {
    let mut prefix: Vec<u64> = release.iter().copied().take(len.max(1)).collect();
    if let Some(last) = prefix.last_mut() {
        *last += 1;
    }
    prefix
}

/// The smallest version with this release, `X.Y.dev0`.
fn earliest(release: Vec<u64>) -> Version {
    Version {
        dev: Some(0),
        ..Version::new(release)
    }
}

fn tighter_lower(current: Option<Bound>, candidate: Bound) -> Option<Bound> {
    match current {
        None => Some(candidate),
        Some((v, inclusive)) => {
            if candidate.0 > v || (candidate.0 == v && inclusive && !candidate.1) {
                Some(candidate)
            } else {
                Some((v, inclusive))
            }
        }
    }
}

fn tighter_upper(current: Option<Bound>, candidate: Bound) -> Option<Bound> {
    match current {
        None => Some(candidate),
        Some((v, inclusive)) => {
            if candidate.0 < v || (candidate.0 == v && inclusive && !candidate.1) {
                Some(candidate)
            } else {
                Some((v, inclusive))
            }
        }
    }
}

impl FromStr for Requirement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        if line.is_empty() {
            return Err("empty requirement".to_string());
        }

        let caps = requirement_regex()
            .captures(line)
            .ok_or_else(|| format!("'{}' does not start with a valid package name", line))?;

        let name = caps["name"].to_string();
        let extras = caps
            .name("extras")
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or("");
        let (spec_part, marker) = match rest.split_once(';') {
            Some((spec, marker)) => {
                let marker = marker.trim();
                if marker.is_empty() {
                    return Err(format!("empty environment marker in '{}'", line));
                }
                (spec.trim(), Some(marker.to_string()))
            }
            None => (rest.trim(), None),
        };

        let constraints = if spec_part.is_empty() {
            Vec::new()
        } else {
            spec_part
                .split(',')
                .map(|clause| clause.parse::<Constraint>())
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Requirement {
            name,
            extras,
            constraints,
            marker,
        })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        let clauses: Vec<String> = self.constraints.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", clauses.join(","))?;
        if let Some(marker) = &self.marker {
            write!(f, "; {}", marker)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_name_only() {
        let req: Requirement = "numpy".parse().unwrap();
        assert_eq!(req.name, "numpy");
        assert!(req.constraints.is_empty());
        assert!(req.is_satisfied_by(&v("0.1")));
    }

    #[test]
    fn test_parse_multiple_clauses() {
        let req: Requirement = "pydantic<2,>=1.10".parse().unwrap();
        assert_eq!(req.constraints.len(), 2);
        assert_eq!(req.constraints[0].op, Operator::Less);
        assert_eq!(req.constraints[1].op, Operator::GreaterEqual);
        assert!(req.is_satisfied_by(&v("1.10.13")));
        assert!(!req.is_satisfied_by(&v("2.0")));
        assert!(!req.is_satisfied_by(&v("1.9")));
        assert_eq!(req.to_string(), "pydantic<2,>=1.10");
    }

    #[test]
    fn test_parse_extras_and_marker() {
        let req: Requirement = "uvicorn[standard] >= 0.23 ; python_version >= '3.8'"
            .parse()
            .unwrap();
        assert_eq!(req.extras, vec!["standard"]);
        assert_eq!(req.constraints.len(), 1);
        assert_eq!(req.marker.as_deref(), Some("python_version >= '3.8'"));
    }

    #[test]
    fn test_wildcards_and_compatible_release() {
        let wildcard: Requirement = "plotly==5.*".parse().unwrap();
        assert!(wildcard.is_satisfied_by(&v("5.17.0")));
        assert!(!wildcard.is_satisfied_by(&v("6.0")));

        let compatible: Requirement = "black~=23.1".parse().unwrap();
        assert!(compatible.is_satisfied_by(&v("23.9.1")));
        assert!(!compatible.is_satisfied_by(&v("24.1")));

        assert!("black~=23".parse::<Requirement>().is_err());
        assert!("black>=23.*".parse::<Requirement>().is_err());
    }

    #[test]
    fn test_local_version_labels() {
        let torch: Requirement = "torch==2.0.0+cpu".parse().unwrap();
        assert_eq!(torch.constraints[0].version.local.as_deref(), Some("cpu"));
        assert_eq!(torch.to_string(), "torch==2.0.0+cpu");
        assert!(torch.is_satisfied_by(&v("2.0.0")));
        assert!(torch.has_feasible_range());
    }

    #[test]
    fn test_rejects_malformed_constraints() {
        assert!("pandas>=".parse::<Requirement>().is_err());
        assert!("pandas=>2.0".parse::<Requirement>().is_err());
        assert!("pandas>=2.0,".parse::<Requirement>().is_err());
        assert!("pandas 2.0".parse::<Requirement>().is_err());
        assert!("-e .".parse::<Requirement>().is_err());
    }

    #[test]
    fn test_normalized_name() {
        assert_eq!(normalize_name("Python_Dateutil"), "python-dateutil");
        assert_eq!(normalize_name("zope.interface"), "zope-interface");
        assert_eq!(normalize_name("pytest--asyncio"), "pytest-asyncio");
    }

    #[test]
    fn test_feasible_range() {
        let ok: Requirement = "pydantic<2,>=1.10".parse().unwrap();
        assert!(ok.has_feasible_range());

        let inverted: Requirement = "pydantic<2,>=3".parse().unwrap();
        assert!(!inverted.has_feasible_range());

        let touching: Requirement = "numpy>1.24,<=1.24".parse().unwrap();
        assert!(!touching.has_feasible_range());

        let excluded: Requirement = "numpy==1.24,!=1.24".parse().unwrap();
        assert!(!excluded.has_feasible_range());

        let pinned: Requirement = "numpy==1.26.4".parse().unwrap();
        assert!(pinned.has_feasible_range());
        assert!(pinned.is_pinned());

        let compatible_too_low: Requirement = "black~=23.1,>=24".parse().unwrap();
        assert!(!compatible_too_low.has_feasible_range());

        let wildcard_too_low: Requirement = "numpy==1.*,>=2".parse().unwrap();
        assert!(!wildcard_too_low.has_feasible_range());

        let within_series: Requirement = "plotly==5.*,>=5.17".parse().unwrap();
        assert!(within_series.has_feasible_range());

        let compatible_patch: Requirement = "pandas~=2.1.0,<2.2".parse().unwrap();
        assert!(compatible_patch.has_feasible_range());
    }
}
