//! Version numbers as written in dependency manifests.
//!
//! Supports the subset of PEP 440 that shows up in practice: a dotted
//! numeric release, an optional pre-release tag (`a`, `b`, `rc`), and
//! optional `.post` / `.dev` suffixes, and a `+local` label. Ordering follows
//! PEP 440: `1.0.dev1 < 1.0a1 < 1.0rc1 < 1.0 < 1.0.post1`. Local labels are
//! kept for display but ignored when comparing, so `2.0.0+cpu == 2.0.0`.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreRelease {
    Alpha,
    Beta,
    ReleaseCandidate,
}

impl PreRelease {
    fn parse(tag: &str) -> Option<Self> {
        match tag {
            "a" | "alpha" => Some(PreRelease::Alpha),
            "b" | "beta" => Some(PreRelease::Beta),
            "rc" | "c" | "pre" | "preview" => Some(PreRelease::ReleaseCandidate),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            PreRelease::Alpha => "a",
            PreRelease::Beta => "b",
            PreRelease::ReleaseCandidate => "rc",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Version {
    pub release: Vec<u64>,
    pub pre: Option<(PreRelease, u64)>,
    pub post: Option<u64>,
    pub dev: Option<u64>,
    pub local: Option<String>,
}

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^v?(?P<release>\d+(?:\.\d+)*)(?:[-_.]?(?P<pre_l>alpha|beta|preview|pre|rc|a|b|c)[-_.]?(?P<pre_n>\d+)?)?(?:[-_.]?(?:post|rev|r)[-_.]?(?P<post>\d+))?(?P<dev_l>[-_.]?dev[-_.]?(?P<dev>\d+)?)?(?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?$",
        )
        .expect("version pattern is valid")
    })
}

impl Version {
    pub fn new(release: Vec<u64>) -> Self {
        Self {
            release,
            pre: None,
            post: None,
            dev: None,
            local: None,
        }
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// Release segment at `index`, treating missing trailing segments as 0.
    pub fn segment(&self, index: usize) -> u64 {
        self.release.get(index).copied().unwrap_or(0)
    }

    fn cmp_release(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        (0..len)
            .map(|i| self.segment(i).cmp(&other.segment(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }

    // (phase, pre kind, pre number): a dev-only release sorts before its pre-releases,
    // and a final release sorts after them.
    fn pre_key(&self) -> (u8, Option<PreRelease>, u64) {
        match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => (0, None, 0),
            (Some((kind, n)), _, _) => (1, Some(kind), n),
            _ => (2, None, 0),
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_release(other)
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| {
                // No post release sorts before any post release.
                let a = self.post.map(|p| p as i128).unwrap_or(-1);
                let b = other.post.map(|p| p as i128).unwrap_or(-1);
                a.cmp(&b)
            })
            .then_with(|| {
                // No dev release sorts after any dev release.
                let a = self.dev.map(|d| d as i128).unwrap_or(i128::MAX);
                let b = other.dev.map(|d| d as i128).unwrap_or(i128::MAX);
                a.cmp(&b)
            })
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let caps = version_regex()
            .captures(&lowered)
            .ok_or_else(|| format!("'{}' is not a valid version", s.trim()))?;

        let release = caps["release"]
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| format!("release segment '{}' is too large", part))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let number = |name: &str| -> Result<Option<u64>, String> {
            caps.name(name)
                .map(|m| {
                    m.as_str()
                        .parse::<u64>()
                        .map_err(|_| format!("'{}' is too large", m.as_str()))
                })
                .transpose()
        };

        let pre = match caps.name("pre_l") {
            Some(tag) => {
                let kind = PreRelease::parse(tag.as_str())
                    .ok_or_else(|| format!("unknown pre-release tag '{}'", tag.as_str()))?;
                Some((kind, number("pre_n")?.unwrap_or(0)))
            }
            None => None,
        };

        let post = number("post")?;
        let dev = if caps.name("dev_l").is_some() {
            Some(number("dev")?.unwrap_or(0))
        } else {
            None
        };

        Ok(Version {
            release,
            pre,
            post,
            dev,
            local: caps.name("local").map(|m| m.as_str().replace(['-', '_'], ".")),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let release: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", release.join("."))?;
        if let Some((kind, n)) = self.pre {
            write!(f, "{}{}", kind.as_str(), n)?;
        }
        if let Some(post) = self.post {
            write!(f, ".post{}", post)?;
        }
        if let Some(dev) = self.dev {
            write!(f, ".dev{}", dev)?;
        }
        if let Some(local) = &self.local {
            write!(f, "+{}", local)?;
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
    fn test_parse_release_and_suffixes() {
        let parsed = v("3.9.0");
        assert_eq!(parsed.release, vec![3, 9, 0]);
        assert!(!parsed.is_prerelease());

        let pre = v("2.0.0rc1");
        assert_eq!(pre.pre, Some((PreRelease::ReleaseCandidate, 1)));

        let full = v("1.4.post2.dev3");
        assert_eq!(full.post, Some(2));
        assert_eq!(full.dev, Some(3));
        assert_eq!(full.to_string(), "1.4.post2.dev3");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("".parse::<Version>().is_err());
        assert!("latest".parse::<Version>().is_err());
        assert!("1..2".parse::<Version>().is_err());
        assert!("1.2-".parse::<Version>().is_err());
    }

    #[test]
    fn test_pep440_ordering() {
        let ordered = ["1.0.dev1", "1.0a1", "1.0b2", "1.0rc1", "1.0", "1.0.post1", "1.1"];
        for pair in ordered.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_local_label_is_ignored_when_comparing() {
        let cpu = v("2.0.0+cpu");
        assert_eq!(cpu.local.as_deref(), Some("cpu"));
        assert_eq!(cpu, v("2.0.0"));
        assert!(cpu < v("2.0.1"));
        assert_eq!(v("1.13.1+CU117_Linux").to_string(), "1.13.1+cu117.linux");

        assert!("1.0+".parse::<Version>().is_err());
        assert!("1.0+cpu+gpu".parse::<Version>().is_err());
    }

    #[test]
    fn test_trailing_zeros_are_equal() {
        assert_eq!(v("1.10").cmp(&v("1.10.0")), Ordering::Equal);
        assert!(v("1.9") < v("1.10"));
    }
}
