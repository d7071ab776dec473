// src/modules/identity.rs

//! Module identity and reference matching.
//!
//! Identities are probed from file names using the convention
//!
//! ```text
//! <name>-<major>.<minor>.<patch>[+<public key token>].<ext>
//! ```
//!
//! e.g. `orders.core-1.4.0+b77a5c561934e089.dll`. A stem without a version
//! suffix is a name-only identity.

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::fs::FileSystem;

/// Extensions recognised as module binaries.
pub const MODULE_EXTENSIONS: &[&str] = &["dll", "so", "dylib", "wasm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl ModuleVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }
}

impl PartialOrd for ModuleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModuleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ModuleVersion {
    type Err = String;

    /// Accepts `1`, `1.2` and `1.2.3`; missing components are zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let mut next = |what: &str, required: bool| -> Result<u64, String> {
            match parts.next() {
                Some(p) => p
                    .parse::<u64>()
                    .map_err(|e| format!("invalid {what} version component '{p}': {e}")),
                None if required => Err(format!("missing {what} version component")),
                None => Ok(0),
            }
        };
        let major = next("major", true)?;
        let minor = next("minor", false)?;
        let patch = next("patch", false)?;
        if parts.next().is_some() {
            return Err(format!("too many version components in '{s}'"));
        }
        Ok(Self { major, minor, patch })
    }
}

/// Identity of a module binary, or of a module reference being resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleIdentity {
    pub name: String,
    pub version: Option<ModuleVersion>,
    pub public_key_token: Option<String>,
}

impl ModuleIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            public_key_token: None,
        }
    }

    pub fn with_version(mut self, version: ModuleVersion) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_public_key_token(mut self, token: impl Into<String>) -> Self {
        self.public_key_token = Some(token.into());
        self
    }

    /// Does this (candidate) identity satisfy `request`?
    ///
    /// - names compare ASCII case-insensitively;
    /// - a requested public key token must be present and equal;
    /// - a requested version needs a candidate with the same major version
    ///   that is not older than the request.
    pub fn satisfies(&self, request: &ModuleIdentity) -> bool {
        if !self.name.eq_ignore_ascii_case(&request.name) {
            return false;
        }

        if let Some(want) = &request.public_key_token {
            match &self.public_key_token {
                Some(have) if have.eq_ignore_ascii_case(want) => {}
                _ => return false,
            }
        }

        match (&request.version, &self.version) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(want), Some(have)) => have.major == want.major && have >= want,
        }
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(v) = &self.version {
            write!(f, "-{v}")?;
            if let Some(t) = &self.public_key_token {
                write!(f, "+{t}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for ModuleIdentity {
    type Err = String;

    /// Parse `name`, `name-1.2.3` or `name-1.2.3+token`.
    ///
    /// The version is split off at the last `-` whose suffix parses as a
    /// version, so names may themselves contain dashes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty module identity".to_string());
        }

        for (idx, _) in s.rmatch_indices('-') {
            let (name, rest) = (&s[..idx], &s[idx + 1..]);
            if name.is_empty() {
                continue;
            }
            let (version_str, token) = match rest.split_once('+') {
                Some((v, t)) if !t.is_empty() => (v, Some(t.to_string())),
                Some(_) => continue,
                None => (rest, None),
            };
            if let Ok(version) = version_str.parse::<ModuleVersion>() {
                return Ok(ModuleIdentity {
                    name: name.to_string(),
                    version: Some(version),
                    public_key_token: token,
                });
            }
        }

        Ok(ModuleIdentity::new(s))
    }
}

/// Extracts a module identity from a file, best-effort.
pub trait IdentityProbe: Send + Sync {
    /// `None` means "not a module" or "could not be identified"; never an error.
    fn probe(&self, fs: &dyn FileSystem, path: &Path) -> Option<ModuleIdentity>;
}

/// Probes identities from file names (see module docs).
#[derive(Debug, Clone, Copy, Default)]
pub struct FileNameProbe;

impl IdentityProbe for FileNameProbe {
    fn probe(&self, fs: &dyn FileSystem, path: &Path) -> Option<ModuleIdentity> {
        if !fs.is_file(path) {
            return None;
        }
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if !MODULE_EXTENSIONS.contains(&ext.as_str()) {
            return None;
        }
        path.file_stem()?.to_str()?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn id(s: &str) -> ModuleIdentity {
        s.parse().unwrap()
    }

    #[test]
    fn parses_name_version_and_token() {
        let i = id("orders.core-1.4.0+b77a5c561934e089");
        assert_eq!(i.name, "orders.core");
        assert_eq!(i.version, Some(ModuleVersion::new(1, 4, 0)));
        assert_eq!(i.public_key_token.as_deref(), Some("b77a5c561934e089"));
    }

    #[test]
    fn dashes_in_names_are_kept() {
        let i = id("tokio-util-0.7.1");
        assert_eq!(i.name, "tokio-util");
        assert_eq!(i.version, Some(ModuleVersion::new(0, 7, 1)));

        let i = id("some-plain-name");
        assert_eq!(i.name, "some-plain-name");
        assert_eq!(i.version, None);
    }

    #[test]
    fn short_versions_fill_with_zero() {
        assert_eq!(id("a-2").version, Some(ModuleVersion::new(2, 0, 0)));
        assert_eq!(id("a-2.1").version, Some(ModuleVersion::new(2, 1, 0)));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let i = id("a-1.2.3+abc");
        assert_eq!(i.to_string(), "a-1.2.3+abc");
        assert_eq!(id(&i.to_string()), i);
    }

    #[test]
    fn name_match_is_case_insensitive() {
        assert!(id("Orders-1.0.0").satisfies(&id("orders")));
        assert!(!id("orders-1.0.0").satisfies(&id("billing")));
    }

    #[test]
    fn version_must_share_major_and_not_be_older() {
        let candidate = id("a-1.4.0");
        assert!(candidate.satisfies(&id("a-1.0.0")));
        assert!(candidate.satisfies(&id("a-1.4.0")));
        assert!(!candidate.satisfies(&id("a-1.5.0")));
        assert!(!candidate.satisfies(&id("a-2.0.0")));
        assert!(!id("a").satisfies(&id("a-1.0.0")));
    }

    #[test]
    fn requested_token_must_match() {
        let signed = id("a-1.0.0+aa11");
        assert!(signed.satisfies(&id("a-1.0.0+AA11")));
        assert!(!signed.satisfies(&id("a-1.0.0+bb22")));
        assert!(!id("a-1.0.0").satisfies(&id("a-1.0.0+aa11")));
        assert!(signed.satisfies(&id("a-1.0.0")));
    }

    #[test]
    fn file_name_probe_skips_non_modules() {
        let fs = MockFileSystem::new();
        fs.add_file("/lib/a-1.0.0.so", b"a".to_vec());
        fs.add_file("/lib/readme.txt", b"text".to_vec());
        fs.add_dir("/lib/nested.dll");

        let probe = FileNameProbe;
        assert_eq!(probe.probe(&fs, Path::new("/lib/a-1.0.0.so")), Some(id("a-1.0.0")));
        assert_eq!(probe.probe(&fs, Path::new("/lib/readme.txt")), None);
        assert_eq!(probe.probe(&fs, Path::new("/lib/nested.dll")), None);
        assert_eq!(probe.probe(&fs, Path::new("/lib/missing.so")), None);
    }
}
