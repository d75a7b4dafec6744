use std::{fmt::Display, str::FromStr};

use miette::Diagnostic;
use semver::{BuildMetadata, Prerelease};
use thiserror::Error;

/// A package version.
///
/// Versions have between one and four numeric parts (`1`, `1.2`, `1.2.3`,
/// `1.2.3.4`), optionally followed by release labels (`-beta.1`) and build
/// metadata (`+git.abc`). Missing numeric parts are zero. The fourth part is
/// the legacy revision number, it is only rendered when it is not zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NuGetVersion {
    version: semver::Version,
    revision: u64,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ParseVersionError {
    #[error("a version cannot be empty")]
    Empty,

    #[error("'{0}' must have between one and four numeric parts")]
    InvalidNumberOfParts(String),

    #[error("'{0}' is not a valid numeric version part")]
    InvalidNumericPart(String),

    #[error("'{label}' is not a valid release label")]
    InvalidReleaseLabel {
        label: String,
        #[source]
        source: Option<semver::Error>,
    },

    #[error("'{metadata}' is not valid build metadata")]
    InvalidMetadata {
        metadata: String,
        #[source]
        source: Option<semver::Error>,
    },
}

impl NuGetVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            version: semver::Version::new(major, minor, patch),
            revision: 0,
        }
    }

    /// Constructs a four part version, like the ones produced by assembly
    /// versioning.
    pub fn from_parts(major: u64, minor: u64, patch: u64, revision: u64) -> Self {
        Self {
            version: semver::Version::new(major, minor, patch),
            revision,
        }
    }

    /// Parses the version, returning `None` if the string is not a valid
    /// version. An invalid version is not an error for callers that treat it
    /// as "no particular version".
    pub fn try_parse(version: &str) -> Option<Self> {
        version.parse().ok()
    }

    pub fn major(&self) -> u64 {
        self.version.major
    }

    pub fn minor(&self) -> u64 {
        self.version.minor
    }

    pub fn patch(&self) -> u64 {
        self.version.patch
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn release_labels(&self) -> &str {
        self.version.pre.as_str()
    }

    pub fn metadata(&self) -> &str {
        self.version.build.as_str()
    }

    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }
}

impl FromStr for NuGetVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(ParseVersionError::Empty);
        }

        let (rest, metadata) = match input.split_once('+') {
            Some((rest, metadata)) => (rest, Some(metadata)),
            None => (input, None),
        };
        let (numbers, labels) = match rest.split_once('-') {
            Some((numbers, labels)) => (numbers, Some(labels)),
            None => (rest, None),
        };

        let parts = numbers.split('.').collect::<Vec<_>>();
        if parts.len() > 4 {
            return Err(ParseVersionError::InvalidNumberOfParts(input.to_string()));
        }

        let mut values = [0u64; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ParseVersionError::InvalidNumericPart(part.to_string()));
            }
            *value = part
                .parse()
                .map_err(|_| ParseVersionError::InvalidNumericPart(part.to_string()))?;
        }

        let pre = match labels {
            None => Prerelease::EMPTY,
            Some("") => {
                return Err(ParseVersionError::InvalidReleaseLabel {
                    label: String::new(),
                    source: None,
                });
            }
            Some(label) => {
                Prerelease::new(label).map_err(|e| ParseVersionError::InvalidReleaseLabel {
                    label: label.to_string(),
                    source: Some(e),
                })?
            }
        };

        let build = match metadata {
            None => BuildMetadata::EMPTY,
            Some("") => {
                return Err(ParseVersionError::InvalidMetadata {
                    metadata: String::new(),
                    source: None,
                });
            }
            Some(metadata) => BuildMetadata::new(metadata).map_err(|e| {
                ParseVersionError::InvalidMetadata {
                    metadata: metadata.to_string(),
                    source: Some(e),
                }
            })?,
        };

        let [major, minor, patch, revision] = values;
        Ok(Self {
            version: semver::Version {
                major,
                minor,
                patch,
                pre,
                build,
            },
            revision,
        })
    }
}

impl Display for NuGetVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.version.major, self.version.minor, self.version.patch
        )?;
        if self.revision != 0 {
            write!(f, ".{}", self.revision)?;
        }
        if !self.version.pre.is_empty() {
            write!(f, "-{}", self.version.pre)?;
        }
        if !self.version.build.is_empty() {
            write!(f, "+{}", self.version.build)?;
        }
        Ok(())
    }
}
