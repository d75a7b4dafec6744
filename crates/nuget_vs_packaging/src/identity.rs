use std::fmt::Display;

use miette::Diagnostic;
use thiserror::Error;

use crate::NuGetVersion;

/// Identifies a single installable package.
///
/// A missing version means "the latest stable version at install time".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageIdentity {
    id: String,
    version: Option<NuGetVersion>,
}

#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
#[error("a package id cannot be empty")]
#[diagnostic(code(package_identity::empty_id))]
pub struct InvalidPackageIdentityError;

impl PackageIdentity {
    pub fn new(
        id: impl Into<String>,
        version: Option<NuGetVersion>,
    ) -> Result<Self, InvalidPackageIdentityError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(InvalidPackageIdentityError);
        }
        Ok(Self { id, version })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> Option<&NuGetVersion> {
        self.version.as_ref()
    }

    /// Returns true if this identity refers to whatever version is the latest
    /// at install time.
    pub fn is_latest(&self) -> bool {
        self.version.is_none()
    }
}

impl Display for PackageIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} {}", self.id, version),
            None => write!(f, "{} (latest)", self.id),
        }
    }
}
