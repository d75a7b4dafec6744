//! Turns the different shapes of install calls into a single
//! [`InstallRequest`].

use std::sync::Arc;

use indexmap::IndexMap;
use nuget_vs_packaging::{NuGetVersion, PackageIdentity};
use nuget_vs_sources::{
    PreinstalledRepositoryProvider, PreinstalledSourceLocator, SourceError, SourceRepositoryProvider,
    SourceResolver, SourceSet, SourceSpec,
};

use crate::{InstallerError, ProjectContext, project::HostProject};

/// Names of the parameters that are reported in
/// [`InstallerError::InvalidArgument`].
pub mod parameter {
    pub const KEY_NAME: &str = "keyName";
    pub const EXTENSION_ID: &str = "extensionId";
    pub const PROJECT: &str = "project";
    pub const PACKAGE_VERSIONS: &str = "packageVersions";
    pub const PACKAGE_ID: &str = "packageId";
}

/// Maps package ids to the version to install. The order of the entries is
/// the order in which the packages are requested.
pub type PackageVersions = IndexMap<String, String>;

/// Everything the install pipeline needs to perform one installation.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub identities: Vec<PackageIdentity>,
    pub sources: SourceSet,
    pub project_context: ProjectContext,
    pub include_prerelease: bool,
    pub ignore_dependencies: bool,
}

/// The package and the sources of a single package install.
#[derive(Debug, Clone)]
pub struct PreparedInstallation {
    pub identity: PackageIdentity,
    pub sources: SourceSet,
}

/// Validates the package id and resolves the sources of a single package
/// install.
pub fn prepare_for_installation(
    resolver: &SourceResolver,
    source: Option<SourceSpec>,
    package_id: &str,
    version: Option<NuGetVersion>,
    all_respected: bool,
) -> Result<PreparedInstallation, InstallerError> {
    let identity = package_identity(package_id, version)?;
    let sources = resolver
        .resolve(source, all_respected)
        .map_err(InstallerError::InvalidSource)?;
    Ok(PreparedInstallation { identity, sources })
}

/// Parses a version that was passed as a string. A version that cannot be
/// parsed selects the latest version.
pub fn parse_version(version: Option<&str>) -> Option<NuGetVersion> {
    let version = version?;
    let parsed = NuGetVersion::try_parse(version);
    if parsed.is_none() {
        tracing::debug!("'{version}' is not a valid version, installing the latest version");
    }
    parsed
}

/// Converts a mapping of package ids to versions into identities, in the
/// order of the mapping.
pub fn identities_from_versions(
    versions: &PackageVersions,
) -> Result<Vec<PackageIdentity>, InstallerError> {
    versions
        .iter()
        .map(|(id, version)| package_identity(id, parse_version(Some(version))))
        .collect()
}

fn package_identity(
    package_id: &str,
    version: Option<NuGetVersion>,
) -> Result<PackageIdentity, InstallerError> {
    PackageIdentity::new(package_id, version)
        .map_err(|err| InstallerError::invalid_argument(parameter::PACKAGE_ID, err.to_string()))
}

/// A place packages that ship with the host are registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideChannel<'a> {
    /// A registry key that names a folder of packages.
    Registry(&'a str),
    /// A host extension that bundles packages.
    Extension(&'a str),
}

impl SideChannel<'_> {
    /// The name of the parameter that carries the side channel.
    pub fn parameter(&self) -> &'static str {
        match self {
            SideChannel::Registry(_) => parameter::KEY_NAME,
            SideChannel::Extension(_) => parameter::EXTENSION_ID,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SideChannel::Registry(key_name) => key_name,
            SideChannel::Extension(extension_id) => extension_id,
        }
    }

    /// Constructs the source set that contains only the repository of this
    /// side channel. `is_pre_unzipped` only applies to registry repositories.
    pub fn preinstalled_provider(
        &self,
        base: Arc<dyn SourceRepositoryProvider>,
        locator: &dyn PreinstalledSourceLocator,
        is_pre_unzipped: bool,
    ) -> Result<PreinstalledRepositoryProvider, SourceError> {
        let mut provider = PreinstalledRepositoryProvider::new(base);
        match self {
            SideChannel::Registry(key_name) => {
                provider.add_from_registry(locator, key_name, is_pre_unzipped)?
            }
            SideChannel::Extension(extension_id) => {
                provider.add_from_extension(locator, extension_id)?
            }
        }
        Ok(provider)
    }
}

/// Validates the arguments of an install from a side channel and converts
/// the requested packages into identities.
pub fn validate_side_channel_request<'p>(
    channel: SideChannel<'_>,
    project: Option<&'p dyn HostProject>,
    package_versions: Option<&PackageVersions>,
) -> Result<(&'p dyn HostProject, Vec<PackageIdentity>), InstallerError> {
    if channel.name().is_empty() {
        return Err(InstallerError::invalid_argument(
            channel.parameter(),
            "the value cannot be empty",
        ));
    }
    let project = project.ok_or_else(|| {
        InstallerError::invalid_argument(parameter::PROJECT, "a project is required")
    })?;
    let package_versions = match package_versions {
        None => {
            return Err(InstallerError::invalid_argument(
                parameter::PACKAGE_VERSIONS,
                "the packages to install are required",
            ));
        }
        Some(versions) if versions.is_empty() => {
            return Err(InstallerError::invalid_argument(
                parameter::PACKAGE_VERSIONS,
                "at least one package must be specified",
            ));
        }
        Some(versions) => versions,
    };
    Ok((project, identities_from_versions(package_versions)?))
}
