use std::{
    collections::BTreeMap,
    fmt::Debug,
    path::{Path, PathBuf},
    sync::Arc,
};

use nuget_vs_config::PreinstalledConfig;

use crate::{
    FeedType, PackageSource, SourceError, SourceRepository, SourceRepositoryProvider,
    source::eq_ignore_case,
};

/// The sub-folder of an extension's install directory that holds its
/// packages.
pub const EXTENSION_PACKAGES_DIR: &str = "Packages";

/// Finds the folders of packages that are shipped with the host.
pub trait PreinstalledSourceLocator: Debug + Send + Sync {
    /// The folder of packages registered under `key_name`.
    fn registry_repository_path(&self, key_name: &str) -> Result<PathBuf, SourceError>;

    /// The folder of packages that are bundled with the extension.
    fn extension_repository_path(&self, extension_id: &str) -> Result<PathBuf, SourceError>;
}

/// Locates preinstalled repositories through the `[preinstalled]` table of
/// the configuration. Keys and extension ids are matched ignoring case.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredPreinstalledLocator {
    registry: BTreeMap<String, PathBuf>,
    extensions: BTreeMap<String, PathBuf>,
}

impl ConfiguredPreinstalledLocator {
    pub fn new(config: &PreinstalledConfig) -> Self {
        Self {
            registry: config.registry.clone(),
            extensions: config.extensions.clone(),
        }
    }

    fn lookup<'a>(entries: &'a BTreeMap<String, PathBuf>, key: &str) -> Option<&'a Path> {
        entries
            .get(key)
            .or_else(|| {
                entries
                    .iter()
                    .find(|(name, _)| eq_ignore_case(name, key))
                    .map(|(_, path)| path)
            })
            .map(PathBuf::as_path)
    }
}

impl PreinstalledSourceLocator for ConfiguredPreinstalledLocator {
    fn registry_repository_path(&self, key_name: &str) -> Result<PathBuf, SourceError> {
        Self::lookup(&self.registry, key_name)
            .map(Path::to_path_buf)
            .ok_or_else(|| SourceError::RegistryKeyNotFound(key_name.to_string()))
    }

    fn extension_repository_path(&self, extension_id: &str) -> Result<PathBuf, SourceError> {
        Self::lookup(&self.extensions, extension_id)
            .map(|install_dir| install_dir.join(EXTENSION_PACKAGES_DIR))
            .ok_or_else(|| SourceError::ExtensionNotFound(extension_id.to_string()))
    }
}

/// A fixed, ordered list of repositories that is used for a single
/// installation instead of the configured sources.
///
/// Repositories that are not configured are created through the provider the
/// list was derived from.
#[derive(Debug, Clone)]
pub struct PreinstalledRepositoryProvider {
    base: Arc<dyn SourceRepositoryProvider>,
    repositories: Vec<Arc<SourceRepository>>,
}

impl PreinstalledRepositoryProvider {
    pub fn new(base: Arc<dyn SourceRepositoryProvider>) -> Self {
        Self {
            base,
            repositories: Vec::new(),
        }
    }

    /// Appends an already resolved repository.
    pub fn add_from_source(&mut self, repository: Arc<SourceRepository>) {
        self.repositories.push(repository);
    }

    /// Appends the repository registered under `key_name`.
    ///
    /// Pre-unzipped repositories contain extracted packages and are read as
    /// such, all others are plain folders of packages.
    pub fn add_from_registry(
        &mut self,
        locator: &dyn PreinstalledSourceLocator,
        key_name: &str,
        is_pre_unzipped: bool,
    ) -> Result<(), SourceError> {
        let path = locator.registry_repository_path(key_name)?;
        tracing::debug!(
            "using the preinstalled repository at '{}' for registry key '{key_name}'",
            path.display()
        );
        self.add_folder(&path, is_pre_unzipped);
        Ok(())
    }

    /// Appends the repository bundled with the extension `extension_id`.
    /// Extensions always bundle a plain folder of packages.
    pub fn add_from_extension(
        &mut self,
        locator: &dyn PreinstalledSourceLocator,
        extension_id: &str,
    ) -> Result<(), SourceError> {
        let path = locator.extension_repository_path(extension_id)?;
        tracing::debug!(
            "using the preinstalled repository at '{}' for extension '{extension_id}'",
            path.display()
        );
        self.add_folder(&path, false);
        Ok(())
    }

    fn add_folder(&mut self, path: &Path, is_pre_unzipped: bool) {
        let feed_type = if is_pre_unzipped {
            FeedType::FileSystemUnzipped
        } else {
            FeedType::FileSystemV2
        };
        self.repositories.push(
            self.base
                .create_repository_with_feed_type(PackageSource::from_path(path), feed_type),
        );
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

impl SourceRepositoryProvider for PreinstalledRepositoryProvider {
    fn repositories(&self) -> Vec<Arc<SourceRepository>> {
        self.repositories.clone()
    }

    fn create_repository(&self, source: PackageSource) -> Arc<SourceRepository> {
        self.base.create_repository(source)
    }

    fn create_repository_with_feed_type(
        &self,
        source: PackageSource,
        feed_type: FeedType,
    ) -> Arc<SourceRepository> {
        self.base.create_repository_with_feed_type(source, feed_type)
    }
}
