use std::{fmt::Debug, sync::Arc};

use nuget_vs_config::Config;
use parking_lot::RwLock;

use crate::{FeedType, PackageSource};

/// A package source together with the way packages are read from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRepository {
    source: PackageSource,
    feed_type: FeedType,
}

impl SourceRepository {
    pub fn new(source: PackageSource) -> Self {
        let feed_type = FeedType::detect(source.source());
        Self { source, feed_type }
    }

    /// Constructs a repository whose feed type is known upfront instead of
    /// being derived from the address.
    pub fn with_feed_type(source: PackageSource, feed_type: FeedType) -> Self {
        Self { source, feed_type }
    }

    pub fn package_source(&self) -> &PackageSource {
        &self.source
    }

    pub fn feed_type(&self) -> FeedType {
        self.feed_type
    }
}

/// Provides the repositories an installation searches.
pub trait SourceRepositoryProvider: Debug + Send + Sync {
    /// The enabled repositories, in priority order.
    fn repositories(&self) -> Vec<Arc<SourceRepository>>;

    /// Constructs a repository for a source that is not part of
    /// [`Self::repositories`].
    fn create_repository(&self, source: PackageSource) -> Arc<SourceRepository> {
        Arc::new(SourceRepository::new(source))
    }

    fn create_repository_with_feed_type(
        &self,
        source: PackageSource,
        feed_type: FeedType,
    ) -> Arc<SourceRepository> {
        Arc::new(SourceRepository::with_feed_type(source, feed_type))
    }
}

/// The package sources the host is configured with.
///
/// The provider is shared by reference. When the configuration of the host
/// changes the sources are replaced with [`Self::update_sources`], everyone
/// holding the provider observes the new set.
#[derive(Debug, Default)]
pub struct ConfiguredSourceRepositoryProvider {
    sources: RwLock<Vec<Arc<SourceRepository>>>,
}

impl ConfiguredSourceRepositoryProvider {
    pub fn new(sources: impl IntoIterator<Item = PackageSource>) -> Self {
        let provider = Self::default();
        provider.update_sources(sources);
        provider
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.package_sources.iter().map(PackageSource::from_config))
    }

    /// Replaces the configured sources.
    pub fn update_sources(&self, sources: impl IntoIterator<Item = PackageSource>) {
        let sources = sources
            .into_iter()
            .map(|source| Arc::new(SourceRepository::new(source)))
            .collect::<Vec<_>>();
        tracing::debug!("configured {} package source(s)", sources.len());
        *self.sources.write() = sources;
    }

    /// All configured sources, including the disabled ones.
    pub fn package_sources(&self) -> Vec<PackageSource> {
        self.sources
            .read()
            .iter()
            .map(|repository| repository.package_source().clone())
            .collect()
    }
}

impl SourceRepositoryProvider for ConfiguredSourceRepositoryProvider {
    fn repositories(&self) -> Vec<Arc<SourceRepository>> {
        self.sources
            .read()
            .iter()
            .filter(|repository| repository.package_source().is_enabled())
            .cloned()
            .collect()
    }
}
