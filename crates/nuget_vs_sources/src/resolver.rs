use std::sync::Arc;

use itertools::Itertools;

use crate::{
    PackageSource, PreinstalledRepositoryProvider, SourceError, SourceRepository,
    SourceRepositoryProvider, is_absolute_source, source::eq_ignore_case,
};

/// Older callers pass this instead of leaving the source empty to select
/// every configured source.
pub const ALL_SOURCES: &str = "All";

/// The sources a caller asked an installation to use.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceSpec {
    /// A single source: the address of a configured source, an absolute uri
    /// or an absolute path.
    Single(String),

    /// Several sources, each following the rules of [`SourceSpec::Single`].
    Many(Vec<String>),
}

impl SourceSpec {
    /// Returns true if the specifier does not name any source.
    pub fn is_empty(&self) -> bool {
        match self {
            SourceSpec::Single(source) => source.is_empty(),
            SourceSpec::Many(sources) => sources.is_empty(),
        }
    }
}

impl From<&str> for SourceSpec {
    fn from(value: &str) -> Self {
        SourceSpec::Single(value.to_string())
    }
}

impl From<String> for SourceSpec {
    fn from(value: String) -> Self {
        SourceSpec::Single(value)
    }
}

impl From<Vec<String>> for SourceSpec {
    fn from(value: Vec<String>) -> Self {
        SourceSpec::Many(value)
    }
}

impl<'a> FromIterator<&'a str> for SourceSpec {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        SourceSpec::Many(iter.into_iter().map(ToOwned::to_owned).collect())
    }
}

/// The repositories an installation searches.
#[derive(Debug, Clone)]
pub enum SourceSet {
    /// The live configured sources of the host.
    Configured(Arc<dyn SourceRepositoryProvider>),

    /// A fixed list of sources that only exists for a single installation.
    /// This list is never empty.
    Explicit(PreinstalledRepositoryProvider),
}

impl SourceSet {
    pub fn provider(&self) -> &dyn SourceRepositoryProvider {
        match self {
            SourceSet::Configured(provider) => provider.as_ref(),
            SourceSet::Explicit(provider) => provider,
        }
    }

    pub fn repositories(&self) -> Vec<Arc<SourceRepository>> {
        self.provider().repositories()
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, SourceSet::Configured(_))
    }
}

/// Turns source specifiers into the set of repositories to search.
///
/// Resolution only constructs metadata, it never touches the network or the
/// disk.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    provider: Arc<dyn SourceRepositoryProvider>,
}

impl SourceResolver {
    pub fn new(provider: Arc<dyn SourceRepositoryProvider>) -> Self {
        Self { provider }
    }

    /// The provider of the configured sources.
    pub fn provider(&self) -> &Arc<dyn SourceRepositoryProvider> {
        &self.provider
    }

    /// Resolves `spec` into a source set.
    ///
    /// A missing or empty specifier selects the configured sources. When
    /// `all_respected` is set the legacy [`ALL_SOURCES`] value does the same,
    /// otherwise it is resolved like any other source.
    pub fn resolve(
        &self,
        spec: Option<SourceSpec>,
        all_respected: bool,
    ) -> Result<SourceSet, SourceError> {
        let sources = match spec {
            None => return Ok(self.configured()),
            Some(spec) if spec.is_empty() => return Ok(self.configured()),
            Some(SourceSpec::Single(source))
                if all_respected && eq_ignore_case(&source, ALL_SOURCES) =>
            {
                return Ok(self.configured());
            }
            Some(SourceSpec::Single(source)) => vec![source],
            Some(SourceSpec::Many(sources)) => sources,
        };

        let mut provider = PreinstalledRepositoryProvider::new(self.provider.clone());
        for source in &sources {
            provider.add_from_source(self.resolve_source(source)?);
        }
        tracing::debug!(
            "installing from {}",
            provider
                .repositories()
                .iter()
                .map(|repository| repository.package_source().source())
                .format(", ")
        );
        Ok(SourceSet::Explicit(provider))
    }

    /// Resolves a single source to the configured repository with the same
    /// address, or to a new repository if the source is an absolute uri.
    pub fn resolve_source(&self, source: &str) -> Result<Arc<SourceRepository>, SourceError> {
        if let Some(repository) = self
            .provider
            .repositories()
            .into_iter()
            .find(|repository| repository.package_source().matches_address(source))
        {
            return Ok(repository);
        }

        if is_absolute_source(source) {
            return Ok(self
                .provider
                .create_repository(PackageSource::new(source)));
        }

        Err(SourceError::InvalidSource(source.to_string()))
    }

    fn configured(&self) -> SourceSet {
        tracing::debug!("installing from the configured package sources");
        SourceSet::Configured(self.provider.clone())
    }
}
