//! Package sources and the repositories they are read from.
//!
//! The [`SourceResolver`] turns what a caller asked for into a [`SourceSet`]:
//! either the live configured sources of the host, or a fixed list of
//! repositories for a single installation. Repositories that ship with the
//! host are found through a [`PreinstalledSourceLocator`].

mod error;
mod preinstalled;
mod repository;
mod resolver;
mod source;

pub use error::SourceError;
pub use preinstalled::{
    ConfiguredPreinstalledLocator, EXTENSION_PACKAGES_DIR, PreinstalledRepositoryProvider,
    PreinstalledSourceLocator,
};
pub use repository::{ConfiguredSourceRepositoryProvider, SourceRepository, SourceRepositoryProvider};
pub use resolver::{ALL_SOURCES, SourceResolver, SourceSet, SourceSpec};
pub use source::{FeedType, PackageSource, is_absolute_source};
