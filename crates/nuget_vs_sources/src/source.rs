use std::{
    fmt::{Display, Formatter},
    path::Path,
};

use nuget_vs_config::PackageSourceConfig;
use url::Url;

/// The layout of a package feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedType {
    /// A server that speaks the legacy OData protocol.
    HttpV2,
    /// A server that exposes a service index (`index.json`).
    HttpV3,
    /// A folder with `.nupkg` files next to each other.
    FileSystemV2,
    /// A folder with `{id}/{version}/` sub-folders.
    FileSystemV3,
    /// A folder with packages that have already been extracted.
    FileSystemUnzipped,
    /// A local folder whose layout is only known once it is read.
    FileSystemUnknown,
    Undefined,
}

impl FeedType {
    /// Determines the feed type from the address alone, without touching the
    /// network or the disk.
    pub fn detect(source: &str) -> Self {
        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                if url.path().to_ascii_lowercase().ends_with(".json") {
                    FeedType::HttpV3
                } else {
                    FeedType::HttpV2
                }
            }
            Ok(url) if url.scheme() == "file" => FeedType::FileSystemUnknown,
            _ if Path::new(source).is_absolute() => FeedType::FileSystemUnknown,
            _ => FeedType::Undefined,
        }
    }

    pub fn is_http(self) -> bool {
        matches!(self, FeedType::HttpV2 | FeedType::HttpV3)
    }

    pub fn is_file_system(self) -> bool {
        matches!(
            self,
            FeedType::FileSystemV2
                | FeedType::FileSystemV3
                | FeedType::FileSystemUnzipped
                | FeedType::FileSystemUnknown
        )
    }
}

/// A named location that packages are installed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageSource {
    name: String,
    source: String,
    is_enabled: bool,
}

impl PackageSource {
    /// Constructs an enabled source that is named after its address.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            name: source.clone(),
            source,
            is_enabled: true,
        }
    }

    pub fn with_name(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            is_enabled: true,
        }
    }

    /// Constructs a source from a local folder.
    pub fn from_path(path: &Path) -> Self {
        Self::new(path.to_string_lossy().into_owned())
    }

    pub fn from_config(config: &PackageSourceConfig) -> Self {
        Self {
            name: config.name.clone(),
            source: config.source.clone(),
            is_enabled: config.enabled,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The address of the source, either a url or a path.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.is_enabled = enabled;
    }

    pub fn is_http(&self) -> bool {
        FeedType::detect(&self.source).is_http()
    }

    pub fn is_local(&self) -> bool {
        FeedType::detect(&self.source).is_file_system()
    }

    /// Returns true if the address matches `address`, ignoring case.
    pub fn matches_address(&self, address: &str) -> bool {
        eq_ignore_case(&self.source, address)
    }
}

impl Display for PackageSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.name == self.source {
            write!(f, "{}", self.source)
        } else {
            write!(f, "{} ({})", self.name, self.source)
        }
    }
}

/// Returns true if `source` can be used as the address of a new package
/// source: an absolute uri or an absolute filesystem path.
pub fn is_absolute_source(source: &str) -> bool {
    if source.trim().is_empty() {
        return false;
    }
    Url::parse(source).is_ok() || Path::new(source).is_absolute()
}

pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
