use std::{
    collections::{BTreeMap, BTreeSet as Set},
    path::{Path, PathBuf},
    str::FromStr,
};

use itertools::Itertools;
use miette::{IntoDiagnostic, miette};
use serde::{Deserialize, Serialize, de::IntoDeserializer};

/// The directory (relative to the user configuration directory) that holds the
/// configuration file.
pub const CONFIG_DIR: &str = "nuget-vs";

/// The name of the configuration file.
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable that points to a configuration file that is used
/// instead of the one in the user configuration directory.
pub const CONFIG_PATH_ENV: &str = "NUGET_VS_CONFIG";

/// Environment variable that controls how xml documentation files are
/// extracted when the configuration does not specify it.
pub const XMLDOC_MODE_ENV: &str = "NUGET_XMLDOC_MODE";

/// Controls how package signatures are verified during extraction.
///
/// - `Accept`: unsigned packages and packages signed by anyone are accepted.
/// - `Require`: only packages signed by one of the trusted signers are
///   accepted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SignatureValidationMode {
    #[default]
    Accept,
    Require,
}

impl FromStr for SignatureValidationMode {
    type Err = serde::de::value::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::deserialize(s.to_ascii_lowercase().into_deserializer())
    }
}

impl std::fmt::Display for SignatureValidationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureValidationMode::Accept => write!(f, "accept"),
            SignatureValidationMode::Require => write!(f, "require"),
        }
    }
}

/// Controls what happens to the xml documentation files shipped inside a
/// package when it is extracted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum XmlDocFileSaveMode {
    /// Extract the files as they are.
    #[default]
    None,
    /// Do not extract the files at all.
    Skip,
    /// Store the files in a compressed archive next to the assembly.
    Compress,
}

impl FromStr for XmlDocFileSaveMode {
    type Err = serde::de::value::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::deserialize(s.trim().to_ascii_lowercase().into_deserializer())
    }
}

impl std::fmt::Display for XmlDocFileSaveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            XmlDocFileSaveMode::None => write!(f, "none"),
            XmlDocFileSaveMode::Skip => write!(f, "skip"),
            XmlDocFileSaveMode::Compress => write!(f, "compress"),
        }
    }
}

/// A package source as it is written in the configuration.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct PackageSourceConfig {
    /// The display name of the source.
    pub name: String,

    /// The address of the source, either a url or an absolute path.
    pub source: String,

    /// Disabled sources are kept in the configuration but never searched.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// A signer whose packages are trusted when signatures are required.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TrustedSignerConfig {
    pub name: String,

    /// SHA-256 fingerprints of the certificates that belong to this signer.
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub certificate_fingerprints: Vec<String>,
}

/// Locations of the package repositories that are shipped with the host
/// instead of being downloaded.
#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct PreinstalledConfig {
    /// Maps a registry key name to the folder that contains its packages.
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub registry: BTreeMap<String, PathBuf>,

    /// Maps a host extension id to its install directory.
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, PathBuf>,
}

impl PreinstalledConfig {
    pub fn is_default(&self) -> bool {
        self.registry.is_empty() && self.extensions.is_empty()
    }

    /// Merge the given config into the current one. Entries of `other` win.
    pub fn merge(mut self, other: Self) -> Self {
        self.registry.extend(other.registry);
        self.extensions.extend(other.extensions);
        self
    }
}

#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// The package sources the host is configured with, in priority order.
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub package_sources: Vec<PackageSourceConfig>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_validation_mode: Option<SignatureValidationMode>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trusted_signers: Vec<TrustedSignerConfig>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xml_doc_file_save_mode: Option<XmlDocFileSaveMode>,

    #[serde(default)]
    #[serde(skip_serializing_if = "PreinstalledConfig::is_default")]
    pub preinstalled: PreinstalledConfig,

    #[serde(skip)]
    pub loaded_from: Vec<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("no file was found at {0}")]
    FileNotFound(PathBuf),
    #[error("failed to read config from '{0}'")]
    ReadError(std::io::Error),
    #[error("failed to parse config of {1}: {0}")]
    ParseError(miette::Report, PathBuf),
    #[error("validation error of {1}: {0}")]
    ValidationError(miette::Report, PathBuf),
}

impl Config {
    /// Parse the given toml string and return a Config instance.
    ///
    /// # Returns
    ///
    /// The parsed config, and the unused keys
    pub fn from_toml(toml: &str) -> miette::Result<(Config, Set<String>)> {
        let de = toml_edit::de::Deserializer::from_str(toml).into_diagnostic()?;

        let mut unused_keys = Set::new();
        let config: Config = serde_ignored::deserialize(de, |path| {
            unused_keys.insert(path.to_string());
        })
        .into_diagnostic()?;

        Ok((config, unused_keys))
    }

    /// Load the config from the given path.
    pub fn from_path(path: &Path) -> Result<Config, ConfigError> {
        tracing::debug!("Loading config from {}", path.display());
        let s = match fs_err::read_to_string(path) {
            Ok(content) => content,
            Err(e)
                if e.kind() == std::io::ErrorKind::NotFound
                    || e.kind() == std::io::ErrorKind::NotADirectory =>
            {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::ReadError(e)),
        };

        let (mut config, unused_keys) = Config::from_toml(&s)
            .map_err(|e| ConfigError::ParseError(e, path.to_path_buf()))?;

        if !unused_keys.is_empty() {
            tracing::warn!(
                "Ignoring '{}' in {}",
                unused_keys.iter().join(", "),
                path.display()
            );
        }

        config.loaded_from.push(path.to_path_buf());

        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e, path.to_path_buf()))?;

        Ok(config)
    }

    /// Validate the config file.
    pub fn validate(&self) -> miette::Result<()> {
        let mut seen = Set::new();
        for source in &self.package_sources {
            if source.source.trim().is_empty() {
                return Err(miette!(
                    "The package source '{}' does not specify an address",
                    source.name
                ));
            }
            if !seen.insert(source.name.to_lowercase()) {
                return Err(miette!(
                    "The package source name '{}' is used more than once",
                    source.name
                ));
            }
        }

        for (key, path) in self
            .preinstalled
            .registry
            .iter()
            .chain(self.preinstalled.extensions.iter())
        {
            if !path.is_absolute() {
                return Err(miette!(
                    "The preinstalled repository path for '{}' must be an absolute path: {}",
                    key,
                    path.display()
                ));
            }
        }

        Ok(())
    }

    /// Load the global config file.
    ///
    /// A missing file is not an error, the default config is used instead.
    pub fn load_global() -> Config {
        let Some(path) = config_path_global() else {
            return Config::default();
        };

        match Self::from_path(&path) {
            Ok(config) => config,
            Err(ConfigError::FileNotFound(_)) => Config::default(),
            Err(e) => {
                tracing::error!(
                    "Failed to load global config '{}' with error: {}",
                    path.display(),
                    e
                );
                Config::default()
            }
        }
    }

    /// Merge the `other` config into `self`.
    /// The `other` config will have higher priority
    #[must_use]
    pub fn merge_config(self, mut other: Config) -> Self {
        other.loaded_from.splice(0..0, self.loaded_from);

        Self {
            package_sources: if other.package_sources.is_empty() {
                self.package_sources
            } else {
                other.package_sources
            },
            signature_validation_mode: other
                .signature_validation_mode
                .or(self.signature_validation_mode),
            trusted_signers: if other.trusted_signers.is_empty() {
                self.trusted_signers
            } else {
                other.trusted_signers
            },
            xml_doc_file_save_mode: other.xml_doc_file_save_mode.or(self.xml_doc_file_save_mode),
            preinstalled: self.preinstalled.merge(other.preinstalled),
            loaded_from: other.loaded_from,
        }
    }

    /// The signature validation mode, defaults to `accept`.
    pub fn signature_validation_mode(&self) -> SignatureValidationMode {
        self.signature_validation_mode.unwrap_or_default()
    }

    /// Returns how xml documentation files should be extracted.
    ///
    /// The configured value wins, otherwise the [`XMLDOC_MODE_ENV`]
    /// environment variable is consulted. Unknown values are ignored.
    pub fn xml_doc_file_save_mode(&self) -> XmlDocFileSaveMode {
        self.xml_doc_file_save_mode
            .or_else(|| {
                std::env::var(XMLDOC_MODE_ENV)
                    .ok()
                    .and_then(|value| value.parse().ok())
            })
            .unwrap_or_default()
    }
}

/// Returns the path to the global config file.
pub fn config_path_global() -> Option<PathBuf> {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|d| d.join(CONFIG_DIR).join(CONFIG_FILE)))
}
