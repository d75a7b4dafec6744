use std::ops::BitOr;

use nuget_vs_config::{Config, SignatureValidationMode, XmlDocFileSaveMode};

/// Which parts of a package are written to disk when it is extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageSaveMode(u8);

impl PackageSaveMode {
    pub const NUSPEC: Self = Self(1);
    pub const NUPKG: Self = Self(1 << 1);
    pub const FILES: Self = Self(1 << 2);

    /// The layout used by projects that reference packages through a
    /// `packages.config` file.
    pub const DEFAULT_V2: Self = Self(Self::NUPKG.0 | Self::FILES.0);

    /// The layout of the global packages folder.
    pub const DEFAULT_V3: Self = Self(Self::NUSPEC.0 | Self::NUPKG.0 | Self::FILES.0);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for PackageSaveMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedSigner {
    pub name: String,
    pub certificate_fingerprints: Vec<String>,
}

/// Describes which package signatures the client accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientPolicyContext {
    pub verification: SignatureValidationMode,
    pub allow_list: Vec<TrustedSigner>,
}

impl ClientPolicyContext {
    /// Builds the client policy from the configured validation mode and the
    /// trusted signers.
    pub fn from_config(config: &Config) -> Self {
        Self {
            verification: config.signature_validation_mode(),
            allow_list: config
                .trusted_signers
                .iter()
                .map(|signer| TrustedSigner {
                    name: signer.name.clone(),
                    certificate_fingerprints: signer
                        .certificate_fingerprints
                        .iter()
                        .map(|fingerprint| normalize_fingerprint(fingerprint))
                        .collect(),
                })
                .collect(),
        }
    }

    /// Returns the trusted signer that owns the certificate with the given
    /// fingerprint.
    pub fn trusted_signer(&self, fingerprint: &str) -> Option<&TrustedSigner> {
        let fingerprint = normalize_fingerprint(fingerprint);
        self.allow_list.iter().find(|signer| {
            signer
                .certificate_fingerprints
                .iter()
                .any(|candidate| *candidate == fingerprint)
        })
    }
}

/// Fingerprints are compared without separators and case.
fn normalize_fingerprint(fingerprint: &str) -> String {
    fingerprint
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Where the extraction steps of the install pipeline write their log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionLogging {
    /// Extraction is silent.
    #[default]
    Silent,
    /// Extraction messages are emitted as `tracing` events.
    Tracing,
}

/// Controls how the install pipeline extracts packages into a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageExtractionContext {
    pub save_mode: PackageSaveMode,
    pub xml_doc_file_save_mode: XmlDocFileSaveMode,
    pub client_policy: ClientPolicyContext,
    pub logging: ExtractionLogging,
}

impl PackageExtractionContext {
    /// The extraction context used for installs requested through the host
    /// API: the v2 layout, xml docs and signature policy from the
    /// configuration and silent extraction.
    pub fn from_config(config: &Config) -> Self {
        Self {
            save_mode: PackageSaveMode::DEFAULT_V2,
            xml_doc_file_save_mode: config.xml_doc_file_save_mode(),
            client_policy: ClientPolicyContext::from_config(config),
            logging: ExtractionLogging::Silent,
        }
    }
}
