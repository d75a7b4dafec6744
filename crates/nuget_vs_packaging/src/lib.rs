//! Package identities, versions and the settings that control how packages
//! are extracted into a project.

mod extraction;
mod identity;
mod version;

pub use extraction::{
    ClientPolicyContext, ExtractionLogging, PackageExtractionContext, PackageSaveMode,
    TrustedSigner,
};
pub use identity::{InvalidPackageIdentityError, PackageIdentity};
pub use nuget_vs_config::{SignatureValidationMode, XmlDocFileSaveMode};
pub use version::{NuGetVersion, ParseVersionError};
