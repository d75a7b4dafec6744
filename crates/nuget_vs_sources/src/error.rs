use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum SourceError {
    #[error("'{0}' is not a configured package source or an absolute uri")]
    #[diagnostic(
        code(sources::invalid_source),
        help("use the address of a configured source, an absolute url or an absolute path")
    )]
    InvalidSource(String),

    #[error("no preinstalled packages are registered under the registry key '{0}'")]
    #[diagnostic(code(sources::registry_key_not_found))]
    RegistryKeyNotFound(String),

    #[error("the extension '{0}' is not installed or does not carry packages")]
    #[diagnostic(code(sources::extension_not_found))]
    ExtensionNotFound(String),
}
