use std::{
    error::Error as StdError,
    fmt::{Debug, Display},
};

use miette::{Diagnostic, LabeledSpan, Report, Severity, SourceCode};
use nuget_vs_sources::SourceError;
use nuget_vs_threading::BridgeError;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum InstallerError {
    /// A required argument is missing or empty.
    #[error("invalid value for '{parameter}': {reason}")]
    #[diagnostic(code(installer::invalid_argument))]
    InvalidArgument {
        parameter: &'static str,
        reason: String,
    },

    /// An explicit source could not be resolved.
    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidSource(SourceError),

    #[error("installing from a legacy package repository is not supported")]
    #[diagnostic(
        code(installer::unsupported),
        help("pass the address of the repository as the package source instead")
    )]
    Unsupported,

    /// The repository that ships with the host could not be located.
    #[error(transparent)]
    #[diagnostic(transparent)]
    PreinstalledRepository(SourceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Bridge(#[from] BridgeError),

    /// A collaborator failed, the original error is carried unchanged.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Pipeline(#[from] PipelineError),
}

impl InstallerError {
    pub(crate) fn invalid_argument(parameter: &'static str, reason: impl Into<String>) -> Self {
        InstallerError::InvalidArgument {
            parameter,
            reason: reason.into(),
        }
    }

    /// Returns the name of the parameter this error is about, if any.
    pub fn parameter(&self) -> Option<&'static str> {
        match self {
            InstallerError::InvalidArgument { parameter, .. } => Some(*parameter),
            _ => None,
        }
    }
}

/// An error returned by the solution manager or the install pipeline.
///
/// The error is not wrapped: its message, source chain and diagnostic
/// information are those of the original error, and the original error can be
/// retrieved with [`PipelineError::downcast_ref`].
pub struct PipelineError(Report);

impl PipelineError {
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: Display + Debug + Send + Sync + 'static,
    {
        self.0.downcast_ref::<E>()
    }

    pub fn into_report(self) -> Report {
        self.0
    }
}

impl From<Report> for PipelineError {
    fn from(value: Report) -> Self {
        Self(value)
    }
}

impl Debug for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl StdError for PipelineError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl Diagnostic for PipelineError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.0.code()
    }

    fn severity(&self) -> Option<Severity> {
        self.0.severity()
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.0.help()
    }

    fn url<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.0.url()
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.0.source_code()
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        self.0.labels()
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        self.0.related()
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        self.0.diagnostic_source()
    }
}
