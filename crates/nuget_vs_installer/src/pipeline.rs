use std::{fmt::Debug, sync::Arc};

use tokio_util::sync::CancellationToken;

use crate::{
    InstallRequest, ProjectContext,
    project::{HostProject, NuGetProject},
};

/// Resolves the projects of the host.
///
/// The futures of these methods are polled on the apartment thread, they do
/// not have to be `Send`.
#[async_trait::async_trait(?Send)]
pub trait SolutionManager {
    /// Returns the project packages are installed into, creating it if the
    /// host did not load it yet.
    async fn get_or_create_project(
        &self,
        project: &dyn HostProject,
        context: &ProjectContext,
    ) -> miette::Result<Arc<dyn NuGetProject>>;
}

/// Resolves dependencies, downloads and extracts packages and modifies the
/// project.
#[async_trait::async_trait(?Send)]
pub trait InstallPipeline {
    async fn install(
        &self,
        project: Arc<dyn NuGetProject>,
        request: InstallRequest,
        cancellation_token: CancellationToken,
    ) -> miette::Result<()>;
}

/// A package repository handle of an older version of the installer API.
/// Installing from such a handle is not supported.
pub trait LegacyPackageRepository: Debug {
    fn source(&self) -> &str;
}
