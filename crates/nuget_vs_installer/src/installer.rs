use std::{future::Future, sync::Arc};

use nuget_vs_config::Config;
use nuget_vs_packaging::NuGetVersion;
use nuget_vs_sources::{PreinstalledSourceLocator, SourceResolver, SourceSet, SourceSpec};
use nuget_vs_threading::SyncBridge;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
    InstallRequest, InstallerError, PipelineError, ProjectContext,
    builder::VsPackageInstallerBuilder,
    pipeline::{InstallPipeline, LegacyPackageRepository, SolutionManager},
    project::{HostProject, is_build_integrated},
    request::{
        PackageVersions, SideChannel, parse_version, prepare_for_installation,
        validate_side_channel_request,
    },
    telemetry::{TelemetryProvider, report_fault},
};

/// Installs packages into projects of the host.
///
/// Every method blocks until the installation finished and must be called on
/// the apartment thread of the bridge. Arguments are validated before any
/// work starts, invalid arguments are returned immediately. All other
/// failures are reported to the [`TelemetryProvider`] and then returned
/// unchanged.
pub struct VsPackageInstaller<B> {
    pub(crate) bridge: B,
    pub(crate) solution_manager: Arc<dyn SolutionManager>,
    pub(crate) pipeline: Arc<dyn InstallPipeline>,
    pub(crate) config: Config,
    pub(crate) resolver: SourceResolver,
    pub(crate) locator: Arc<dyn PreinstalledSourceLocator>,
    pub(crate) telemetry: Arc<dyn TelemetryProvider>,
}

impl<B: SyncBridge> VsPackageInstaller<B> {
    pub fn builder(
        bridge: B,
        solution_manager: Arc<dyn SolutionManager>,
        pipeline: Arc<dyn InstallPipeline>,
    ) -> VsPackageInstallerBuilder<B> {
        VsPackageInstallerBuilder::new(bridge, solution_manager, pipeline)
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Installs the latest version of a package.
    ///
    /// Without a `source` the configured sources are used, `"All"` selects
    /// them as well.
    #[instrument(skip_all, fields(package_id = %package_id))]
    pub fn install_latest_package(
        &self,
        source: Option<SourceSpec>,
        project: &dyn HostProject,
        package_id: &str,
        include_prerelease: bool,
        ignore_dependencies: bool,
    ) -> Result<(), InstallerError> {
        let prepared = prepare_for_installation(&self.resolver, source, package_id, None, true)?;
        let request = InstallRequest {
            identities: vec![prepared.identity],
            sources: prepared.sources,
            project_context: ProjectContext::from_config(&self.config),
            include_prerelease,
            ignore_dependencies,
        };
        self.run_blocking(|| self.install(project, request))
    }

    /// Installs a specific version of a package, or the latest stable
    /// version if `version` is `None`.
    ///
    /// Sources are selected like [`Self::install_latest_package`] does.
    #[instrument(skip_all, fields(package_id = %package_id))]
    pub fn install_package(
        &self,
        source: Option<SourceSpec>,
        project: &dyn HostProject,
        package_id: &str,
        version: Option<&NuGetVersion>,
        ignore_dependencies: bool,
    ) -> Result<(), InstallerError> {
        self.install_version(
            source,
            project,
            package_id,
            version.cloned(),
            ignore_dependencies,
        )
    }

    /// Like [`Self::install_package`] with a version that is parsed first. A
    /// version that cannot be parsed installs the latest stable version.
    #[instrument(skip_all, fields(package_id = %package_id))]
    pub fn install_package_with_version_string(
        &self,
        source: Option<SourceSpec>,
        project: &dyn HostProject,
        package_id: &str,
        version: Option<&str>,
        ignore_dependencies: bool,
    ) -> Result<(), InstallerError> {
        self.install_version(
            source,
            project,
            package_id,
            parse_version(version),
            ignore_dependencies,
        )
    }

    /// Always fails, installing from a legacy repository handle is not
    /// supported.
    pub fn install_package_from_repository(
        &self,
        _repository: &dyn LegacyPackageRepository,
        _project: &dyn HostProject,
        _package_id: &str,
        _version: Option<&str>,
        _ignore_dependencies: bool,
    ) -> Result<(), InstallerError> {
        Err(InstallerError::Unsupported)
    }

    /// Installs packages from the folder that is registered under
    /// `key_name`.
    ///
    /// `is_pre_unzipped` is ignored for build-integrated projects.
    #[instrument(skip_all, fields(key_name = %key_name))]
    pub fn install_packages_from_registry_repository(
        &self,
        key_name: &str,
        is_pre_unzipped: bool,
        skip_assembly_references: bool,
        ignore_dependencies: bool,
        project: Option<&dyn HostProject>,
        package_versions: Option<&PackageVersions>,
    ) -> Result<(), InstallerError> {
        self.install_from_side_channel(
            SideChannel::Registry(key_name),
            is_pre_unzipped,
            skip_assembly_references,
            ignore_dependencies,
            project,
            package_versions,
        )
    }

    /// [`Self::install_packages_from_registry_repository`] without installing
    /// dependencies.
    pub fn install_packages_from_registry_repository_ignoring_dependencies(
        &self,
        key_name: &str,
        is_pre_unzipped: bool,
        skip_assembly_references: bool,
        project: Option<&dyn HostProject>,
        package_versions: Option<&PackageVersions>,
    ) -> Result<(), InstallerError> {
        self.install_packages_from_registry_repository(
            key_name,
            is_pre_unzipped,
            skip_assembly_references,
            true,
            project,
            package_versions,
        )
    }

    /// Installs packages that are bundled with the host extension
    /// `extension_id`.
    ///
    /// `is_pre_unzipped` is ignored, extensions bundle plain package folders.
    #[instrument(skip_all, fields(extension_id = %extension_id))]
    pub fn install_packages_from_vs_extension_repository(
        &self,
        extension_id: &str,
        is_pre_unzipped: bool,
        skip_assembly_references: bool,
        ignore_dependencies: bool,
        project: Option<&dyn HostProject>,
        package_versions: Option<&PackageVersions>,
    ) -> Result<(), InstallerError> {
        self.install_from_side_channel(
            SideChannel::Extension(extension_id),
            is_pre_unzipped,
            skip_assembly_references,
            ignore_dependencies,
            project,
            package_versions,
        )
    }

    /// [`Self::install_packages_from_vs_extension_repository`] without
    /// installing dependencies.
    pub fn install_packages_from_vs_extension_repository_ignoring_dependencies(
        &self,
        extension_id: &str,
        is_pre_unzipped: bool,
        skip_assembly_references: bool,
        project: Option<&dyn HostProject>,
        package_versions: Option<&PackageVersions>,
    ) -> Result<(), InstallerError> {
        self.install_packages_from_vs_extension_repository(
            extension_id,
            is_pre_unzipped,
            skip_assembly_references,
            true,
            project,
            package_versions,
        )
    }

    fn install_version(
        &self,
        source: Option<SourceSpec>,
        project: &dyn HostProject,
        package_id: &str,
        version: Option<NuGetVersion>,
        ignore_dependencies: bool,
    ) -> Result<(), InstallerError> {
        let prepared =
            prepare_for_installation(&self.resolver, source, package_id, version, true)?;
        let request = InstallRequest {
            identities: vec![prepared.identity],
            sources: prepared.sources,
            project_context: ProjectContext::from_config(&self.config),
            include_prerelease: false,
            ignore_dependencies,
        };
        self.run_blocking(|| self.install(project, request))
    }

    fn install_from_side_channel(
        &self,
        channel: SideChannel<'_>,
        is_pre_unzipped: bool,
        skip_assembly_references: bool,
        ignore_dependencies: bool,
        project: Option<&dyn HostProject>,
        package_versions: Option<&PackageVersions>,
    ) -> Result<(), InstallerError> {
        let (project, identities) =
            validate_side_channel_request(channel, project, package_versions)?;
        let project_context =
            ProjectContext::with_skipped_assembly_references(&self.config, skip_assembly_references);

        self.run_blocking(|| async move {
            let is_pre_unzipped = match channel {
                SideChannel::Registry(_) => is_pre_unzipped && !is_build_integrated(project),
                SideChannel::Extension(_) => false,
            };
            let provider = channel
                .preinstalled_provider(
                    self.resolver.provider().clone(),
                    self.locator.as_ref(),
                    is_pre_unzipped,
                )
                .map_err(InstallerError::PreinstalledRepository)?;
            let request = InstallRequest {
                identities,
                sources: SourceSet::Explicit(provider),
                project_context,
                include_prerelease: false,
                ignore_dependencies,
            };
            self.install(project, request).await
        })
    }

    async fn install(
        &self,
        project: &dyn HostProject,
        request: InstallRequest,
    ) -> Result<(), InstallerError> {
        tracing::debug!(
            "installing {} package(s) into '{}'",
            request.identities.len(),
            project.unique_name()
        );
        let nuget_project = self
            .solution_manager
            .get_or_create_project(project, &request.project_context)
            .await
            .map_err(PipelineError::from)?;

        // Installations through this API always run to completion.
        self.pipeline
            .install(nuget_project, request, CancellationToken::new())
            .await
            .map_err(PipelineError::from)?;
        Ok(())
    }

    /// Blocks on `work`, reporting a failure before it is returned.
    fn run_blocking<F, Fut>(&self, work: F) -> Result<(), InstallerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), InstallerError>>,
    {
        self.bridge
            .run_blocking(work)
            .inspect_err(|err| report_fault(self.telemetry.as_ref(), err))
    }
}
