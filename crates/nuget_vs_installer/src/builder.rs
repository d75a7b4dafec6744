use std::sync::Arc;

use nuget_vs_config::Config;
use nuget_vs_sources::{
    ConfiguredPreinstalledLocator, ConfiguredSourceRepositoryProvider, PreinstalledSourceLocator,
    SourceRepositoryProvider, SourceResolver,
};

use crate::{
    VsPackageInstaller,
    pipeline::{InstallPipeline, SolutionManager},
    telemetry::{TelemetryProvider, TracingTelemetryProvider},
};

/// Constructs a [`VsPackageInstaller`].
///
/// Everything that is not set explicitly is derived from the configuration.
pub struct VsPackageInstallerBuilder<B> {
    bridge: B,
    solution_manager: Arc<dyn SolutionManager>,
    pipeline: Arc<dyn InstallPipeline>,
    config: Option<Config>,
    source_provider: Option<Arc<dyn SourceRepositoryProvider>>,
    locator: Option<Arc<dyn PreinstalledSourceLocator>>,
    telemetry: Option<Arc<dyn TelemetryProvider>>,
}

impl<B> VsPackageInstallerBuilder<B> {
    pub(crate) fn new(
        bridge: B,
        solution_manager: Arc<dyn SolutionManager>,
        pipeline: Arc<dyn InstallPipeline>,
    ) -> Self {
        Self {
            bridge,
            solution_manager,
            pipeline,
            config: None,
            source_provider: None,
            locator: None,
            telemetry: None,
        }
    }

    /// Sets the configuration. Defaults to an empty configuration.
    pub fn with_config(self, config: Config) -> Self {
        Self {
            config: Some(config),
            ..self
        }
    }

    /// Sets the live configured sources of the host. Defaults to the package
    /// sources of the configuration.
    pub fn with_source_provider(self, provider: Arc<dyn SourceRepositoryProvider>) -> Self {
        Self {
            source_provider: Some(provider),
            ..self
        }
    }

    /// Sets how repositories that ship with the host are found. Defaults to
    /// the `[preinstalled]` table of the configuration.
    pub fn with_locator(self, locator: Arc<dyn PreinstalledSourceLocator>) -> Self {
        Self {
            locator: Some(locator),
            ..self
        }
    }

    /// Sets where failures are reported. Defaults to
    /// [`TracingTelemetryProvider`].
    pub fn with_telemetry(self, telemetry: Arc<dyn TelemetryProvider>) -> Self {
        Self {
            telemetry: Some(telemetry),
            ..self
        }
    }

    pub fn finish(self) -> VsPackageInstaller<B> {
        let config = self.config.unwrap_or_default();
        let source_provider: Arc<dyn SourceRepositoryProvider> = match self.source_provider {
            Some(provider) => provider,
            None => Arc::new(ConfiguredSourceRepositoryProvider::from_config(&config)),
        };
        let locator: Arc<dyn PreinstalledSourceLocator> = match self.locator {
            Some(locator) => locator,
            None => Arc::new(ConfiguredPreinstalledLocator::new(&config.preinstalled)),
        };
        let telemetry: Arc<dyn TelemetryProvider> = match self.telemetry {
            Some(telemetry) => telemetry,
            None => Arc::new(TracingTelemetryProvider),
        };

        VsPackageInstaller {
            bridge: self.bridge,
            solution_manager: self.solution_manager,
            pipeline: self.pipeline,
            resolver: SourceResolver::new(source_provider),
            locator,
            telemetry,
            config,
        }
    }
}
