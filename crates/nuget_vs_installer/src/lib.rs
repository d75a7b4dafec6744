//! A synchronous API to install packages into the projects of a host.
//!
//! The host calls the [`VsPackageInstaller`] on its apartment thread. Each
//! call is normalized into an [`InstallRequest`] and then handed to the
//! [`InstallPipeline`] through a [`SyncBridge`](nuget_vs_threading::SyncBridge)
//! that keeps the apartment thread responsive while the installation runs.

mod builder;
mod context;
mod error;
mod installer;
mod pipeline;
pub mod project;
pub mod request;
mod telemetry;

pub use builder::VsPackageInstallerBuilder;
pub use context::ProjectContext;
pub use error::{InstallerError, PipelineError};
pub use installer::VsPackageInstaller;
pub use pipeline::{InstallPipeline, LegacyPackageRepository, SolutionManager};
pub use project::{HostProject, NuGetProject};
pub use request::{InstallRequest, PackageVersions};
pub use telemetry::{INSTALLER_COMPONENT, TelemetryProvider, TracingTelemetryProvider};
