use std::panic::{AssertUnwindSafe, catch_unwind};

use miette::Diagnostic;

use crate::InstallerError;

/// The component name faults of the installer are reported with.
pub const INSTALLER_COMPONENT: &str = "nuget_vs_installer::VsPackageInstaller";

/// Records failures that are returned to callers of the installer.
pub trait TelemetryProvider {
    fn post_fault(&self, error: &InstallerError, component: &str);
}

/// Reports faults as `tracing` error events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetryProvider;

impl TelemetryProvider for TracingTelemetryProvider {
    fn post_fault(&self, error: &InstallerError, component: &str) {
        match error.code() {
            Some(code) => tracing::error!(component, code = %code, "{error}"),
            None => tracing::error!(component, "{error}"),
        }
    }
}

/// Posts `error` to `provider`. A provider that panics is logged and
/// otherwise ignored.
pub(crate) fn report_fault(provider: &dyn TelemetryProvider, error: &InstallerError) {
    let reported = catch_unwind(AssertUnwindSafe(|| {
        provider.post_fault(error, INSTALLER_COMPONENT)
    }));
    if reported.is_err() {
        tracing::warn!("the telemetry provider panicked while reporting: {error}");
    }
}
