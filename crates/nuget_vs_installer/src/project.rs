use std::{fmt::Debug, path::Path};

/// The file that marks a project as build-integrated.
pub const PROJECT_JSON: &str = "project.json";

/// Suffix of the project-specific variant of [`PROJECT_JSON`].
const PROJECT_JSON_SUFFIX: &str = ".project.json";

/// A project as it is known to the host.
pub trait HostProject: Debug {
    /// The short name of the project.
    fn name(&self) -> &str;

    /// A name that identifies the project within its solution.
    fn unique_name(&self) -> &str;

    /// The path of the project file, if the project is backed by one.
    fn project_file(&self) -> Option<&Path>;
}

/// A project that packages can be installed into.
pub trait NuGetProject: Debug {
    fn name(&self) -> &str;
}

/// Returns true if the project uses the build-integrated format: a
/// `project.json` or `<name>.project.json` next to its project file.
pub fn is_build_integrated(project: &dyn HostProject) -> bool {
    let Some(directory) = project.project_file().and_then(Path::parent) else {
        return false;
    };
    directory.join(PROJECT_JSON).is_file()
        || directory
            .join(format!("{}{PROJECT_JSON_SUFFIX}", project.name()))
            .is_file()
}
