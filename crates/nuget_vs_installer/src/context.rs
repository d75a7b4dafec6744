use nuget_vs_config::Config;
use nuget_vs_packaging::PackageExtractionContext;

/// Controls how an installation modifies the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    extraction_context: PackageExtractionContext,
    skip_assembly_references: bool,
    binding_redirects_disabled: bool,
}

impl ProjectContext {
    pub fn new(
        extraction_context: PackageExtractionContext,
        skip_assembly_references: bool,
        binding_redirects_disabled: bool,
    ) -> Self {
        Self {
            extraction_context,
            skip_assembly_references,
            binding_redirects_disabled,
        }
    }

    /// Constructs a context that adds assembly references and binding
    /// redirects.
    pub fn from_config(config: &Config) -> Self {
        Self::new(PackageExtractionContext::from_config(config), false, false)
    }

    /// Constructs a context where skipping assembly references also disables
    /// binding redirects.
    pub fn with_skipped_assembly_references(config: &Config, skip_assembly_references: bool) -> Self {
        Self::new(
            PackageExtractionContext::from_config(config),
            skip_assembly_references,
            skip_assembly_references,
        )
    }

    pub fn extraction_context(&self) -> &PackageExtractionContext {
        &self.extraction_context
    }

    pub fn skip_assembly_references(&self) -> bool {
        self.skip_assembly_references
    }

    pub fn binding_redirects_disabled(&self) -> bool {
        self.binding_redirects_disabled
    }
}
