
use std::{path::PathBuf, sync::Arc, thread};

use collaborators::{
    LegacyRepository, RecordingPipeline, RecordingSolutionManager, RecordingTelemetry,
    TestProject, UnresolvableError,
};
use nuget_vs_config::{Config, PackageSourceConfig, PreinstalledConfig};
use nuget_vs_installer::{
    INSTALLER_COMPONENT, InstallerError, PackageVersions, SolutionManager, TracingTelemetryProvider,
    VsPackageInstaller,
};
use nuget_vs_packaging::NuGetVersion;
use nuget_vs_sources::{
    ConfiguredSourceRepositoryProvider, FeedType, SourceError, SourceRepositoryProvider,
    SourceSet, SourceSpec,
};
use nuget_vs_threading::{Apartment, BlockOnBridge, BridgeError, SyncBridge};
use rstest::rstest;
use tracing_subscriber::filter::LevelFilter;

/// The installer together with handles to everything it talks to.
struct Fixture<B> {
    installer: VsPackageInstaller<B>,
    sources: Arc<ConfiguredSourceRepositoryProvider>,
    solution_manager: Arc<RecordingSolutionManager>,
    pipeline: Arc<RecordingPipeline>,
    telemetry: Arc<RecordingTelemetry>,
}

fn config() -> Config {
    let mut preinstalled = PreinstalledConfig::default();
    preinstalled
        .registry
        .insert("K".to_string(), PathBuf::from("/opt/sdk/packages"));
    preinstalled.extensions.insert(
        "Contoso.Templates".to_string(),
        PathBuf::from("/opt/extensions/contoso"),
    );
    Config {
        package_sources: vec![
            PackageSourceConfig {
                name: "nuget.org".to_string(),
                source: "https://api.nuget.org/v3/index.json".to_string(),
                enabled: true,
            },
            PackageSourceConfig {
                name: "contoso".to_string(),
                source: "https://pkgs.contoso.com/nuget/v3/index.json".to_string(),
                enabled: true,
            },
        ],
        preinstalled,
        ..Config::default()
    }
}

fn fixture_with<B: SyncBridge>(bridge: B, pipeline: RecordingPipeline) -> Fixture<B> {
    let config = config();
    let sources = Arc::new(ConfiguredSourceRepositoryProvider::from_config(&config));
    let solution_manager = Arc::new(RecordingSolutionManager::default());
    let pipeline = Arc::new(pipeline);
    let telemetry = Arc::new(RecordingTelemetry::default());
    let installer = VsPackageInstaller::builder(bridge, solution_manager.clone(), pipeline.clone())
        .with_config(config)
        .with_source_provider(sources.clone())
        .with_telemetry(telemetry.clone())
        .finish();
    Fixture {
        installer,
        sources,
        solution_manager,
        pipeline,
        telemetry,
    }
}

fn fixture() -> Fixture<BlockOnBridge> {
    fixture_with(BlockOnBridge, RecordingPipeline::default())
}

fn versions(entries: &[(&str, &str)]) -> PackageVersions {
    entries
        .iter()
        .map(|(id, version)| (id.to_string(), version.to_string()))
        .collect()
}

fn identities(request: &nuget_vs_installer::InstallRequest) -> Vec<(String, Option<String>)> {
    request
        .identities
        .iter()
        .map(|identity| {
            (
                identity.id().to_string(),
                identity.version().map(ToString::to_string),
            )
        })
        .collect()
}

impl<B> Fixture<B> {
    fn assert_nothing_started(&self) {
        assert!(self.solution_manager.projects.lock().is_empty());
        assert!(self.pipeline.installs.lock().is_empty());
        assert!(self.telemetry.faults.lock().is_empty());
    }
}

#[test]
fn install_latest_package_uses_the_configured_sources() {
    let fixture = fixture();
    fixture
        .installer
        .install_latest_package(None, &TestProject::new("P"), "Foo", false, false)
        .unwrap();

    let install = fixture.pipeline.single();
    assert_eq!(install.project, "P");
    assert_eq!(identities(&install.request), vec![("Foo".to_string(), None)]);
    assert!(!install.request.include_prerelease);
    assert!(!install.request.ignore_dependencies);
    assert!(!install.request.project_context.skip_assembly_references());
    assert!(!install.request.project_context.binding_redirects_disabled());
    assert!(!install.cancellation_requested);

    // The request refers to the live configured sources.
    let SourceSet::Configured(provider) = &install.request.sources else {
        panic!("expected the configured sources");
    };
    let expected: Arc<dyn SourceRepositoryProvider> = fixture.sources.clone();
    assert!(Arc::ptr_eq(provider, &expected));
    assert!(fixture.telemetry.faults.lock().is_empty());
}

#[rstest]
#[case(true)]
#[case(false)]
fn install_latest_package_passes_prerelease_through(#[case] include_prerelease: bool) {
    let fixture = fixture();
    fixture
        .installer
        .install_latest_package(
            Some("All".into()),
            &TestProject::new("P"),
            "Foo",
            include_prerelease,
            true,
        )
        .unwrap();

    let install = fixture.pipeline.single();
    assert_eq!(install.request.include_prerelease, include_prerelease);
    assert!(install.request.ignore_dependencies);
    assert!(install.request.sources.is_configured());
}

#[test]
fn install_package_tolerates_unparsable_versions() {
    let fixture = fixture();
    fixture
        .installer
        .install_package_with_version_string(
            None,
            &TestProject::new("P"),
            "Foo",
            Some("not-a-version"),
            true,
        )
        .unwrap();

    let install = fixture.pipeline.single();
    assert_eq!(identities(&install.request), vec![("Foo".to_string(), None)]);
    assert!(!install.request.include_prerelease);
    assert!(install.request.ignore_dependencies);
}

#[rstest]
#[case(Some("1.2.3"), Some("1.2.3"))]
#[case(Some("1.0"), Some("1.0.0"))]
#[case(Some("2.0.0-beta.1"), Some("2.0.0-beta.1"))]
#[case(None, None)]
fn install_package_with_version_string(
    #[case] version: Option<&str>,
    #[case] expected: Option<&str>,
) {
    let fixture = fixture();
    fixture
        .installer
        .install_package_with_version_string(None, &TestProject::new("P"), "Foo", version, false)
        .unwrap();

    let install = fixture.pipeline.single();
    assert_eq!(
        identities(&install.request),
        vec![("Foo".to_string(), expected.map(ToString::to_string))]
    );
}

#[test]
fn install_package_with_a_structured_version_from_a_configured_source() {
    let fixture = fixture();
    let version = NuGetVersion::new(4, 0, 1);
    fixture
        .installer
        .install_package(
            Some("HTTPS://PKGS.CONTOSO.COM/nuget/v3/INDEX.JSON".into()),
            &TestProject::new("P"),
            "Foo",
            Some(&version),
            false,
        )
        .unwrap();

    let install = fixture.pipeline.single();
    assert_eq!(install.request.identities[0].version(), Some(&version));
    assert!(!install.request.include_prerelease);

    let repositories = install.request.sources.repositories();
    assert_eq!(repositories.len(), 1);
    assert!(Arc::ptr_eq(
        &repositories[0],
        &fixture.sources.repositories()[1]
    ));
}

#[rstest]
#[case("All")]
#[case("all")]
fn install_package_selects_all_configured_sources(#[case] source: &str) {
    let fixture = fixture();
    let version = NuGetVersion::new(1, 0, 0);
    fixture
        .installer
        .install_package(
            Some(source.into()),
            &TestProject::new("P"),
            "Foo",
            Some(&version),
            false,
        )
        .unwrap();
    fixture
        .installer
        .install_package_with_version_string(
            Some(source.into()),
            &TestProject::new("P"),
            "Foo",
            Some("1.0.0"),
            false,
        )
        .unwrap();

    let expected: Arc<dyn SourceRepositoryProvider> = fixture.sources.clone();
    let installs = fixture.pipeline.installs.lock();
    assert_eq!(installs.len(), 2);
    for install in installs.iter() {
        assert!(install.request.sources.is_configured());
        let SourceSet::Configured(provider) = &install.request.sources else {
            panic!("expected the configured sources");
        };
        assert!(Arc::ptr_eq(provider, &expected));
        assert_eq!(install.request.identities[0].version(), Some(&version));
    }
}

#[test]
fn explicit_sources_are_resolved_in_order() {
    let fixture = fixture();
    let spec = SourceSpec::Many(vec![
        "/srv/local".to_string(),
        "https://api.nuget.org/v3/index.json".to_string(),
        "/srv/local".to_string(),
    ]);
    fixture
        .installer
        .install_latest_package(Some(spec), &TestProject::new("P"), "Foo", false, false)
        .unwrap();

    let install = fixture.pipeline.single();
    let addresses = install
        .request
        .sources
        .repositories()
        .iter()
        .map(|repository| repository.package_source().source().to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        addresses,
        vec![
            "/srv/local",
            "https://api.nuget.org/v3/index.json",
            "/srv/local"
        ]
    );
}

#[rstest]
#[case("nuget.org")]
#[case("relative/folder")]
fn invalid_sources_fail_before_any_work(#[case] source: &str) {
    let fixture = fixture();
    let err = fixture
        .installer
        .install_latest_package(Some(source.into()), &TestProject::new("P"), "Foo", false, false)
        .unwrap_err();

    assert!(matches!(
        err,
        InstallerError::InvalidSource(SourceError::InvalidSource(ref invalid)) if invalid == source
    ));
    fixture.assert_nothing_started();
}

#[rstest]
#[case("")]
#[case(" ")]
fn empty_package_ids_are_rejected(#[case] package_id: &str) {
    let fixture = fixture();
    let err = fixture
        .installer
        .install_latest_package(None, &TestProject::new("P"), package_id, false, false)
        .unwrap_err();
    assert_eq!(err.parameter(), Some("packageId"));
    fixture.assert_nothing_started();
}

#[rstest]
#[case("Foo", None, false)]
#[case("Foo", Some("1.0.0"), true)]
#[case("", Some("bogus"), false)]
fn install_from_a_legacy_repository_is_unsupported(
    #[case] package_id: &str,
    #[case] version: Option<&str>,
    #[case] ignore_dependencies: bool,
) {
    let fixture = fixture();
    let err = fixture
        .installer
        .install_package_from_repository(
            &LegacyRepository,
            &TestProject::new("P"),
            package_id,
            version,
            ignore_dependencies,
        )
        .unwrap_err();
    assert!(matches!(err, InstallerError::Unsupported));
    fixture.assert_nothing_started();
}

#[test]
fn registry_install_on_a_build_integrated_project() {
    let directory = tempfile::tempdir().unwrap();
    fs_err::write(directory.path().join("project.json"), "{}").unwrap();
    let project = TestProject::in_directory("P", directory.path());

    let fixture = fixture();
    fixture
        .installer
        .install_packages_from_registry_repository_ignoring_dependencies(
            "K",
            true,
            true,
            Some(&project),
            Some(&versions(&[("A", "1.0.0"), ("B", "bogus")])),
        )
        .unwrap();

    let install = fixture.pipeline.single();
    assert_eq!(
        identities(&install.request),
        vec![
            ("A".to_string(), Some("1.0.0".to_string())),
            ("B".to_string(), None)
        ]
    );
    assert!(install.request.project_context.skip_assembly_references());
    assert!(install.request.project_context.binding_redirects_disabled());
    assert!(install.request.ignore_dependencies);
    assert!(!install.request.include_prerelease);

    // Pre-unzipped is ignored for build-integrated projects.
    let repositories = install.request.sources.repositories();
    assert_eq!(repositories.len(), 1);
    assert_eq!(repositories[0].package_source().source(), "/opt/sdk/packages");
    assert_eq!(repositories[0].feed_type(), FeedType::FileSystemV2);

    // The solution manager saw the same context.
    let projects = fixture.solution_manager.projects.lock();
    assert_eq!(projects.len(), 1);
    assert!(projects[0].1.skip_assembly_references());
}

#[rstest]
#[case(true, FeedType::FileSystemUnzipped)]
#[case(false, FeedType::FileSystemV2)]
fn registry_install_keeps_pre_unzipped_for_other_projects(
    #[case] is_pre_unzipped: bool,
    #[case] expected: FeedType,
) {
    let directory = tempfile::tempdir().unwrap();
    fs_err::write(directory.path().join("packages.config"), "<packages />").unwrap();
    let project = TestProject::in_directory("P", directory.path());

    let fixture = fixture();
    fixture
        .installer
        .install_packages_from_registry_repository(
            "k",
            is_pre_unzipped,
            false,
            false,
            Some(&project),
            Some(&versions(&[("A", "1.0.0")])),
        )
        .unwrap();

    let install = fixture.pipeline.single();
    assert_eq!(install.request.sources.repositories()[0].feed_type(), expected);
    assert!(!install.request.ignore_dependencies);
    assert!(!install.request.project_context.skip_assembly_references());
    assert!(!install.request.project_context.binding_redirects_disabled());
}

#[test]
fn extension_install_uses_the_bundled_packages() {
    let fixture = fixture();
    fixture
        .installer
        .install_packages_from_vs_extension_repository_ignoring_dependencies(
            "Contoso.Templates",
            false,
            false,
            Some(&TestProject::new("P")),
            Some(&versions(&[("Contoso.Web", "3.1.0")])),
        )
        .unwrap();

    let install = fixture.pipeline.single();
    let repositories = install.request.sources.repositories();
    assert_eq!(
        repositories[0].package_source().source(),
        "/opt/extensions/contoso/Packages"
    );
    assert!(install.request.ignore_dependencies);
}

#[rstest]
#[case(true)]
#[case(false)]
fn extension_install_ignores_pre_unzipped(#[case] is_pre_unzipped: bool) {
    let fixture = fixture();
    fixture
        .installer
        .install_packages_from_vs_extension_repository_ignoring_dependencies(
            "Contoso.Templates",
            is_pre_unzipped,
            false,
            Some(&TestProject::new("P")),
            Some(&versions(&[("A", "1.0.0")])),
        )
        .unwrap();

    let install = fixture.pipeline.single();
    let repositories = install.request.sources.repositories();
    assert_eq!(repositories.len(), 1);
    assert_eq!(repositories[0].feed_type(), FeedType::FileSystemV2);
}

#[rstest]
#[case(None)]
#[case(Some(PackageVersions::new()))]
fn side_channel_installs_require_packages(#[case] package_versions: Option<PackageVersions>) {
    let fixture = fixture();
    let project = TestProject::new("P");

    let err = fixture
        .installer
        .install_packages_from_registry_repository(
            "K",
            false,
            false,
            true,
            Some(&project),
            package_versions.as_ref(),
        )
        .unwrap_err();
    assert_eq!(err.parameter(), Some("packageVersions"));

    let err = fixture
        .installer
        .install_packages_from_vs_extension_repository(
            "Contoso.Templates",
            false,
            false,
            true,
            Some(&project),
            package_versions.as_ref(),
        )
        .unwrap_err();
    assert_eq!(err.parameter(), Some("packageVersions"));

    fixture.assert_nothing_started();
}

#[test]
fn side_channel_installs_require_a_name_and_a_project() {
    let fixture = fixture();
    let packages = versions(&[("A", "1.0.0")]);

    let err = fixture
        .installer
        .install_packages_from_registry_repository_ignoring_dependencies(
            "",
            false,
            false,
            Some(&TestProject::new("P")),
            Some(&packages),
        )
        .unwrap_err();
    assert_eq!(err.parameter(), Some("keyName"));

    let err = fixture
        .installer
        .install_packages_from_vs_extension_repository_ignoring_dependencies(
            "",
            false,
            false,
            Some(&TestProject::new("P")),
            Some(&packages),
        )
        .unwrap_err();
    assert_eq!(err.parameter(), Some("extensionId"));

    let err = fixture
        .installer
        .install_packages_from_registry_repository_ignoring_dependencies(
            "K",
            false,
            false,
            None,
            Some(&packages),
        )
        .unwrap_err();
    assert_eq!(err.parameter(), Some("project"));

    fixture.assert_nothing_started();
}

#[test]
fn unknown_side_channels_are_reported() {
    let fixture = fixture();
    let err = fixture
        .installer
        .install_packages_from_registry_repository_ignoring_dependencies(
            "Missing",
            false,
            false,
            Some(&TestProject::new("P")),
            Some(&versions(&[("A", "1.0.0")])),
        )
        .unwrap_err();

    assert!(matches!(
        err,
        InstallerError::PreinstalledRepository(SourceError::RegistryKeyNotFound(_))
    ));
    assert_eq!(fixture.telemetry.faults.lock().len(), 1);
    assert!(fixture.pipeline.installs.lock().is_empty());
}

#[test]
fn pipeline_failures_are_reported_once_and_returned_unchanged() {
    let fixture = fixture_with(BlockOnBridge, RecordingPipeline::failing());
    let err = fixture
        .installer
        .install_latest_package(None, &TestProject::new("P"), "Foo", false, false)
        .unwrap_err();

    let InstallerError::Pipeline(pipeline_error) = &err else {
        panic!("expected a pipeline error, got {err:?}");
    };
    assert_eq!(
        pipeline_error.downcast_ref::<UnresolvableError>(),
        Some(&UnresolvableError {
            package: "Foo".to_string()
        })
    );
    assert_eq!(err.to_string(), "unable to resolve dependencies of 'Foo'");
    assert_eq!(
        *fixture.telemetry.faults.lock(),
        vec![(
            INSTALLER_COMPONENT.to_string(),
            "unable to resolve dependencies of 'Foo'".to_string()
        )]
    );
}

#[test]
fn faults_are_logged_by_the_default_telemetry() {
    let (logs, _guard) = logging::capture_logs(LevelFilter::ERROR);
    let solution_manager: Arc<dyn SolutionManager> = Arc::new(RecordingSolutionManager::default());
    let installer = VsPackageInstaller::builder(
        BlockOnBridge,
        solution_manager,
        Arc::new(RecordingPipeline::failing()),
    )
    .with_config(config())
    .with_telemetry(Arc::new(TracingTelemetryProvider))
    .finish();

    installer
        .install_latest_package(None, &TestProject::new("P"), "Foo", false, false)
        .unwrap_err();

    let output = logs.output();
    assert!(output.contains("unable to resolve dependencies of 'Foo'"), "{output}");
    assert!(output.contains(INSTALLER_COMPONENT), "{output}");
    assert!(output.contains("pipeline::unresolvable"), "{output}");
}

#[test]
fn installs_through_the_pumping_bridge() {
    let apartment = Apartment::current();
    let fixture = fixture_with(apartment.bridge(), RecordingPipeline::default());
    fixture
        .installer
        .install_latest_package(None, &TestProject::new("P"), "Foo", false, false)
        .unwrap();
    assert_eq!(fixture.pipeline.installs.lock().len(), 1);
}

#[test]
fn calls_from_other_threads_are_rejected() {
    let apartment = Apartment::current();
    let bridge = apartment.bridge();

    let err = thread::spawn(move || {
        let fixture = fixture_with(bridge, RecordingPipeline::default());
        let err = fixture
            .installer
            .install_latest_package(None, &TestProject::new("P"), "Foo", false, false)
            .unwrap_err();
        assert!(fixture.solution_manager.projects.lock().is_empty());
        err.to_string()
    })
    .join()
    .unwrap();

    assert_eq!(
        err,
        BridgeError::NotOnApartmentThread(apartment.thread_name().to_string()).to_string()
    );
}

mod apartment_hopping {
    //! An install pipeline that continues on a thread pool and has to come
    //! back to the apartment thread while the apartment is blocked.

    use std::thread::ThreadId;

    use nuget_vs_installer::{InstallPipeline, InstallRequest, NuGetProject};
    use parking_lot::Mutex;
    use tokio_util::sync::CancellationToken;

    use super::*;

    struct HoppingPipeline {
        apartment: Apartment,
        runtime: tokio::runtime::Handle,
        observed: Mutex<Vec<ThreadId>>,
    }

    #[async_trait::async_trait(?Send)]
    impl InstallPipeline for HoppingPipeline {
        async fn install(
            &self,
            _project: Arc<dyn NuGetProject>,
            request: InstallRequest,
            _cancellation_token: CancellationToken,
        ) -> miette::Result<()> {
            assert_eq!(request.identities.len(), 1);
            let apartment = self.apartment.clone();
            let (pool_thread, apartment_thread) = self
                .runtime
                .spawn(async move {
                    let pool_thread = thread::current().id();
                    let apartment_thread = apartment.run(|| thread::current().id()).await?;
                    Ok::<_, BridgeError>((pool_thread, apartment_thread))
                })
                .await
                .map_err(|err| miette::miette!("the install task failed: {err}"))??;
            self.observed.lock().extend([pool_thread, apartment_thread]);
            Ok(())
        }
    }

    #[test]
    fn pool_continuations_resume_on_the_blocked_apartment() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let apartment = Apartment::current();
        let pipeline = Arc::new(HoppingPipeline {
            apartment: apartment.clone(),
            runtime: runtime.handle().clone(),
            observed: Mutex::default(),
        });

        let solution_manager: Arc<dyn SolutionManager> =
            Arc::new(RecordingSolutionManager::default());
        let installer =
            VsPackageInstaller::builder(apartment.bridge(), solution_manager, pipeline.clone())
                .with_config(config())
                .finish();

        installer
            .install_latest_package(None, &TestProject::new("P"), "Foo", false, false)
            .unwrap();

        let observed = pipeline.observed.lock();
        assert_eq!(observed.len(), 2);
        assert_ne!(observed[0], apartment.thread_id());
        assert_eq!(observed[1], apartment.thread_id());
    }
}
