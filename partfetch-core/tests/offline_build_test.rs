//! End-to-end tests for fetching parts and building offline
//!
//! These run the real catalog client against a mock catalog server, with a
//! project manifest on disk and the cache in a temporary directory.

mod common;

use anyhow::Result;
use partfetch_core::cache::ArtifactCache;
use partfetch_core::catalog::{CatalogClient, DependencyInstaller, ProjectDependencies};
use partfetch_core::config::ProjectConfig;
use partfetch_core::pipeline::ManifestPipeline;
use partfetch_core::resolver::FetchResolver;
use partfetch_core::workflow::{build_targets, fetch_missing_parts};
use partfetch_core::{FetchError, OfflineGate, PartId};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Fixture {
    _project_dir: TempDir,
    _cache_dir: TempDir,
    project: ProjectConfig,
    gate: OfflineGate,
    resolver: FetchResolver<CatalogClient>,
    installer: ProjectDependencies,
}

fn fixture(server: &MockServer, manifest: Option<&str>, offline: bool) -> Result<Fixture> {
    let project_dir = TempDir::new()?;
    match manifest {
        Some(content) => common::write_manifest(project_dir.path(), content)?,
        None => common::create_two_build_project(project_dir.path())?,
    }
    let project = ProjectConfig::load(project_dir.path())?;

    let cache_dir = TempDir::new()?;
    let gate = OfflineGate::new(offline);
    let resolver = FetchResolver::new(
        ArtifactCache::new(cache_dir.path()),
        CatalogClient::new(&server.uri(), gate.clone())?,
        gate.clone(),
    );
    let installer =
        ProjectDependencies::new(&project, CatalogClient::new(&server.uri(), gate.clone())?);

    Ok(Fixture {
        _project_dir: project_dir,
        _cache_dir: cache_dir,
        project,
        gate,
        resolver,
        installer,
    })
}

async fn mount_part(server: &MockServer, id: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/parts/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "footprint": "C0402",
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_missing_parts_while_offline() -> Result<()> {
    common::init_test_logging();
    let server = MockServer::start().await;
    mount_part(&server, "C1", 1).await;

    let fx = fixture(&server, None, true)?;
    let targets = fx.project.select_builds(None, &[])?;

    let report =
        fetch_missing_parts(&fx.installer, &targets, &ManifestPipeline, &fx.resolver).await?;

    assert!(fx.gate.read(), "offline mode must be restored");
    assert_eq!(report.attempted, 2);
    assert!(report.errors.is_empty());

    let cached = fx.resolver.cache().load(&PartId::new("C1")?)?;
    assert_eq!(cached.payload["footprint"], json!("C0402"));
    Ok(())
}

#[tokio::test]
async fn test_offline_build_after_fetch_uses_cache_only() -> Result<()> {
    common::init_test_logging();
    let server = MockServer::start().await;
    // One fetch in total: the offline build must not reach the catalog
    mount_part(&server, "C1", 1).await;

    let fx = fixture(&server, None, true)?;
    let targets = fx.project.select_builds(None, &[])?;

    fetch_missing_parts(&fx.installer, &targets, &ManifestPipeline, &fx.resolver)
        .await?
        .into_result()?;

    let report = build_targets(&targets, &ManifestPipeline, &fx.resolver).await;
    assert!(report.is_success());
    Ok(())
}

#[tokio::test]
async fn test_offline_build_without_fetch_names_missing_part() -> Result<()> {
    common::init_test_logging();
    let server = MockServer::start().await;
    mount_part(&server, "C1", 0).await;

    let fx = fixture(&server, None, true)?;
    let targets = fx.project.select_builds(None, &[])?;

    let report = build_targets(&targets, &ManifestPipeline, &fx.resolver).await;

    assert_eq!(report.errors.failed_targets(), vec!["a"]);
    let failure = &report.errors.failures()[0];
    assert!(matches!(
        failure.error.downcast_ref::<FetchError>(),
        Some(FetchError::MissingCachedArtifacts { part_ids }) if part_ids == &["C1"]
    ));

    let msg = report.into_result().unwrap_err().to_string();
    assert!(msg.contains("C1"));
    assert!(msg.contains("offline mode"));
    Ok(())
}

#[tokio::test]
async fn test_cached_parts_are_not_refetched() -> Result<()> {
    let server = MockServer::start().await;
    mount_part(&server, "C1", 0).await;

    let fx = fixture(&server, None, false)?;
    common::seed_cache(fx.resolver.cache(), "C1")?;
    let targets = fx.project.select_builds(None, &[])?;

    let report =
        fetch_missing_parts(&fx.installer, &targets, &ManifestPipeline, &fx.resolver).await?;

    assert!(report.is_success());
    assert!(!fx.gate.read());
    Ok(())
}

#[tokio::test]
async fn test_one_failing_build_does_not_stop_the_others() -> Result<()> {
    common::init_test_logging();
    let server = MockServer::start().await;
    mount_part(&server, "C1", 1).await;
    mount_part(&server, "C3", 1).await;
    Mock::given(method("GET"))
        .and(path("/v1/parts/C2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let manifest = r#"name: test-board
builds:
  first:
    parts: [C1]
  second:
    parts: [C2]
  third:
    parts: [C3]
"#;
    let fx = fixture(&server, Some(manifest), true)?;
    let targets = fx.project.select_builds(None, &[])?;

    let report =
        fetch_missing_parts(&fx.installer, &targets, &ManifestPipeline, &fx.resolver).await?;

    assert_eq!(report.attempted, 3);
    assert_eq!(report.errors.failed_targets(), vec!["second"]);
    assert!(fx.resolver.cache().has(&PartId::new("C1")?));
    assert!(fx.resolver.cache().has(&PartId::new("C3")?));
    assert!(fx.gate.read());
    Ok(())
}

#[tokio::test]
async fn test_dependencies_installed_while_offline() -> Result<()> {
    common::init_test_logging();
    let server = MockServer::start().await;
    mount_part(&server, "C1", 1).await;

    let archive = common::package_archive("generics")?;
    let digest = common::sha256_digest(&archive);
    Mock::given(method("GET"))
        .and(path("/v1/packages/generics/releases/1.2.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": format!("{}/files/generics-1.2.0.tar.gz", server.uri()),
            "digest": digest,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/generics-1.2.0.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .expect(1)
        .mount(&server)
        .await;

    let manifest = r#"name: test-board
builds:
  default:
    parts: [C1]
dependencies:
  - name: generics
    version: 1.2.0
"#;
    let fx = fixture(&server, Some(manifest), true)?;
    assert_eq!(fx.installer.not_installed_dependencies().len(), 1);
    let targets = fx.project.select_builds(None, &[])?;

    let report =
        fetch_missing_parts(&fx.installer, &targets, &ManifestPipeline, &fx.resolver).await?;

    assert!(report.is_success());
    assert!(fx.installer.not_installed_dependencies().is_empty());
    assert!(fx
        .project
        .state_dir()
        .join("modules/generics/resistors.ato")
        .is_file());
    assert!(fx.gate.read());
    Ok(())
}

#[tokio::test]
async fn test_failed_install_aborts_before_any_build() -> Result<()> {
    let server = MockServer::start().await;
    mount_part(&server, "C1", 0).await;
    Mock::given(method("GET"))
        .and(path("/v1/packages/generics/releases/1.2.0"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let manifest = r#"name: test-board
builds:
  default:
    parts: [C1]
dependencies:
  - name: generics
    version: 1.2.0
"#;
    let fx = fixture(&server, Some(manifest), true)?;
    let targets = fx.project.select_builds(None, &[])?;

    let err = fetch_missing_parts(&fx.installer, &targets, &ManifestPipeline, &fx.resolver)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::DependencyInstall { .. }));
    assert!(!fx.resolver.cache().has(&PartId::new("C1")?));
    assert!(fx.gate.read());
    Ok(())
}
