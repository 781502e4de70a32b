//! End-to-end coverage of the update orchestrator's terminal states.
//!
//! Every test runs against the local fixture server; the install target
//! is a scratch file standing in for the running executable.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use reviewtask::update::{SelfUpdater, UpdateRequest};
use reviewtask::utils::platform::Platform;
use tempfile::TempDir;

use crate::fixture::{FixtureServer, release_json, sha256_hex, tar_gz};

const OLD_BINARY: &[u8] = b"old reviewtask binary v1.0.0";
const NEW_BINARY: &[u8] = b"new reviewtask binary v1.2.0 with more bytes";

fn install_target(dir: &TempDir) -> PathBuf {
    let target = dir.path().join(Platform::current().binary_name("reviewtask"));
    std::fs::write(&target, OLD_BINARY).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    target
}

fn backup_file(dir: &TempDir) -> PathBuf {
    dir.path().join(format!("{}.backup", Platform::current().binary_name("reviewtask")))
}

/// The archive a release of `version` would ship for this platform.
fn release_archive() -> Vec<u8> {
    let binary_name = Platform::current().binary_name("reviewtask");
    tar_gz(&[(binary_name.as_str(), NEW_BINARY)])
}

fn asset_path(version: &str) -> String {
    format!(
        "/biwakonbu/reviewtask/releases/download/v{version}/reviewtask-v{version}-{}.tar.gz",
        Platform::current()
    )
}

fn checksums_path(version: &str) -> String {
    format!("/biwakonbu/reviewtask/releases/download/v{version}/checksums.txt")
}

fn feed_route(version: &str) -> (String, (u16, Vec<u8>)) {
    (
        "/repos/biwakonbu/reviewtask/releases/latest".to_string(),
        (200, release_json(&format!("v{version}"))),
    )
}

fn valid_checksums(version: &str, archive: &[u8]) -> Vec<u8> {
    format!(
        "{}  reviewtask-v{version}-{}.tar.gz\n",
        sha256_hex(archive),
        Platform::current()
    )
    .into_bytes()
}

fn updater_for(server: &FixtureServer, target: PathBuf) -> SelfUpdater {
    SelfUpdater::new()
        .with_current_version("1.0.0")
        .with_api_base(server.url())
        .with_releases_base(server.url())
        .with_install_path(target)
}

fn request() -> UpdateRequest {
    UpdateRequest {
        timeout: Duration::from_secs(10),
        ..UpdateRequest::default()
    }
}

#[tokio::test]
async fn update_to_latest_reaches_done() {
    let archive = release_archive();
    let mut routes = HashMap::new();
    let (feed, response) = feed_route("1.2.0");
    routes.insert(feed, response);
    routes.insert(asset_path("1.2.0"), (200, archive.clone()));
    routes.insert(checksums_path("1.2.0"), (200, valid_checksums("1.2.0", &archive)));

    let server = FixtureServer::start(routes);
    let dir = TempDir::new().unwrap();
    let target = install_target(&dir);
    let updater = updater_for(&server, target.clone());

    let outcome = updater.run(&request()).await.unwrap();

    assert!(outcome.succeeded, "outcome: {outcome:?}");
    assert_eq!(outcome.previous_version, "1.0.0");
    assert_eq!(outcome.new_version, "1.2.0");
    assert!(outcome.updated());
    assert!(outcome.error_detail.is_none());

    assert_eq!(std::fs::read(&target).unwrap(), NEW_BINARY);
    // Backup is removed after a successful install by default.
    assert!(!backup_file(&dir).exists());
}

#[tokio::test]
async fn up_to_date_fetches_no_artifact() {
    // Only the feed route exists; touching the artifact URL would 404
    // and fail the run, so success proves nothing was downloaded.
    let mut routes = HashMap::new();
    let (feed, response) = feed_route("1.0.0");
    routes.insert(feed, response);

    let server = FixtureServer::start(routes);
    let dir = TempDir::new().unwrap();
    let target = install_target(&dir);
    let updater = updater_for(&server, target.clone());

    let outcome = updater.run(&request()).await.unwrap();

    assert!(outcome.succeeded);
    assert!(!outcome.updated());
    assert_eq!(std::fs::read(&target).unwrap(), OLD_BINARY);
}

#[tokio::test]
async fn checksum_mismatch_leaves_target_untouched() {
    let archive = release_archive();
    let bogus = format!(
        "{}  reviewtask-v1.2.0-{}.tar.gz\n",
        "0".repeat(64),
        Platform::current()
    );

    let mut routes = HashMap::new();
    let (feed, response) = feed_route("1.2.0");
    routes.insert(feed, response);
    routes.insert(asset_path("1.2.0"), (200, archive));
    routes.insert(checksums_path("1.2.0"), (200, bogus.into_bytes()));

    let server = FixtureServer::start(routes);
    let dir = TempDir::new().unwrap();
    let target = install_target(&dir);
    let updater = updater_for(&server, target.clone());

    let outcome = updater.run(&request()).await.unwrap();

    assert!(!outcome.succeeded);
    let detail = outcome.error_detail.unwrap();
    assert!(detail.contains("checksum mismatch"), "detail: {detail}");

    // Verification fails before any filesystem mutation.
    assert_eq!(std::fs::read(&target).unwrap(), OLD_BINARY);
    assert!(!backup_file(&dir).exists());
    assert!(outcome.backup_path.is_none());
}

#[tokio::test]
async fn missing_manifest_entry_aborts() {
    let archive = release_archive();
    let unrelated = format!("{}  some-other-project.tar.gz\n", sha256_hex(&archive));

    let mut routes = HashMap::new();
    let (feed, response) = feed_route("1.2.0");
    routes.insert(feed, response);
    routes.insert(asset_path("1.2.0"), (200, archive));
    routes.insert(checksums_path("1.2.0"), (200, unrelated.into_bytes()));

    let server = FixtureServer::start(routes);
    let dir = TempDir::new().unwrap();
    let target = install_target(&dir);
    let updater = updater_for(&server, target.clone());

    let outcome = updater.run(&request()).await.unwrap();

    assert!(!outcome.succeeded);
    let detail = outcome.error_detail.unwrap();
    assert!(detail.contains("no checksum entry"), "detail: {detail}");
    assert_eq!(std::fs::read(&target).unwrap(), OLD_BINARY);
}

#[tokio::test]
async fn unpublished_artifact_is_an_actionable_error() {
    // Feed advertises a version whose artifact was never uploaded.
    let mut routes = HashMap::new();
    let (feed, response) = feed_route("1.2.0");
    routes.insert(feed, response);
    routes.insert(checksums_path("1.2.0"), (200, b"deadbeef  something\n".to_vec()));

    let server = FixtureServer::start(routes);
    let dir = TempDir::new().unwrap();
    let target = install_target(&dir);
    let updater = updater_for(&server, target.clone());

    let outcome = updater.run(&request()).await.unwrap();

    assert!(!outcome.succeeded);
    let detail = outcome.error_detail.unwrap();
    assert!(detail.contains("no release artifact"), "detail: {detail}");
    assert_eq!(std::fs::read(&target).unwrap(), OLD_BINARY);
}

#[tokio::test]
async fn disabled_verification_skips_the_manifest() {
    // No checksums.txt route at all; the run must not ask for it.
    let archive = release_archive();
    let mut routes = HashMap::new();
    let (feed, response) = feed_route("1.2.0");
    routes.insert(feed, response);
    routes.insert(asset_path("1.2.0"), (200, archive));

    let server = FixtureServer::start(routes);
    let dir = TempDir::new().unwrap();
    let target = install_target(&dir);
    let updater = updater_for(&server, target.clone());

    let outcome = updater
        .run(&UpdateRequest {
            verify_checksum: false,
            ..request()
        })
        .await
        .unwrap();

    assert!(outcome.succeeded, "outcome: {outcome:?}");
    assert_eq!(std::fs::read(&target).unwrap(), NEW_BINARY);
}

#[tokio::test]
async fn kept_backup_supports_rollback() {
    let archive = release_archive();
    let mut routes = HashMap::new();
    let (feed, response) = feed_route("1.2.0");
    routes.insert(feed, response);
    routes.insert(asset_path("1.2.0"), (200, archive.clone()));
    routes.insert(checksums_path("1.2.0"), (200, valid_checksums("1.2.0", &archive)));

    let server = FixtureServer::start(routes);
    let dir = TempDir::new().unwrap();
    let target = install_target(&dir);
    let updater = updater_for(&server, target.clone());

    let outcome = updater
        .run(&UpdateRequest {
            keep_backup: true,
            ..request()
        })
        .await
        .unwrap();

    assert!(outcome.succeeded);
    let backup = outcome.backup_path.expect("backup path");
    assert_eq!(std::fs::read(&backup).unwrap(), OLD_BINARY);
    assert_eq!(std::fs::read(&target).unwrap(), NEW_BINARY);

    // Explicit rollback restores the previous binary byte-for-byte.
    updater.rollback().await.unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), OLD_BINARY);
}

#[cfg(unix)]
#[tokio::test]
async fn failed_validation_restores_previous_binary() {
    use reviewtask::update::swap::BinarySwapper;
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let target = install_target(&dir);
    let swapper = BinarySwapper::new(target.clone()).unwrap();

    swapper.backup().await.unwrap();

    // Simulate an install that lost the executable bits.
    std::fs::write(&target, b"broken install").unwrap();
    std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o644)).unwrap();
    assert!(swapper.validate().is_err());

    swapper.restore().await.unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), OLD_BINARY);
    assert!(swapper.validate().is_ok());
}

#[tokio::test]
async fn check_for_update_reports_newer_versions_only() {
    let mut routes = HashMap::new();
    let (feed, response) = feed_route("1.2.0");
    routes.insert(feed, response);
    let server = FixtureServer::start(routes);

    let newer = SelfUpdater::new()
        .with_current_version("1.0.0")
        .with_api_base(server.url())
        .check_for_update(Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(newer.map(|r| r.tag), Some("v1.2.0".to_string()));

    let current = SelfUpdater::new()
        .with_current_version("1.2.0")
        .with_api_base(server.url())
        .check_for_update(Duration::from_secs(10))
        .await
        .unwrap();
    assert!(current.is_none());

    let dev = SelfUpdater::new()
        .with_current_version("dev")
        .with_api_base(server.url())
        .check_for_update(Duration::from_secs(10))
        .await
        .unwrap();
    assert!(dev.is_none());
}
