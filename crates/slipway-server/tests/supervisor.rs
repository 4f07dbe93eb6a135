//! Supervisor behavior driven end to end: a seeded bare upstream, a cloned
//! worktree, and real ticks. There is no container daemon in the test
//! environment, so the artifact half of the pipeline fails; the git half
//! must still land, and the reconciliation task must survive the failure
//! and keep ticking until shutdown.

use git2::{Commit, Oid, Repository, Signature};
use slipway_builder::{
    ClientTemplater, Compose, ComposeCli, GoClientConfig, ImageBuilder, RegistryAuth,
    TypescriptClientConfig,
};
use slipway_core::gitops::{self, CommitAuthor, SshKey};
use slipway_core::intake::admission_channel;
use slipway_core::service::{NpmServiceConfig, ServiceConfiguration, ServiceRecord};
use slipway_server::pipeline::ReleaseContext;
use slipway_server::supervisor::{shutdown_channel, Supervisor};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn init_bare(path: &Path) -> Repository {
    let repo = Repository::init_bare(path).unwrap();
    repo.set_head("refs/heads/main").unwrap();
    repo
}

fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> Oid {
    let head = repo
        .find_reference("refs/heads/main")
        .ok()
        .and_then(|r| r.target());
    let base_tree = head.map(|oid| repo.find_commit(oid).unwrap().tree().unwrap());
    let mut builder = repo.treebuilder(base_tree.as_ref()).unwrap();
    let blob = repo.blob(content.as_bytes()).unwrap();
    builder.insert(name, blob, 0o100644).unwrap();
    let tree = repo.find_tree(builder.write().unwrap()).unwrap();

    let sig = Signature::now("dev", "dev@forge.local").unwrap();
    let parents: Vec<Commit> = head
        .map(|oid| repo.find_commit(oid).unwrap())
        .into_iter()
        .collect();
    let parent_refs: Vec<&Commit> = parents.iter().collect();
    repo.commit(Some("refs/heads/main"), &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

fn release_context() -> Arc<ReleaseContext> {
    let docker = ImageBuilder::connect().unwrap();
    let builder = Arc::new(ImageBuilder::new(
        docker,
        "registry.local/team".to_string(),
        RegistryAuth {
            username: "ci".into(),
            token: "pat".into(),
            server: "registry.local".into(),
        },
        "/usr/bin/docker".into(),
    ));
    Arc::new(ReleaseContext {
        remote_name: "origin".into(),
        ssh_key: SshKey::unused(),
        author: CommitAuthor {
            name: "ci-bot".into(),
            email: "ci@forge.local".into(),
        },
        builder: Arc::clone(&builder),
        compose: Arc::new(Compose::new(ComposeCli::V2)),
        templater: Arc::new(ClientTemplater::new(
            builder,
            TypescriptClientConfig {
                npm_scope: "acme".into(),
                registry_url: "https://npm.forge.local".into(),
                npmrc_path: "/nonexistent/npmrc".into(),
            },
            GoClientConfig {
                module_base: "forge.local/clients".into(),
                registry_url: "https://forge.local".into(),
                token: "token".into(),
            },
        )),
    })
}

#[tokio::test]
async fn ticks_drive_the_git_half_of_the_pipeline() {
    let upstream_dir = TempDir::new().unwrap();
    let upstream = init_bare(upstream_dir.path());
    let base = commit_file(
        &upstream,
        "package.json",
        "{\n  \"version\": \"1.2.3\"\n}\n",
        "chore: init",
    );
    let sig = Signature::now("dev", "dev@forge.local").unwrap();
    let object = upstream.find_object(base, None).unwrap();
    upstream
        .tag("1.2.3", &object, &sig, "Release 1.2.3", false)
        .unwrap();
    commit_file(&upstream, "fix.txt", "y", "fix: y");

    let work_dir = TempDir::new().unwrap();
    let url = format!("file://{}", upstream_dir.path().display());
    gitops::clone(&url, "main", work_dir.path(), "origin", &SshKey::unused()).unwrap();

    let record = ServiceRecord {
        id: ulid::Ulid::new().to_string(),
        name: "billing-api".into(),
        git_ssh_url: url,
        branch_name: "main".into(),
        configuration: ServiceConfiguration::NpmService(NpmServiceConfig {
            env_path: ".env".into(),
            containerfile_path: "Dockerfile".into(),
            compose_path: ".".into(),
            env_vars: Default::default(),
        }),
        worktree_path: work_dir.path().to_path_buf(),
    };

    let (admission_tx, admission_rx) = admission_channel();
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let supervisor = Supervisor::new(release_context(), Duration::from_millis(100), shutdown_rx);
    let handle = tokio::spawn(supervisor.run(admission_rx));

    admission_tx.send(Arc::new(record)).await.unwrap();

    // Within a few ticks the release tag must reach the upstream, even
    // though the image build that follows cannot succeed here.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        if upstream.find_reference("refs/tags/1.2.4").is_ok() {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "tag 1.2.4 never reached the upstream"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let pushed_head = upstream
        .find_reference("refs/heads/main")
        .unwrap()
        .peel_to_commit()
        .unwrap();
    assert_eq!(pushed_head.summary(), Some("ci: Release version 1.2.4"));

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("supervisor must stop on shutdown")
        .unwrap();
}

#[tokio::test]
async fn shutdown_stops_the_admission_loop() {
    let (_admission_tx, admission_rx) = admission_channel();
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let supervisor = Supervisor::new(release_context(), Duration::from_secs(3600), shutdown_rx);
    let handle = tokio::spawn(supervisor.run(admission_rx));

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("supervisor must observe shutdown")
        .unwrap();
}

#[tokio::test]
async fn closed_admission_channel_stops_the_supervisor() {
    let (admission_tx, admission_rx) = admission_channel();
    let (_shutdown_tx, shutdown_rx) = shutdown_channel();
    let supervisor = Supervisor::new(release_context(), Duration::from_secs(3600), shutdown_rx);
    let handle = tokio::spawn(supervisor.run(admission_rx));

    drop(admission_tx);
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("supervisor must stop when intake goes away")
        .unwrap();
}
