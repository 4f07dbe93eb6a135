use clap::{Parser, Subcommand};
use slipway_builder::{
    ClientTemplater, Compose, ComposeCli, GoClientConfig, ImageBuilder, RegistryAuth,
    TypescriptClientConfig,
};
use slipway_core::catalog::Catalog;
use slipway_core::gitops::{CommitAuthor, SshKey};
use slipway_core::intake::{admission_channel, Intake};
use slipway_core::settings::{ComposeCliVersion, Settings};
use slipway_server::pipeline::ReleaseContext;
use slipway_server::state::AppState;
use slipway_server::supervisor::{shutdown_channel, Supervisor};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::MakeWriterExt;

#[derive(Parser)]
#[command(
    name = "slipway",
    about = "Reconciling release controller: versions, tags, builds, and deploys git-backed services",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller: control plane plus reconciliation supervisor
    Serve,
}

fn main() {
    // A missing .env file is fine; the environment may be pre-populated.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Serve => serve(),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn serve() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    init_tracing(&settings)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(settings))
}

fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let default_level = if settings.dev_mode {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let filter =
        tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into());

    match (&settings.logging_dir, settings.dev_mode) {
        (Some(dir), false) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(dir.join("combined.log"))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::io::stdout.and(Arc::new(file)))
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();
        }
    }
    Ok(())
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    let ssh_key = SshKey::load(&settings.ssh_key_path)?;
    let catalog = Arc::new(Catalog::open(
        &settings.catalog_root,
        &settings.git_remote,
        ssh_key.clone(),
    )?);

    let docker = ImageBuilder::connect()?;
    let builder = Arc::new(ImageBuilder::new(
        docker,
        settings.artifact_prefix.clone(),
        RegistryAuth {
            username: settings.registry_username.clone(),
            token: settings.registry_token.clone(),
            server: settings.registry_server.clone(),
        },
        settings.container_cli.clone(),
    ));

    let compose = Arc::new(Compose::new(match settings.compose_cli {
        ComposeCliVersion::V1 => ComposeCli::V1,
        ComposeCliVersion::V2 => ComposeCli::V2,
    }));

    let templater = Arc::new(ClientTemplater::new(
        Arc::clone(&builder),
        TypescriptClientConfig {
            npm_scope: settings.npm_scope.clone(),
            registry_url: settings.npm_registry_url.clone(),
            npmrc_path: settings.npmrc_path.clone(),
        },
        GoClientConfig {
            module_base: settings.go_module_base.clone(),
            registry_url: settings.go_registry_url.clone(),
            token: settings.go_registry_token.clone(),
        },
    ));

    let ctx = Arc::new(ReleaseContext {
        remote_name: settings.git_remote.clone(),
        ssh_key,
        author: CommitAuthor {
            name: settings.ci_author_name.clone(),
            email: settings.ci_author_email.clone(),
        },
        builder,
        compose,
        templater,
    });

    let (admission_tx, admission_rx) = admission_channel();
    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    let supervisor = Supervisor::new(ctx, settings.processing_interval, shutdown_rx.clone());
    let supervisor_task = tokio::spawn(supervisor.run(admission_rx));

    Supervisor::enqueue_existing(Arc::clone(&catalog), &admission_tx).await?;

    let intake = Arc::new(Intake::new(catalog, admission_tx));
    let state = AppState::new(intake, &settings.api_key);

    let server_task = tokio::spawn(slipway_server::serve(
        state,
        settings.port,
        shutdown_rx,
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    let _ = supervisor_task.await;
    server_task.await??;
    Ok(())
}
