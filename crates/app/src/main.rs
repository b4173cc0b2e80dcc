use anyhow::Context;
use app::config::{Cli, Command, SeedArgs, ServeArgs, normalize_sqlite_url, prepare_sqlite_file};
use app::{AppState, build_router, seed};
use clap::Parser;
use services::{AppServices, Clock, DEFAULT_ASSIGN_BATCH};
use tokio::signal;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_LOG_FILTER: &str =
    "rating_server=info,app=info,services=info,storage=info,tower_http=info";

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Open (creating if needed) and migrate the SQLite database.
async fn open_services(raw_db: &str, assign_batch: usize) -> anyhow::Result<AppServices> {
    let db_url = normalize_sqlite_url(raw_db);
    prepare_sqlite_file(&db_url)?;
    let services = AppServices::new_sqlite(&db_url, Clock::system(), assign_batch)
        .await
        .with_context(|| format!("failed to open database {db_url}"))?;
    info!(%db_url, "database ready");
    Ok(services)
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let services = open_services(&args.db, args.assign_batch).await?;
    let app = build_router(AppState::new(services), &args.cors_origins);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!(addr = %args.bind, "rating-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("rating-server stopped");
    Ok(())
}

async fn seed_db(args: SeedArgs) -> anyhow::Result<()> {
    let services = open_services(&args.db, DEFAULT_ASSIGN_BATCH).await?;
    let report = seed::seed_catalog(&services, args.images, &args.image_dir)
        .await
        .context("seeding catalog")?;
    println!(
        "seeded {} images{}",
        report.images_added,
        if report.question_added {
            " and the default question"
        } else {
            ""
        }
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(%err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        () = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Seed(args) => seed_db(args).await,
    };
    if let Err(err) = result {
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}
