use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

pub const MEMORY_URL: &str = "sqlite::memory:";

#[derive(Parser, Debug)]
#[command(name = "rating-server")]
#[command(about = "Image quality rating backend")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Populate the image catalog and a default question
    Seed(SeedArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// SQLite database URL or path
    #[arg(long, env = "RATING_DB_URL", default_value = "sqlite://ratings.sqlite3")]
    pub db: String,

    /// Address to listen on
    #[arg(long, env = "RATING_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Allowed CORS origin (repeatable, or comma separated in the env var)
    #[arg(
        long = "cors-origin",
        env = "RATING_CORS_ORIGINS",
        value_delimiter = ',',
        default_values = ["http://localhost:5173", "http://127.0.0.1:5173"]
    )]
    pub cors_origins: Vec<String>,

    /// Images sampled when a session is assigned without an explicit list
    #[arg(long, env = "RATING_ASSIGN_BATCH", default_value_t = 10)]
    pub assign_batch: usize,
}

#[derive(Args, Debug)]
pub struct SeedArgs {
    #[arg(long, env = "RATING_DB_URL", default_value = "sqlite://ratings.sqlite3")]
    pub db: String,

    /// Number of images to insert, named `1.jpg..n.jpg`
    #[arg(long)]
    pub images: u32,

    /// Directory recorded as the images' file path prefix
    #[arg(long, default_value = "images")]
    pub image_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum DbUrlError {
    #[error("invalid database url: {raw}")]
    Invalid { raw: String },
    #[error("cannot create database file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Turn `sqlite:relative.db` or a bare path into an absolute `sqlite://` URL.
///
/// `sqlite::memory:` and URLs already in `sqlite://` form pass through.
#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == MEMORY_URL || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file and its parent directories if they are missing.
///
/// # Errors
///
/// Returns `DbUrlError` for a non-`sqlite://` URL or a filesystem failure.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), DbUrlError> {
    if db_url == MEMORY_URL {
        return Ok(());
    }

    let invalid = || DbUrlError::Invalid {
        raw: db_url.to_string(),
    };
    let path = db_url.strip_prefix("sqlite://").ok_or_else(invalid)?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(invalid());
    }

    let path = Path::new(path);
    let io_err = |source| DbUrlError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(io_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_and_full_urls_pass_through() {
        assert_eq!(normalize_sqlite_url(MEMORY_URL), MEMORY_URL);
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/x.sqlite3"),
            "sqlite:///tmp/x.sqlite3"
        );
    }

    #[test]
    fn relative_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/r.sqlite3");
        let path = url.strip_prefix("sqlite://").unwrap();
        assert!(Path::new(path).is_absolute());
        assert!(path.ends_with("data/r.sqlite3"));
    }

    #[test]
    fn prepare_creates_nested_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested").join("r.sqlite3");
        let url = format!("sqlite://{}?mode=rwc", file.display());
        prepare_sqlite_file(&url).unwrap();
        assert!(file.exists());
    }

    #[test]
    fn prepare_rejects_non_sqlite_urls() {
        assert!(matches!(
            prepare_sqlite_file("postgres://db"),
            Err(DbUrlError::Invalid { .. })
        ));
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["rating-server", "serve"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.bind.port(), 8000);
        assert_eq!(args.assign_batch, 10);
        assert_eq!(args.cors_origins.len(), 2);
    }

    #[test]
    fn seed_requires_image_count() {
        assert!(Cli::try_parse_from(["rating-server", "seed"]).is_err());
        let cli = Cli::try_parse_from(["rating-server", "seed", "--images", "3"]).unwrap();
        assert!(matches!(cli.command, Command::Seed(SeedArgs { images: 3, .. })));
    }
}
