use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "smugsync")]
#[command(about = "Sync local media files to SmugMug albums with content-addressed deduplication")]
#[command(version)]
struct Cli {
    /// Directory holding the dedup database (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// API bearer token (falls back to the SMUGSYNC_TOKEN environment variable)
    #[arg(long, global = true, env = "SMUGSYNC_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all albums of the authenticated user
    Albums,

    /// Search the user's albums by name
    Search {
        /// Search terms, combined into one query
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Refresh the local dedup index from an album's remote image listing
    SyncAlbum {
        /// Album key, as shown by the albums command
        album_key: String,
    },

    /// Upload files into an album, skipping content the album already has
    Upload {
        /// Album key, as shown by the albums command
        album_key: String,

        /// Files or glob patterns to upload
        #[arg(required = true)]
        files: Vec<String>,

        /// Maximum concurrent uploads
        #[arg(long, default_value_t = 4)]
        parallel: usize,

        /// Retries per file after the first attempt fails
        #[arg(long, default_value_t = 2)]
        retries: u32,

        /// Upload even if identical content is already in the album
        #[arg(long)]
        allow_duplicates: bool,
    },

    /// Show recorded duplicates of a local file within an album
    Dupes {
        /// Album key, as shown by the albums command
        album_key: String,

        /// Local file to fingerprint
        file: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("smugsync={default_level},warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .context("no platform data directory; pass --data-dir")?
            .join("smugsync"),
    };

    let ctx = commands::AppContext::build(data_dir, cli.token).await?;

    match cli.command {
        Commands::Albums => commands::list_albums(&ctx).await,
        Commands::Search { terms } => commands::search_albums(&ctx, &terms).await,
        Commands::SyncAlbum { album_key } => commands::sync_album(&ctx, &album_key).await,
        Commands::Upload {
            album_key,
            files,
            parallel,
            retries,
            allow_duplicates,
        } => {
            commands::upload(
                &ctx,
                &album_key,
                files,
                parallel,
                retries,
                allow_duplicates,
            )
            .await
        }
        Commands::Dupes { album_key, file } => commands::dupes(&ctx, &album_key, &file).await,
    }
}
