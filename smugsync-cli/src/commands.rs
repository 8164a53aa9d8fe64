//! Subcommand implementations.

use anyhow::{bail, Context};
use core_dedup::{fingerprint_file, AlbumKey, DedupStore, ImageEntry};
use core_sync::{list_all, UploadConfig, UploadPool, UploadStatus, DEFAULT_PAGE_SIZE};
use provider_smugmug::pages::{AlbumImageSource, AlbumSearchSource, AlbumSource};
use provider_smugmug::upload::SmugMugUploader;
use provider_smugmug::user::{current_user_albums_uri, current_user_uri};
use remote_traits::http::HttpClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use transport_reqwest::ReqwestHttpClient;

const DB_FILE: &str = "images.db";

/// Shared handles built once from the global flags.
pub struct AppContext {
    transport: Arc<dyn HttpClient>,
    store: Arc<DedupStore>,
    token: Option<String>,
}

impl AppContext {
    pub async fn build(data_dir: PathBuf, token: Option<String>) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("cannot create data directory {}", data_dir.display()))?;
        let db_path = data_dir.join(DB_FILE);
        debug!(db = %db_path.display(), "opening dedup store");
        let store = DedupStore::open(&db_path)
            .await
            .with_context(|| format!("cannot open dedup database {}", db_path.display()))?;

        Ok(Self {
            transport: Arc::new(ReqwestHttpClient::new()),
            store: Arc::new(store),
            token,
        })
    }

    fn token(&self) -> anyhow::Result<&str> {
        self.token
            .as_deref()
            .context("no API token; pass --token or set SMUGSYNC_TOKEN")
    }
}

pub async fn list_albums(ctx: &AppContext) -> anyhow::Result<()> {
    let token = ctx.token()?;
    let albums_uri = current_user_albums_uri(ctx.transport.as_ref(), token).await?;
    let source = Arc::new(AlbumSource::new(
        Arc::clone(&ctx.transport),
        token,
        albums_uri,
    ));

    let albums = list_all(source, DEFAULT_PAGE_SIZE, CancellationToken::new(), |a| {
        a.name.clone()
    })
    .await?;

    for album in &albums {
        println!("{} :: {}", album.name, album.album_key);
    }
    info!(count = albums.len(), "albums listed");
    Ok(())
}

pub async fn search_albums(ctx: &AppContext, terms: &[String]) -> anyhow::Result<()> {
    let token = ctx.token()?;
    let user_uri = current_user_uri(ctx.transport.as_ref(), token).await?;
    let source = Arc::new(AlbumSearchSource::new(
        Arc::clone(&ctx.transport),
        token,
        user_uri,
        terms,
    ));

    let albums = list_all(source, DEFAULT_PAGE_SIZE, CancellationToken::new(), |a| {
        a.name.clone()
    })
    .await?;

    if albums.is_empty() {
        println!("no albums matched {:?}", terms.join(" "));
        return Ok(());
    }
    for album in &albums {
        println!("{} :: {}", album.name, album.album_key);
    }
    info!(count = albums.len(), "search results listed");
    Ok(())
}

pub async fn sync_album(ctx: &AppContext, album_key: &str) -> anyhow::Result<()> {
    let token = ctx.token()?;
    let source = Arc::new(AlbumImageSource::new(
        Arc::clone(&ctx.transport),
        token,
        album_key,
    ));

    let images = list_all(source, DEFAULT_PAGE_SIZE, CancellationToken::new(), |i| {
        i.file_name.clone()
    })
    .await?;

    let entries: Vec<ImageEntry> = images
        .into_iter()
        .map(|image| ImageEntry {
            digest_hex: image.archived_md5,
            filename: image.file_name,
        })
        .collect();

    let album = AlbumKey::new(album_key);
    ctx.store.replace_album(&album, &entries).await?;
    println!("synced {} image records for album {album}", entries.len());
    Ok(())
}

pub async fn upload(
    ctx: &AppContext,
    album_key: &str,
    patterns: Vec<String>,
    parallel: usize,
    retries: u32,
    allow_duplicates: bool,
) -> anyhow::Result<()> {
    let token = ctx.token()?;
    let files = expand_patterns(&patterns)?;
    if files.is_empty() {
        bail!("no files matched the given patterns");
    }

    let uploader = Arc::new(SmugMugUploader::new(Arc::clone(&ctx.transport), token));
    let pool = UploadPool::new(
        uploader,
        Arc::clone(&ctx.store),
        UploadConfig {
            concurrency: parallel,
            attempts: retries + 1,
            skip_duplicates: !allow_duplicates,
        },
    )?;

    // Ctrl-C stops files that have not begun transmitting; in-flight
    // transfers run to completion.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; draining in-flight uploads");
            signal_cancel.cancel();
        }
    });

    let album = AlbumKey::new(album_key);
    let total = files.len();
    let outcomes = pool.upload_batch(&album, files, cancel).await;

    let mut failed = 0usize;
    for outcome in &outcomes {
        let path = outcome.path.display();
        match &outcome.status {
            UploadStatus::Uploaded { recorded: true } => println!("uploaded  {path}"),
            UploadStatus::Uploaded { recorded: false } => {
                println!("uploaded  {path} (warning: not recorded locally)")
            }
            UploadStatus::Skipped { existing } => {
                println!("skipped   {path} (already in album as {})", existing.join(", "))
            }
            UploadStatus::Failed { error } => {
                failed += 1;
                println!("failed    {path}: {error}");
            }
            UploadStatus::Cancelled => {
                failed += 1;
                println!("cancelled {path}");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {total} files were not uploaded");
    }
    Ok(())
}

pub async fn dupes(ctx: &AppContext, album_key: &str, file: &Path) -> anyhow::Result<()> {
    let fingerprint = fingerprint_file(file)
        .await
        .with_context(|| format!("cannot fingerprint {}", file.display()))?;

    let album = AlbumKey::new(album_key);
    let names = ctx.store.find_duplicates(&album, &fingerprint).await?;
    if names.is_empty() {
        println!("{} ({fingerprint}) has no recorded copy in album {album}", file.display());
    } else {
        println!(
            "{} ({fingerprint}) is already in album {album} as: {}",
            file.display(),
            names.join(", ")
        );
    }
    Ok(())
}

/// Expands glob patterns into a sorted, deduplicated list of files.
///
/// Matches that are directories are dropped. A pattern matching nothing gets
/// a warning rather than an error so one typo does not sink a long batch.
fn expand_patterns(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let mut matched = false;
        for entry in glob::glob(pattern)
            .with_context(|| format!("invalid file pattern {pattern:?}"))?
        {
            match entry {
                Ok(path) if path.is_file() => {
                    matched = true;
                    files.push(path);
                }
                Ok(_) => {}
                Err(error) => warn!(%pattern, %error, "skipping unreadable match"),
            }
        }
        if !matched {
            warn!(%pattern, "pattern matched no files");
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_patterns_globs_sorts_and_dedupes() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.jpg", "a.jpg", "c.png"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.jpg")).unwrap();

        let jpgs = format!("{}/*.jpg", dir.path().display());
        let a_literal = format!("{}/a.jpg", dir.path().display());

        let files = expand_patterns(&[jpgs, a_literal]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_expand_patterns_empty_on_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.jpg", dir.path().display());
        let files = expand_patterns(&[pattern]).unwrap();
        assert!(files.is_empty());
    }
}
