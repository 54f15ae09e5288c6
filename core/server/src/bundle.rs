//! Game folder tarball bundles.
//!
//! The origin packs each profile-bound game folder into
//! `tarballs/<name>.tar.gz` under the content root, so launchers can pull
//! an initial install as one download instead of thousands of fetches. The
//! bundles live inside the content root and are therefore fingerprinted
//! and replicated like any other file.

use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::fs;
use tracing::{info, warn};

use packmirror_common::{Error, Profile, Result};

/// Rebuild the tarball for every profile bound to a game folder.
///
/// Each archive is written to a temporary file first and renamed into
/// place, so a concurrent download never observes a half-written bundle.
/// Profiles pointing at a game folder that does not exist on disk are
/// skipped with a warning.
pub async fn rebuild_tarballs(content_root: &Path, profiles: &[Profile]) -> Result<()> {
    let folders: Vec<&str> = profiles
        .iter()
        .filter_map(|p| p.game_folder.as_deref())
        .collect();

    if folders.is_empty() {
        return Ok(());
    }

    let tarball_dir = content_root.join("tarballs");
    fs::create_dir_all(&tarball_dir).await?;

    for folder in folders {
        let src = content_root.join("gameFolders").join(folder);
        if !fs::metadata(&src).await.map(|m| m.is_dir()).unwrap_or(false) {
            warn!(folder = %folder, "game folder missing, skipping tarball");
            continue;
        }

        let dest = tarball_dir.join(format!("{}.tar.gz", folder));
        let tmp = tarball_dir.join(format!("{}.tar.gz.tmp", folder));

        write_tarball(src, tmp.clone(), folder.to_string()).await?;
        fs::rename(&tmp, &dest).await?;

        info!(folder = %folder, dest = %dest.display(), "tarball rebuilt");
    }

    Ok(())
}

/// Pack one directory into a gzipped tarball on the blocking pool.
///
/// Entries are rooted at the folder name, so extracting the archive
/// recreates `<folder>/...`.
async fn write_tarball(src: PathBuf, dest: PathBuf, folder: String) -> Result<()> {
    tokio::task::spawn_blocking(move || -> Result<()> {
        let file = std::fs::File::create(&dest)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        builder.append_dir_all(&folder, &src)?;
        builder.into_inner()?.finish()?;
        Ok(())
    })
    .await
    .map_err(|e| Error::Io(std::io::Error::other(e)))?
}
