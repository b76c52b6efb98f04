//! Filesystem primitives used by the job bodies.
//!
//! Every failure carries the path it happened on, so a failed job can be
//! reported without any further context.

use std::{
    io,
    path::{Path, PathBuf},
};

pub type Result<T> = core::result::Result<T, SortError>;

#[derive(Debug, thiserror::Error)]
pub enum SortError {
    /// A destination folder could not be created.
    #[error("could not create folder {path:?}: {source}")]
    CreateFolder { path: PathBuf, source: io::Error },

    /// The rename itself failed.
    #[error("could not move {from:?} to {to:?}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    /// Something already lives at the destination. Files are never
    /// overwritten.
    #[error("refusing to move {from:?}: {to:?} already exists")]
    DestinationExists { from: PathBuf, to: PathBuf },

    /// A path could not be inspected (metadata or listing).
    #[error("could not inspect {path:?}: {source}")]
    Inspect { path: PathBuf, source: io::Error },

    /// An empty folder could not be removed.
    #[error("could not remove folder {path:?}: {source}")]
    Remove { path: PathBuf, source: io::Error },
}

/// Creates `path` and any missing parents. Succeeds if it already exists.
pub async fn create_folder(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| SortError::CreateFolder {
            path: path.to_path_buf(),
            source,
        })
}

/// Renames `from` to `to`, unless `to` already exists.
///
/// The existence check and the rename are two steps, so a file created at
/// `to` in between by another process can still be replaced.
pub async fn move_file(from: &Path, to: &Path) -> Result<()> {
    match tokio::fs::symlink_metadata(to).await {
        Ok(_) => {
            return Err(SortError::DestinationExists {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
            });
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(SortError::Inspect {
                path: to.to_path_buf(),
                source,
            });
        }
    }

    tokio::fs::rename(from, to)
        .await
        .map_err(|source| SortError::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })
}

pub async fn is_dir_empty(path: &Path) -> Result<bool> {
    let inspect = |source| SortError::Inspect {
        path: path.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(path).await.map_err(inspect)?;
    Ok(entries.next_entry().await.map_err(inspect)?.is_none())
}

pub async fn remove_folder(path: &Path) -> Result<()> {
    tokio::fs::remove_dir(path)
        .await
        .map_err(|source| SortError::Remove {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_folder_is_idempotent() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let nested = tmp.path().join("2020").join("01");
        create_folder(&nested).await?;
        create_folder(&nested).await?;
        assert!(nested.is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn move_never_overwrites() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let from = tmp.path().join("a.jpg");
        let to = tmp.path().join("b.jpg");
        std::fs::write(&from, "new")?;
        std::fs::write(&to, "old")?;

        let err = move_file(&from, &to).await.unwrap_err();
        assert!(matches!(err, SortError::DestinationExists { .. }));
        assert_eq!(std::fs::read_to_string(&to)?, "old");
        assert!(from.exists());
        Ok(())
    }

    #[tokio::test]
    async fn move_renames_into_place() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let from = tmp.path().join("a.jpg");
        let to = tmp.path().join("b.jpg");
        std::fs::write(&from, "data")?;

        move_file(&from, &to).await?;
        assert!(!from.exists());
        assert_eq!(std::fs::read_to_string(&to)?, "data");
        Ok(())
    }

    #[tokio::test]
    async fn errors_name_the_path() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let missing = tmp.path().join("missing");

        let err = is_dir_empty(&missing).await.unwrap_err();
        assert!(matches!(err, SortError::Inspect { .. }));
        assert!(err.to_string().contains("missing"));

        let err = move_file(&missing, &tmp.path().join("x")).await.unwrap_err();
        assert!(matches!(err, SortError::Move { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn emptiness_and_removal() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let folder = tmp.path().join("f");
        std::fs::create_dir(&folder)?;
        assert!(is_dir_empty(&folder).await?);

        std::fs::write(folder.join("x"), "")?;
        assert!(!is_dir_empty(&folder).await?);
        assert!(matches!(
            remove_folder(&folder).await,
            Err(SortError::Remove { .. })
        ));

        std::fs::remove_file(folder.join("x"))?;
        remove_folder(&folder).await?;
        assert!(!folder.exists());
        Ok(())
    }
}
