//! Turning a folder into a list of tasks, one producer per mode.
//!
//! Producers only look at the filesystem; they never change it. Listing
//! errors are logged and the affected entry is left out, so a partly
//! unreadable tree still yields tasks for everything that could be read.

use crate::sorter::{
    config::Mode,
    tasks::{DeleteArgs, FixArgs, MoveArgs, SortContext, SortTask},
};
use std::{
    fs::FileType,
    path::{Path, PathBuf},
    sync::Arc,
};
use walkdir::{DirEntry, WalkDir};

pub trait Producer: Send {
    /// Lists the tasks for one run, in a stable order.
    fn produce(&self) -> Vec<SortTask>;
}

/// `sort`: every regular file directly inside the root.
pub struct FlatListing {
    context: Arc<SortContext>,
}

/// `fix-folders`: every regular file anywhere below the root.
pub struct FileWalk {
    context: Arc<SortContext>,
}

/// `delete-empty-folders`: every folder below the root, deepest first.
pub struct FolderWalk {
    root: PathBuf,
}

pub fn producer_for(mode: Mode, context: Arc<SortContext>) -> Box<dyn Producer> {
    match mode {
        Mode::Sort => Box::new(FlatListing { context }),
        Mode::FixFolders => Box::new(FileWalk { context }),
        Mode::DeleteEmptyFolders => Box::new(FolderWalk {
            root: context.root.clone(),
        }),
    }
}

impl Producer for FlatListing {
    fn produce(&self) -> Vec<SortTask> {
        list(&self.context.root)
            .into_iter()
            .filter(|(_, file_type)| file_type.is_file())
            .map(|(file, _)| {
                SortTask::Move(MoveArgs {
                    context: Arc::clone(&self.context),
                    file,
                })
            })
            .collect()
    }
}

impl Producer for FileWalk {
    fn produce(&self) -> Vec<SortTask> {
        walk(&self.context.root)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                SortTask::FixFolder(FixArgs {
                    context: Arc::clone(&self.context),
                    file: entry.into_path(),
                })
            })
            .collect()
    }
}

impl Producer for FolderWalk {
    fn produce(&self) -> Vec<SortTask> {
        walk(&self.root)
            .filter(|entry| entry.file_type().is_dir())
            .map(|entry| {
                SortTask::DeleteFolder(DeleteArgs {
                    folder: entry.into_path(),
                })
            })
            .collect()
    }
}

/// Entries directly inside `dir`, sorted by path. Symlinks are reported
/// with their own type and never followed.
fn list(dir: &Path) -> Vec<(PathBuf, FileType)> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot list {}: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut listed = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cannot read an entry of {}: {e}", dir.display());
                continue;
            }
        };
        match entry.file_type() {
            Ok(file_type) => listed.push((entry.path(), file_type)),
            Err(e) => tracing::warn!("Cannot inspect {}: {e}", entry.path().display()),
        }
    }
    listed.sort_by(|(a, _), (b, _)| a.cmp(b));
    listed
}

/// Everything below `root`, sorted by name, with a folder's contents before
/// the folder itself. `root` is not included and links are not followed.
fn walk(root: &Path) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .contents_first(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {e}");
                None
            }
        })
}
