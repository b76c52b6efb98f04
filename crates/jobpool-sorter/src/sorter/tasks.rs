//! Job arguments, job values and the body that runs them.
//!
//! All three modes share one body, [`run_task`], which dispatches on the
//! [`SortTask`] variant. Everything a body needs travels in its arguments.

use crate::sorter::{
    files::{self, SortError},
    patterns::DatePatterns,
};
use jobpool::{BoxError, Cancelled, CancellationToken, Job, JobBody, JobDescriptor};
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

pub const KIND_MOVE: &str = "move";
pub const KIND_FIX_FOLDER: &str = "fixFolder";
pub const KIND_DELETE_FOLDER: &str = "deleteFolder";

/// Per-run settings shared by every job of a run.
#[derive(Debug)]
pub struct SortContext {
    pub root: PathBuf,
    pub others_dir: String,
    pub patterns: DatePatterns,
}

#[derive(Debug)]
pub struct MoveArgs {
    pub context: Arc<SortContext>,
    pub file: PathBuf,
}

#[derive(Debug)]
pub struct FixArgs {
    pub context: Arc<SortContext>,
    pub file: PathBuf,
}

#[derive(Debug)]
pub struct DeleteArgs {
    pub folder: PathBuf,
}

#[derive(Debug)]
pub enum SortTask {
    /// Sort one file from the top of the root.
    Move(MoveArgs),
    /// Flatten one file out of a day folder.
    FixFolder(FixArgs),
    /// Remove one folder if it is empty.
    DeleteFolder(DeleteArgs),
}

impl SortTask {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Move(_) => KIND_MOVE,
            Self::FixFolder(_) => KIND_FIX_FOLDER,
            Self::DeleteFolder(_) => KIND_DELETE_FOLDER,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Move(args) => &args.file,
            Self::FixFolder(args) => &args.file,
            Self::DeleteFolder(args) => &args.folder,
        }
    }

    fn descriptor(&self) -> JobDescriptor {
        let path = self.path().display().to_string();
        let metadata = BTreeMap::from([("path".to_owned(), path.clone())]);
        JobDescriptor::new(path, self.kind()).with_metadata(metadata)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOutcome {
    /// Moved into a dated folder.
    Moved { to: PathBuf },
    /// No usable date; moved into the others folder.
    MovedToOthers { to: PathBuf },
    /// Left where it was.
    Skipped,
    /// Empty folder removed.
    Removed,
    /// Folder not empty, kept.
    Kept,
}

impl fmt::Display for SortOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Moved { to } => write!(f, "moved to {}", to.display()),
            Self::MovedToOthers { to } => write!(f, "moved to {} (no date)", to.display()),
            Self::Skipped => f.write_str("skipped"),
            Self::Removed => f.write_str("removed"),
            Self::Kept => f.write_str("kept"),
        }
    }
}

pub type SortJob = Job<SortTask, SortOutcome>;

/// Builds one job per task, all sharing a single body.
pub fn into_jobs<I>(tasks: I) -> Vec<SortJob>
where
    I: IntoIterator<Item = SortTask>,
{
    let body: Arc<dyn JobBody<SortTask, SortOutcome>> = Arc::new(run_task);
    tasks
        .into_iter()
        .map(|task| Job::new(task.descriptor(), Arc::clone(&body), task))
        .collect()
}

/// The body of every sorter job.
pub async fn run_task(token: CancellationToken, task: SortTask) -> Result<SortOutcome, BoxError> {
    if token.is_cancelled() {
        return Err(Box::new(Cancelled));
    }

    let outcome = match task {
        SortTask::Move(args) => sort_file(args).await?,
        SortTask::FixFolder(args) => fix_folder(args).await?,
        SortTask::DeleteFolder(args) => delete_folder(args).await?,
    };
    Ok(outcome)
}

async fn sort_file(MoveArgs { context, file }: MoveArgs) -> Result<SortOutcome, SortError> {
    let Some(name) = file.file_name() else {
        return Ok(SortOutcome::Skipped);
    };

    match context.patterns.classify(&name.to_string_lossy()) {
        Some(date) => {
            let folder = context.root.join(&date.year).join(&date.month);
            files::create_folder(&folder).await?;
            let to = folder.join(name);
            files::move_file(&file, &to).await?;
            Ok(SortOutcome::Moved { to })
        }
        None => {
            let folder = context.root.join(&context.others_dir);
            files::create_folder(&folder).await?;
            let to = folder.join(name);
            files::move_file(&file, &to).await?;
            Ok(SortOutcome::MovedToOthers { to })
        }
    }
}

async fn fix_folder(FixArgs { context, file }: FixArgs) -> Result<SortOutcome, SortError> {
    let (Some(name), Ok(relative)) = (file.file_name(), file.strip_prefix(&context.root)) else {
        return Ok(SortOutcome::Skipped);
    };
    let Some(date) = context.patterns.nested_date(relative) else {
        return Ok(SortOutcome::Skipped);
    };

    let folder = context.root.join(&date.year).join(&date.month);
    files::create_folder(&folder).await?;
    let to = folder.join(name);
    files::move_file(&file, &to).await?;
    Ok(SortOutcome::Moved { to })
}

async fn delete_folder(DeleteArgs { folder }: DeleteArgs) -> Result<SortOutcome, SortError> {
    if !files::is_dir_empty(&folder).await? {
        return Ok(SortOutcome::Kept);
    }
    files::remove_folder(&folder).await?;
    Ok(SortOutcome::Removed)
}
