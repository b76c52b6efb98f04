use anyhow::bail;
use chrono::Datelike;
use clap::{Parser, ValueEnum};
use std::path::{Component, Path, PathBuf};

/// What to do with the files below `ROOT`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Move every file directly inside ROOT into ROOT/YEAR/MONTH, or into the
    /// others folder when its name carries no usable date.
    Sort,
    /// Remove every empty folder below ROOT.
    #[value(alias = "deleteEmptyFolders")]
    DeleteEmptyFolders,
    /// Flatten ROOT/.../YEAR/MONTH/DAY/file layouts into ROOT/YEAR/MONTH/file.
    #[value(alias = "fixFolders")]
    FixFolders,
}

/// Runtime configuration for the `file-sorter` binary.
///
/// Values come from CLI arguments or environment variables (a `.env` file is
/// loaded first), with defaults suitable for sorting a camera dump on a
/// laptop.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "file-sorter",
    version,
    about = "Sorts files into YEAR/MONTH folders based on the date in their names"
)]
pub struct CliArgs {
    /// Folder to work on.
    pub root: PathBuf,

    /// Operation to run.
    #[arg(value_enum)]
    pub mode: Mode,

    /// Number of jobs processed concurrently.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = 10)]
    pub num_workers: usize,

    /// Number of jobs buffered ahead of the workers.
    ///
    /// Handing listed jobs to the workers waits when this many are pending.
    ///
    /// Environment variable: `QUEUE_CAPACITY`
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = 64)]
    pub queue_capacity: usize,

    /// Number of finished jobs buffered before workers wait for the report
    /// loop to catch up.
    ///
    /// Environment variable: `RESULT_BUFFER_SIZE`
    #[arg(long, env = "RESULT_BUFFER_SIZE", default_value_t = 64)]
    pub result_buffer_size: usize,

    /// Name of the folder, inside ROOT, that receives files without a usable
    /// date.
    ///
    /// Environment variable: `OTHERS_DIR`
    #[arg(long, env = "OTHERS_DIR", default_value_t = String::from("others"))]
    pub others_dir: String,

    /// Dates more than this many years in the past are not trusted.
    ///
    /// Environment variable: `MAX_AGE_YEARS`
    #[arg(long, env = "MAX_AGE_YEARS", default_value_t = 80)]
    pub max_age_years: u16,
}

#[derive(Debug, Clone)]
pub struct SorterConfig {
    pub root: PathBuf,
    pub mode: Mode,
    pub num_workers: usize,
    pub queue_capacity: usize,
    pub result_buffer_size: usize,
    pub others_dir: String,
    /// Oldest year accepted as a real date.
    pub min_year: i32,
    /// Newest year accepted as a real date (the current year).
    pub max_year: i32,
}

impl SorterConfig {
    fn validate_others_dir(name: &str) -> anyhow::Result<()> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(()),
            _ => bail!("OTHERS_DIR ({name:?}) must be a single folder name"),
        }
    }
}

impl TryFrom<CliArgs> for SorterConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }

        if args.queue_capacity == 0 {
            bail!("QUEUE_CAPACITY must be greater than 0");
        }

        if args.result_buffer_size == 0 {
            bail!("RESULT_BUFFER_SIZE must be greater than 0");
        }

        if !args.root.is_dir() {
            bail!("ROOT ({}) is not a folder", args.root.display());
        }

        Self::validate_others_dir(&args.others_dir)?;

        let max_year = chrono::Local::now().year();
        let min_year = max_year - i32::from(args.max_age_years);

        Ok(Self {
            root: args.root,
            mode: args.mode,
            num_workers: args.num_workers,
            queue_capacity: args.queue_capacity,
            result_buffer_size: args.result_buffer_size,
            others_dir: args.others_dir,
            min_year,
            max_year,
        })
    }
}
