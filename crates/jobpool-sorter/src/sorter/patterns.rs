//! Recognising dates in file names and folder layouts.
//!
//! The pattern set is compiled once per run and handed to every job through
//! its arguments.

use regex::Regex;
use std::path::{Component, Path};

/// A calendar date as found in a name: digits kept as written so that folder
/// names keep their zero padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateStamp {
    pub year: String,
    pub month: String,
    pub day: String,
}

impl DateStamp {
    fn from_captures(caps: &regex::Captures<'_>) -> Option<Self> {
        Some(Self {
            year: caps.get(1)?.as_str().to_owned(),
            month: caps.get(2)?.as_str().to_owned(),
            day: caps.get(3)?.as_str().to_owned(),
        })
    }
}

#[derive(Debug)]
pub struct DatePatterns {
    /// Tried in order; the first that matches decides.
    name_formats: [Regex; 3],
    /// `.../YYYY/MM/DD/<something>` on a `/`-joined relative path.
    nested: Regex,
    min_year: i32,
    max_year: i32,
}

impl DatePatterns {
    pub fn new(min_year: i32, max_year: i32) -> Result<Self, regex::Error> {
        Ok(Self {
            name_formats: [
                Regex::new(r"IMG_([0-9]{4})([0-9]{2})([0-9]{2})")?,
                Regex::new(r"([0-9]{4})([0-9]{2})([0-9]{2})")?,
                Regex::new(r"([0-9]{4})-([0-9]{2})-([0-9]{2})")?,
            ],
            nested: Regex::new(r"^(?:.*/)?([0-9]{4})/([0-9]{2})/([0-9]{2})/.+$")?,
            min_year,
            max_year,
        })
    }

    /// Finds the date a file name was stamped with.
    ///
    /// Returns `None` when no format matches, or when the first matching one
    /// yields something that cannot be a date in the accepted window (a serial
    /// number, a far-future year, month 13, ...).
    pub fn classify(&self, file_name: &str) -> Option<DateStamp> {
        let stamp = self
            .name_formats
            .iter()
            .find_map(|format| format.captures(file_name))
            .and_then(|caps| DateStamp::from_captures(&caps))?;

        self.is_plausible(&stamp).then_some(stamp)
    }

    /// Finds a `YEAR/MONTH/DAY` folder triple in `relative`, a path below the
    /// root. The deepest triple wins. The triple is taken as-is; folder names
    /// are not checked against the date window.
    pub fn nested_date(&self, relative: &Path) -> Option<DateStamp> {
        let joined = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");

        self.nested
            .captures(&joined)
            .and_then(|caps| DateStamp::from_captures(&caps))
    }

    fn is_plausible(&self, stamp: &DateStamp) -> bool {
        let (Ok(year), Ok(month), Ok(day)) = (
            stamp.year.parse::<i32>(),
            stamp.month.parse::<u32>(),
            stamp.day.parse::<u32>(),
        ) else {
            return false;
        };

        (self.min_year..=self.max_year).contains(&year)
            && (1..=12).contains(&month)
            && (1..=31).contains(&day)
    }
}
