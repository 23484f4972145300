//! Year → month → day-fragment grouping of the post index for the sidebar archive.

use crate::domain::posts::{PostIndex, PostSummary};

/// Oldest year the archive walks down to.
pub const MIN_ARCHIVE_YEAR: i32 = 2020;

pub const MONTH_NAMES: [(&str, &str); 12] = [
    ("01", "January"),
    ("02", "February"),
    ("03", "March"),
    ("04", "April"),
    ("05", "May"),
    ("06", "June"),
    ("07", "July"),
    ("08", "August"),
    ("09", "September"),
    ("10", "October"),
    ("11", "November"),
    ("12", "December"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveYear {
    pub year: String,
    pub months: Vec<ArchiveMonth>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveMonth {
    pub month: &'static str,
    pub name: &'static str,
    pub days: Vec<ArchiveDay>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveDay {
    pub fragment: String,
    pub post: PostSummary,
}

pub fn month_name(month: &str) -> Option<&'static str> {
    MONTH_NAMES
        .iter()
        .find(|(number, _)| *number == month)
        .map(|(_, name)| *name)
}

/// Group the index by year and month, newest year first and January first.
///
/// Empty months and years are omitted. Posts whose year falls outside
/// `MIN_ARCHIVE_YEAR..=current_year` do not appear.
pub fn build_archive(index: &PostIndex, current_year: i32) -> Vec<ArchiveYear> {
    let mut years = Vec::new();

    for year in (MIN_ARCHIVE_YEAR..=current_year).rev() {
        let year = year.to_string();
        let months: Vec<ArchiveMonth> = MONTH_NAMES
            .iter()
            .filter_map(|&(month, name)| {
                let days: Vec<ArchiveDay> = index
                    .iter()
                    .filter(|post| {
                        post.key.year() == Some(year.as_str()) && post.key.month() == Some(month)
                    })
                    .map(|post| ArchiveDay {
                        fragment: post.key.fragment().to_string(),
                        post: post.clone(),
                    })
                    .collect();

                (!days.is_empty()).then_some(ArchiveMonth { month, name, days })
            })
            .collect();

        if !months.is_empty() {
            years.push(ArchiveYear { year, months });
        }
    }

    years
}
