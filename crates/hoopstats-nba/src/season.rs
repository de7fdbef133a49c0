// Season identifiers ("2024-25") and the date policy for seasons the loader
// has to create.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use hoopstats_core::config::SeasonConfig;
use hoopstats_core::db::NewSeason;

/// Regular seasons are stored as running from October 1st of the first
/// year to June 30th of the second.
const START_MONTH_DAY: (u32, u32) = (10, 1);
const END_MONTH_DAY: (u32, u32) = (6, 30);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeasonError {
    #[error("season year {0:?} is not of the form YYYY-YY")]
    Malformed(String),

    #[error("season year {label:?}: second year {second:02} does not follow {first}")]
    NotConsecutive {
        label: String,
        first: i32,
        second: u32,
    },

    #[error("season {label}: {field} {date} falls outside {first_year}-{}", .first_year + 1)]
    DateOutsideSeason {
        label: String,
        field: &'static str,
        date: NaiveDate,
        first_year: i32,
    },

    #[error("season {label}: end date {end} is not after start date {start}")]
    InvertedDates {
        label: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// A validated season label such as `2024-25`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeasonYear {
    label: String,
    first_year: i32,
}

impl SeasonYear {
    pub fn parse(text: &str) -> Result<Self, SeasonError> {
        let label = text.trim();
        let malformed = || SeasonError::Malformed(text.to_string());

        let (first, second) = label.split_once('-').ok_or_else(malformed)?;
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if first.len() != 4 || second.len() != 2 || !all_digits(first) || !all_digits(second) {
            return Err(malformed());
        }

        let first_year: i32 = first.parse().map_err(|_| malformed())?;
        let second_year: u32 = second.parse().map_err(|_| malformed())?;
        if (first_year + 1).rem_euclid(100) as u32 != second_year {
            return Err(SeasonError::NotConsecutive {
                label: label.to_string(),
                first: first_year,
                second: second_year,
            });
        }

        Ok(Self {
            label: label.to_string(),
            first_year,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn check_in_season(&self, field: &'static str, date: NaiveDate) -> Result<(), SeasonError> {
        let year = date.year();
        if year == self.first_year || year == self.first_year + 1 {
            Ok(())
        } else {
            Err(SeasonError::DateOutsideSeason {
                label: self.label.clone(),
                field,
                date,
                first_year: self.first_year,
            })
        }
    }

    pub fn default_start_date(&self) -> Result<NaiveDate, SeasonError> {
        let (month, day) = START_MONTH_DAY;
        NaiveDate::from_ymd_opt(self.first_year, month, day)
            .ok_or_else(|| SeasonError::Malformed(self.label.clone()))
    }

    pub fn default_end_date(&self) -> Result<NaiveDate, SeasonError> {
        let (month, day) = END_MONTH_DAY;
        NaiveDate::from_ymd_opt(self.first_year + 1, month, day)
            .ok_or_else(|| SeasonError::Malformed(self.label.clone()))
    }
}

impl FromStr for SeasonYear {
    type Err = SeasonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SeasonYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// The season a load targets, with the dates used if it must be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonPlan {
    pub year: SeasonYear,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SeasonPlan {
    /// Plan for `year` using the default October-to-June dates.
    pub fn for_year(year: SeasonYear) -> Result<Self, SeasonError> {
        let start_date = year.default_start_date()?;
        let end_date = year.default_end_date()?;
        Ok(Self {
            year,
            start_date,
            end_date,
        })
    }

    /// Plan from configuration: the configured year with any date
    /// overrides applied on top of the defaults. An override must fall in
    /// one of the season's two calendar years, so dates written for one
    /// season are rejected when the year is switched to another.
    pub fn from_config(config: &SeasonConfig) -> Result<Self, SeasonError> {
        let mut plan = Self::for_year(SeasonYear::parse(&config.year)?)?;
        if let Some(start) = config.start_date {
            plan.year.check_in_season("start_date", start)?;
            plan.start_date = start;
        }
        if let Some(end) = config.end_date {
            plan.year.check_in_season("end_date", end)?;
            plan.end_date = end;
        }

        if plan.start_date >= plan.end_date {
            return Err(SeasonError::InvertedDates {
                label: plan.year.label().to_string(),
                start: plan.start_date,
                end: plan.end_date,
            });
        }
        Ok(plan)
    }

    /// Row to insert when the season is not stored yet. A newly created
    /// season is always the current one.
    pub fn as_new_season(&self) -> NewSeason<'_> {
        NewSeason {
            season_year: self.year.label(),
            start_date: self.start_date,
            end_date: self.end_date,
            is_current: true,
        }
    }
}
