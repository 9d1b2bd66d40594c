//! Restricting the offerings of a dataset by year, season, and instructor.

use crate::input::{Instance, RawDataset};
use crate::period::{self, Season, Year};
use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize, de};
use std::collections::BTreeSet;
use std::result;

/// Which offerings to keep.
///
/// Each dimension is unrestricted when absent or empty; the restrictions that
/// are present must all hold.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FilterSpec {
    #[serde(default, deserialize_with = "year_or_text")]
    pub min_year: Option<Year>,
    #[serde(default, deserialize_with = "year_or_text")]
    pub max_year: Option<Year>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub seasons: BTreeSet<Season>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub instructors: BTreeSet<String>,
}

impl FilterSpec {
    /// The last three academic years as of `today`.
    ///
    /// The window starts two years before the year of the current period
    /// (one more when that period is Intersession, which still belongs to
    /// the previous academic year) and ends with the calendar year of `today`.
    pub fn recent_years(today: NaiveDate) -> FilterSpec {
        let current = period::current_period(today);
        let base = match current.season {
            Some(Season::Intersession) => current.year - 1,
            _ => current.year,
        };
        FilterSpec {
            min_year: Some(base - 2),
            max_year: Some(today.year() as Year),
            ..Default::default()
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.min_year.is_none()
            && self.max_year.is_none()
            && self.seasons.is_empty()
            && self.instructors.is_empty()
    }

    /// Offerings with an unparseable period count as year 2000 with no
    /// season, so any year range that leaves out 2000, and any season
    /// restriction, excludes them.
    pub fn matches(&self, instance: &Instance) -> bool {
        let year = instance.period.filter_year();
        if self.min_year.is_some_and(|min| year < min) {
            return false;
        }
        if self.max_year.is_some_and(|max| year > max) {
            return false;
        }
        if !self.seasons.is_empty()
            && !instance
                .period
                .season
                .is_some_and(|s| self.seasons.contains(&s))
        {
            return false;
        }
        if !self.instructors.is_empty()
            && !instance
                .offering
                .instructor_name
                .as_ref()
                .is_some_and(|n| self.instructors.contains(n))
        {
            return false;
        }
        true
    }
}

/// The offerings of `dataset` that pass `filters`, in dataset order.
pub fn filter_instances<'a>(dataset: &'a RawDataset, filters: &FilterSpec) -> Vec<&'a Instance> {
    dataset
        .instances
        .iter()
        .filter(|i| filters.matches(i))
        .collect_vec()
}

fn null_as_default<'de, D, T>(d: D) -> result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum YearValue {
    Number(u64),
    Text(String),
}

/// Years arrive as numbers or as numeric strings; `0` and `""` mean unset.
fn year_or_text<'de, D>(d: D) -> result::Result<Option<Year>, D::Error>
where
    D: Deserializer<'de>,
{
    let year = match Option::<YearValue>::deserialize(d)? {
        None => return Ok(None),
        Some(YearValue::Number(n)) => n,
        Some(YearValue::Text(s)) if s.trim().is_empty() => return Ok(None),
        Some(YearValue::Text(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| <D::Error as de::Error>::custom(format!("invalid year '{s}'")))?,
    };
    if year == 0 {
        return Ok(None);
    }
    Year::try_from(year)
        .map(Some)
        .map_err(|_| <D::Error as de::Error>::custom(format!("year {year} out of range")))
}
