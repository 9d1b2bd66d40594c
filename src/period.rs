//! Period codes: a season tag and a two-digit year at the end of an offering key.
//!
//! An offering key such as `EN.601.226.01.FA23` ends with `.FA23`, which
//! stands for the Fall 2023 period. Within a year the seasons run
//! Intersession, Spring, Summer, Fall.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type Year = u16;

/// Year assigned to offerings with an unparseable period when filtering by year.
pub const UNKNOWN_PERIOD_FILTER_YEAR: Year = 2000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Season {
    #[serde(rename = "IN", alias = "Intersession")]
    Intersession,
    #[serde(rename = "SP", alias = "Spring")]
    Spring,
    #[serde(rename = "SU", alias = "Summer")]
    Summer,
    #[serde(rename = "FA", alias = "Fall")]
    Fall,
}

impl Season {
    pub const ALL: [Season; 4] = [
        Season::Intersession,
        Season::Spring,
        Season::Summer,
        Season::Fall,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Season::Intersession => "IN",
            Season::Spring => "SP",
            Season::Summer => "SU",
            Season::Fall => "FA",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Season::Intersession => "Intersession",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
        }
    }

    /// Position within a year, starting from 0 for Intersession.
    pub fn rank(self) -> u32 {
        match self {
            Season::Intersession => 0,
            Season::Spring => 1,
            Season::Summer => 2,
            Season::Fall => 3,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Season> {
        Season::ALL.into_iter().find(|s| s.tag() == tag)
    }

    /// Month and day on which evaluation results for this season are released.
    fn release_date(self) -> (u32, u32) {
        match self {
            Season::Intersession => (1, 15),
            Season::Spring => (5, 15),
            Season::Summer => (8, 15),
            Season::Fall => (12, 15),
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Season {
    type Err = String;

    /// Accepts either the tag (`FA`) or the label (`Fall`), in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Season::ALL
            .into_iter()
            .find(|x| x.tag().eq_ignore_ascii_case(s) || x.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown season '{s}', expected one of IN, SP, SU, FA"))
    }
}

/// The period of one offering.
///
/// Unparseable keys produce [Period::UNKNOWN], with year 0 and no season.
/// Derived ordering is chronological, and the unknown period sorts first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    pub year: Year,
    pub season: Option<Season>,
}

impl Period {
    pub const UNKNOWN: Period = Period {
        year: 0,
        season: None,
    };

    pub fn new(year: Year, season: Season) -> Period {
        Period {
            year,
            season: Some(season),
        }
    }

    pub fn is_known(&self) -> bool {
        self.season.is_some()
    }

    /// `year * 10 + season rank`, comparable across periods.
    pub fn order(&self) -> u32 {
        self.year as u32 * 10 + self.season.map_or(0, Season::rank)
    }

    pub fn season_label(&self) -> &'static str {
        self.season.map_or("Unknown", Season::label)
    }

    /// Year used by year-range filters.
    pub fn filter_year(&self) -> Year {
        if self.is_known() {
            self.year
        } else {
            UNKNOWN_PERIOD_FILTER_YEAR
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.season {
            Some(season) => write!(f, "{}{:02}", season.tag(), self.year % 100),
            None => write!(f, "Unknown"),
        }
    }
}

/// The raw period code at the end of an offering key, without the leading dot.
///
/// Any two uppercase letters followed by two digits are accepted here, so a
/// code can be reported verbatim even when its season tag is not recognized.
pub fn period_code(key: &str) -> Option<&str> {
    let bytes = key.as_bytes();
    if bytes.len() < 5 {
        return None;
    }
    let tail = &bytes[bytes.len() - 5..];
    let ok = tail[0] == b'.'
        && tail[1].is_ascii_uppercase()
        && tail[2].is_ascii_uppercase()
        && tail[3].is_ascii_digit()
        && tail[4].is_ascii_digit();
    if ok { Some(&key[key.len() - 4..]) } else { None }
}

pub fn period_of(key: &str) -> Period {
    let Some(code) = period_code(key) else {
        return Period::UNKNOWN;
    };
    let Some(season) = Season::from_tag(&code[..2]) else {
        return Period::UNKNOWN;
    };
    match code[2..].parse::<Year>() {
        Ok(yy) => Period::new(2000 + yy, season),
        Err(_) => Period::UNKNOWN,
    }
}

/// The most recent period whose evaluation results have been released by `today`.
pub fn current_period(today: NaiveDate) -> Period {
    let year = today.year() as Year;
    let md = (today.month(), today.day());
    Season::ALL
        .into_iter()
        .rev()
        .find(|s| md >= s.release_date())
        .map(|s| Period::new(year, s))
        .unwrap_or_else(|| Period::new(year - 1, Season::Fall))
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn period_of_well_formed() {
        let p = period_of("EN.601.226.01.FA23");
        assert_eq!(p.year, 2023);
        assert_eq!(p.season, Some(Season::Fall));
        assert_eq!(p.season_label(), "Fall");
        assert_eq!(p.to_string(), "FA23");
        assert_eq!(period_of("AS.100.101.01.IN05"), Period::new(2005, Season::Intersession));
        assert_eq!(period_of("X.SU99").year, 2099);
    }

    #[test]
    fn period_of_malformed_is_unknown() {
        assert_eq!(period_of("EN.601.226.01"), Period::UNKNOWN);
        assert_eq!(period_of("EN.601.226.01.WI23"), Period::UNKNOWN);
        assert_eq!(period_of("EN.601.226.01FA23"), Period::UNKNOWN);
        assert_eq!(period_of("FA23"), Period::UNKNOWN);
        assert_eq!(period_of(""), Period::UNKNOWN);
        assert_eq!(Period::UNKNOWN.filter_year(), 2000);
        assert_eq!(Period::UNKNOWN.season_label(), "Unknown");
        assert_eq!(Period::UNKNOWN.to_string(), "Unknown");
    }

    #[test]
    fn period_code_accepts_unrecognized_tags() {
        assert_eq!(period_code("EN.601.226.01.WI23"), Some("WI23"));
        assert_eq!(period_code("EN.601.226.01.SP24"), Some("SP24"));
        assert_eq!(period_code("EN.601.226.01.sp24"), None);
        assert_eq!(period_code("EN.601.226.01.SP2"), None);
    }

    #[test]
    fn chronological_order() {
        let keys = ["A.FA22", "A.IN23", "A.SP23", "A.SU23", "A.FA23"];
        let periods: Vec<Period> = keys.iter().map(|k| period_of(k)).collect();
        for w in periods.windows(2) {
            assert!(w[0] < w[1]);
            assert!(w[0].order() < w[1].order());
        }
        assert_eq!(period_of("A.SU23").order(), 20232);
        assert!(Period::UNKNOWN < periods[0]);
    }

    #[test]
    fn season_from_str() {
        assert_eq!("FA".parse::<Season>(), Ok(Season::Fall));
        assert_eq!("spring".parse::<Season>(), Ok(Season::Spring));
        assert!("Winter".parse::<Season>().is_err());
    }

    #[test]
    fn season_serde_accepts_tag_and_label() {
        let s: Vec<Season> = serde_json::from_str(r#"["FA", "Spring", "IN"]"#).unwrap();
        assert_eq!(s, [Season::Fall, Season::Spring, Season::Intersession]);
        assert_eq!(serde_json::to_string(&Season::Summer).unwrap(), r#""SU""#);
    }

    #[test]
    fn current_period_follows_release_dates() {
        assert_eq!(current_period(date(2025, 1, 14)), Period::new(2024, Season::Fall));
        assert_eq!(current_period(date(2025, 1, 15)), Period::new(2025, Season::Intersession));
        assert_eq!(current_period(date(2025, 5, 14)), Period::new(2025, Season::Intersession));
        assert_eq!(current_period(date(2025, 6, 1)), Period::new(2025, Season::Spring));
        assert_eq!(current_period(date(2025, 8, 15)), Period::new(2025, Season::Summer));
        assert_eq!(current_period(date(2025, 12, 31)), Period::new(2025, Season::Fall));
    }
}
