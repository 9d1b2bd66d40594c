//! The survey statistics that can be requested.

use crate::input::{FrequencyTable, Offering};
use serde::{Serialize, Serializer};
use std::fmt;

const QUALITY: &[(&str, u8)] = &[
    ("Poor", 1),
    ("Weak", 2),
    ("Satisfactory", 3),
    ("Good", 4),
    ("Excellent", 5),
];

const WORKLOAD: &[(&str, u8)] = &[
    ("Much lighter", 1),
    ("Somewhat lighter", 2),
    ("Typical", 3),
    ("Somewhat heavier", 4),
    ("Much heavier", 5),
];

const AGREEMENT: &[(&str, u8)] = &[
    ("Disagree strongly", 1),
    ("Disagree somewhat", 2),
    ("Neither agree nor disagree", 3),
    ("Agree somewhat", 4),
    ("Agree strongly", 5),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Statistic {
    OverallQuality,
    InstructorEffectiveness,
    IntellectualChallenge,
    Workload,
    HelpfulFeedback,
    TaQuality,
    /// Not a survey question: the distinct periods in which the course ran.
    PeriodsRun,
}

impl Statistic {
    pub const ALL: [Statistic; 7] = [
        Statistic::OverallQuality,
        Statistic::InstructorEffectiveness,
        Statistic::IntellectualChallenge,
        Statistic::Workload,
        Statistic::HelpfulFeedback,
        Statistic::TaQuality,
        Statistic::PeriodsRun,
    ];

    /// Identifier used in requests and responses.
    pub fn id(self) -> &'static str {
        match self {
            Statistic::OverallQuality => "overall_quality",
            Statistic::InstructorEffectiveness => "instructor_effectiveness",
            Statistic::IntellectualChallenge => "intellectual_challenge",
            Statistic::Workload => "workload",
            Statistic::HelpfulFeedback => "feedback_frequency",
            Statistic::TaQuality => "ta_frequency",
            Statistic::PeriodsRun => "periods_course_has_been_run",
        }
    }

    /// Name of the frequency table on an offering record.
    pub fn field(self) -> Option<&'static str> {
        match self {
            Statistic::OverallQuality => Some("overall_quality_frequency"),
            Statistic::InstructorEffectiveness => Some("instructor_effectiveness_frequency"),
            Statistic::IntellectualChallenge => Some("intellectual_challenge_frequency"),
            Statistic::Workload => Some("workload_frequency"),
            Statistic::HelpfulFeedback => Some("feedback_frequency"),
            Statistic::TaQuality => Some("ta_frequency"),
            Statistic::PeriodsRun => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Statistic::OverallQuality => "Overall Quality",
            Statistic::InstructorEffectiveness => "Instructor Effectiveness",
            Statistic::IntellectualChallenge => "Intellectual Challenge",
            Statistic::Workload => "Workload",
            Statistic::HelpfulFeedback => "Helpful Feedback",
            Statistic::TaQuality => "TA Quality",
            Statistic::PeriodsRun => "Periods Course Has Been Run",
        }
    }

    pub fn default_enabled(self) -> bool {
        matches!(
            self,
            Statistic::OverallQuality
                | Statistic::InstructorEffectiveness
                | Statistic::IntellectualChallenge
                | Statistic::Workload
        )
    }

    pub fn defaults() -> Vec<Statistic> {
        Statistic::ALL
            .into_iter()
            .filter(|s| s.default_enabled())
            .collect()
    }

    /// Response label to score, or `None` for [Statistic::PeriodsRun].
    pub fn scale(self) -> Option<&'static [(&'static str, u8)]> {
        match self {
            Statistic::OverallQuality
            | Statistic::InstructorEffectiveness
            | Statistic::IntellectualChallenge
            | Statistic::TaQuality => Some(QUALITY),
            Statistic::Workload => Some(WORKLOAD),
            Statistic::HelpfulFeedback => Some(AGREEMENT),
            Statistic::PeriodsRun => None,
        }
    }

    pub fn score(self, label: &str) -> Option<u8> {
        self.scale()?
            .iter()
            .find(|(l, _)| *l == label)
            .map(|&(_, v)| v)
    }

    pub fn table(self, offering: &Offering) -> Option<&FrequencyTable> {
        match self {
            Statistic::OverallQuality => offering.overall_quality_frequency.as_ref(),
            Statistic::InstructorEffectiveness => {
                offering.instructor_effectiveness_frequency.as_ref()
            }
            Statistic::IntellectualChallenge => offering.intellectual_challenge_frequency.as_ref(),
            Statistic::Workload => offering.workload_frequency.as_ref(),
            Statistic::HelpfulFeedback => offering.feedback_frequency.as_ref(),
            Statistic::TaQuality => offering.ta_frequency.as_ref(),
            Statistic::PeriodsRun => None,
        }
    }

    /// Accepts the identifier, the record field name, or either one without
    /// its `_frequency` suffix.
    pub fn parse(s: &str) -> Option<Statistic> {
        let bare = |x: &str| x.strip_suffix("_frequency").unwrap_or(x).to_owned();
        let wanted = bare(s);
        Statistic::ALL.into_iter().find(|stat| {
            bare(stat.id()) == wanted || stat.field().is_some_and(|f| bare(f) == wanted)
        })
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl Serialize for Statistic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}
