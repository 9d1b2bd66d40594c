//! Splitting offerings into comparison groups.

use crate::errors::{self, Result};
use crate::input::Instance;
use crate::names;
use crate::period;
use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::collections::hash_map::Entry::{Occupied, Vacant};
use std::fmt;

/// Name of the single group formed when no separation keys are given.
pub const ALL_DATA: &str = "All Data";

/// Value used for a separation key that an offering has no value for.
pub const UNKNOWN: &str = "Unknown";

/// A dimension along which offerings are separated.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum SeparationKey {
    Instructor,
    Year,
    Season,
    ExactPeriod,
    CourseCode,
    CourseName,
    /// Any other field of the offering record.
    Field(String),
}

impl SeparationKey {
    pub fn parse(s: &str) -> Result<SeparationKey> {
        let key = match s.trim() {
            "" => return Err(errors::invalid_argument_ref("empty separation key")),
            "instructor" => SeparationKey::Instructor,
            "year" => SeparationKey::Year,
            "season" => SeparationKey::Season,
            "exact_period" => SeparationKey::ExactPeriod,
            "course_code" => SeparationKey::CourseCode,
            "course_name" => SeparationKey::CourseName,
            other => SeparationKey::Field(other.to_owned()),
        };
        Ok(key)
    }

    pub fn as_str(&self) -> &str {
        match self {
            SeparationKey::Instructor => "instructor",
            SeparationKey::Year => "year",
            SeparationKey::Season => "season",
            SeparationKey::ExactPeriod => "exact_period",
            SeparationKey::CourseCode => "course_code",
            SeparationKey::CourseName => "course_name",
            SeparationKey::Field(name) => name,
        }
    }

}

impl fmt::Display for SeparationKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for SeparationKey {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        SeparationKey::parse(&s).map_err(|e| e.to_string())
    }
}

impl From<SeparationKey> for String {
    fn from(key: SeparationKey) -> String {
        key.as_str().to_owned()
    }
}

/// How offerings are split in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Temporal {
    None,
    Coarse { year: bool, season: bool },
    Exact,
}

impl Temporal {
    /// Mode requested by a list of separation keys; `exact_period` wins.
    pub fn of(keys: &[SeparationKey]) -> Temporal {
        let has = |k: SeparationKey| keys.contains(&k);
        if has(SeparationKey::ExactPeriod) {
            Temporal::Exact
        } else if has(SeparationKey::Year) || has(SeparationKey::Season) {
            Temporal::Coarse {
                year: has(SeparationKey::Year),
                season: has(SeparationKey::Season),
            }
        } else {
            Temporal::None
        }
    }

    /// Whether `key` adds nothing under this mode.
    pub fn implies(self, key: &SeparationKey) -> bool {
        self == Temporal::Exact && matches!(key, SeparationKey::Year | SeparationKey::Season)
    }
}

/// Normalized list of separation keys.
///
/// Duplicates are dropped, and keys implied by the [Temporal] mode (`year`
/// and `season` next to `exact_period`) are dropped. Otherwise the given
/// order is kept, and it is the order of the parts of each group name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeparationSpec {
    keys: Vec<SeparationKey>,
    temporal: Temporal,
}

impl Default for SeparationSpec {
    fn default() -> SeparationSpec {
        SeparationSpec {
            keys: vec![],
            temporal: Temporal::None,
        }
    }
}

impl SeparationSpec {
    pub fn new(keys: &[SeparationKey]) -> SeparationSpec {
        let temporal = Temporal::of(keys);
        let mut normalized: Vec<SeparationKey> = vec![];
        for key in keys {
            if normalized.contains(key) {
                debug!(target: "coursestats", "separation key '{key}' repeated, ignoring");
                continue;
            }
            if temporal.implies(key) {
                warn!(target: "coursestats", "separation key '{key}' is implied by 'exact_period', ignoring");
                continue;
            }
            normalized.push(key.clone());
        }
        SeparationSpec {
            keys: normalized,
            temporal,
        }
    }

    pub fn keys(&self) -> &[SeparationKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn temporal(&self) -> Temporal {
        self.temporal
    }
}

/// Identity of a group: one value per separation key, in key order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupKey(pub Vec<String>);

impl GroupKey {
    /// Values joined with `", "`, or [ALL_DATA] without separation keys.
    ///
    /// Distinct keys can produce the same name, e.g. when a value itself
    /// contains `", "`.
    pub fn name(&self) -> String {
        if self.0.is_empty() {
            ALL_DATA.to_owned()
        } else {
            self.0.join(", ")
        }
    }
}

pub struct Group<'a> {
    pub key: GroupKey,
    pub instances: Vec<&'a Instance>,
}

impl Group<'_> {
    pub fn name(&self) -> String {
        self.key.name()
    }
}

/// Text of a JSON field used as a group value.
///
/// Empty strings, `null`, `false`, and zero have none. Arrays list their
/// elements separated by `", "`.
fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .join(", "),
        ),
        other => Some(other.to_string()),
    }
}

fn field_text(instance: &Instance, name: &str) -> Option<String> {
    let o = &instance.offering;
    let nonempty = |s: &Option<String>| s.clone().filter(|s| !s.is_empty());
    match name {
        "instructor_name" => nonempty(&o.instructor_name),
        "course_code" => instance.course_code().map(str::to_owned),
        "course_name" => nonempty(&o.course_name),
        _ => o.extra.get(name).and_then(value_text),
    }
}

fn key_value(key: &SeparationKey, instance: &Instance, names: &HashMap<String, String>) -> String {
    let value = match key {
        SeparationKey::Instructor => {
            let name = instance.offering.instructor_name.as_deref();
            Some(names::display_name(names, name).to_owned())
        }
        SeparationKey::Year => Some(instance.period.filter_year().to_string()),
        SeparationKey::Season => Some(instance.period.season_label().to_owned()),
        SeparationKey::ExactPeriod => period::period_code(&instance.key).map(str::to_owned),
        SeparationKey::CourseCode => field_text(instance, "course_code"),
        SeparationKey::CourseName => field_text(instance, "course_name"),
        SeparationKey::Field(name) => field_text(instance, name),
    };
    value.unwrap_or_else(|| UNKNOWN.to_owned())
}

/// Groups of `instances`, in order of first appearance.
///
/// Without separation keys there is exactly one group, [ALL_DATA], even if
/// it is empty.
pub fn separate_instances<'a>(instances: &[&'a Instance], spec: &SeparationSpec) -> Vec<Group<'a>> {
    if spec.is_empty() {
        return vec![Group {
            key: GroupKey(vec![]),
            instances: instances.to_vec(),
        }];
    }
    let names = if spec.keys().contains(&SeparationKey::Instructor) {
        names::canonicalize(instances)
    } else {
        HashMap::new()
    };
    let mut groups: Vec<Group<'a>> = vec![];
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    for &instance in instances {
        let key = GroupKey(
            spec.keys()
                .iter()
                .map(|k| key_value(k, instance, &names))
                .collect_vec(),
        );
        match index.entry(key) {
            Occupied(e) => groups[*e.get()].instances.push(instance),
            Vacant(e) => {
                groups.push(Group {
                    key: e.key().clone(),
                    instances: vec![instance],
                });
                e.insert(groups.len() - 1);
            }
        }
    }
    groups
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::input::RawDataset;
    use serde_json::json;

    fn dataset() -> RawDataset {
        let v = json!({
            "instances": {
                "EN.601.226.01.FA21": {"instructor_name": "J. Smith", "course_name": "Data Structures", "section_type": "lecture"},
                "EN.601.226.01.SP22": {"instructor_name": "Ada Byron", "course_name": "Data Structures"},
                "EN.601.226.02.FA21": {"instructor_name": "j smith", "course_name": "Data Structures", "section_type": "lab"},
                "EN.601.226.01.FA23": {"instructor_name": "JSmith", "course_name": "Intro Data Structures", "credits": 3},
                "EN.601.226.01": {"instructor_name": null},
            }
        });
        RawDataset::from_value(&v).unwrap()
    }

    fn keys(list: &[&str]) -> SeparationSpec {
        let parsed = list
            .iter()
            .map(|s| SeparationKey::parse(s).unwrap())
            .collect_vec();
        SeparationSpec::new(&parsed)
    }

    fn names(groups: &[Group]) -> Vec<String> {
        groups.iter().map(Group::name).collect_vec()
    }

    fn sizes(groups: &[Group]) -> Vec<usize> {
        groups.iter().map(|g| g.instances.len()).collect_vec()
    }

    #[test]
    fn no_keys_single_group() {
        let d = dataset();
        let all = d.instances.iter().collect_vec();
        let groups = separate_instances(&all, &SeparationSpec::default());
        assert_eq!(names(&groups), [ALL_DATA]);
        assert_eq!(sizes(&groups), [5]);
        let groups = separate_instances(&[], &SeparationSpec::default());
        assert_eq!(sizes(&groups), [0]);
        assert!(separate_instances(&[], &keys(&["year"])).is_empty());
    }

    #[test]
    fn by_instructor_uses_latest_spelling() {
        let d = dataset();
        let all = d.instances.iter().collect_vec();
        let groups = separate_instances(&all, &keys(&["instructor"]));
        assert_eq!(names(&groups), ["JSmith", "Ada Byron", "Unknown"]);
        assert_eq!(sizes(&groups), [3, 1, 1]);
    }

    #[test]
    fn composite_keys_in_given_order() {
        let d = dataset();
        let all = d.instances.iter().collect_vec();
        let groups = separate_instances(&all, &keys(&["season", "instructor"]));
        assert_eq!(
            names(&groups),
            ["Fall, JSmith", "Spring, Ada Byron", "Unknown, Unknown"]
        );
        assert_eq!(sizes(&groups), [3, 1, 1]);
        let groups = separate_instances(&all, &keys(&["year", "course_name"]));
        assert_eq!(
            names(&groups),
            [
                "2021, Data Structures",
                "2022, Data Structures",
                "2023, Intro Data Structures",
                "2000, Unknown"
            ]
        );
    }

    #[test]
    fn exact_period_and_course_code() {
        let d = dataset();
        let all = d.instances.iter().collect_vec();
        let groups = separate_instances(&all, &keys(&["exact_period", "course_code"]));
        assert_eq!(
            names(&groups),
            [
                "FA21, EN.601.226",
                "SP22, EN.601.226",
                "FA23, EN.601.226",
                "Unknown, EN.601.226"
            ]
        );
        assert_eq!(sizes(&groups), [2, 1, 1, 1]);
    }

    #[test]
    fn arbitrary_record_fields() {
        let d = dataset();
        let all = d.instances.iter().collect_vec();
        let groups = separate_instances(&all, &keys(&["section_type"]));
        assert_eq!(names(&groups), ["lecture", "Unknown", "lab"]);
        let groups = separate_instances(&all, &keys(&["credits"]));
        assert_eq!(names(&groups), ["Unknown", "3"]);
    }

    #[test]
    fn unknown_period_is_year_2000() {
        let d = dataset();
        let all = d.instances.iter().collect_vec();
        let groups = separate_instances(&all, &keys(&["year"]));
        assert_eq!(names(&groups), ["2021", "2022", "2023", "2000"]);
        assert_eq!(sizes(&groups), [2, 1, 1, 1]);
    }

    #[test]
    fn list_and_zero_fields() {
        let v = json!({
            "instances": {
                "A.100.101.01.FA21": {"ta_names": ["N/A"], "credits": 0},
                "A.100.101.01.FA22": {"ta_names": ["Ann Lee", "Bo Chen"], "credits": 3},
                "A.100.101.01.FA23": {"ta_names": [], "credits": 0.0},
            }
        });
        let d = RawDataset::from_value(&v).unwrap();
        let all = d.instances.iter().collect_vec();
        let groups = separate_instances(&all, &keys(&["ta_names"]));
        assert_eq!(names(&groups), ["N/A", "Ann Lee, Bo Chen", "Unknown"]);
        let groups = separate_instances(&all, &keys(&["credits"]));
        assert_eq!(names(&groups), ["Unknown", "3"]);
        assert_eq!(sizes(&groups), [2, 1]);
    }

    #[test]
    fn structured_keys_do_not_collide() {
        let a = GroupKey(vec!["Smith, J".to_owned(), "2021".to_owned()]);
        let b = GroupKey(vec!["Smith".to_owned(), "J, 2021".to_owned()]);
        assert_eq!(a.name(), b.name());
        assert_ne!(a, b);
    }

    #[test]
    fn separation_keys_are_normalized() {
        let s = keys(&["year", "exact_period", "instructor", "season", "instructor"]);
        assert_eq!(
            s.keys(),
            [SeparationKey::ExactPeriod, SeparationKey::Instructor]
        );
        assert_eq!(s.temporal(), Temporal::Exact);
        assert_eq!(
            keys(&["season"]).temporal(),
            Temporal::Coarse {
                year: false,
                season: true
            }
        );
        assert_eq!(keys(&["instructor"]).temporal(), Temporal::None);
        assert_eq!(SeparationSpec::default().temporal(), Temporal::None);
        let s = keys(&["exact_period", "year"]);
        assert_eq!(s.keys(), [SeparationKey::ExactPeriod]);
        assert!(Temporal::Exact.implies(&SeparationKey::Season));
        assert!(!Temporal::Exact.implies(&SeparationKey::ExactPeriod));
        assert!(!(Temporal::Coarse { year: true, season: false }).implies(&SeparationKey::Year));
        assert!(SeparationKey::parse(" ").is_err());
    }

    #[test]
    fn separation_keys_deserialize_from_strings() {
        let k: Vec<SeparationKey> = serde_json::from_value(json!(["instructor", "ta_names"])).unwrap();
        assert_eq!(
            k,
            [
                SeparationKey::Instructor,
                SeparationKey::Field("ta_names".to_owned())
            ]
        );
        assert!(serde_json::from_value::<Vec<SeparationKey>>(json!([""])).is_err());
        assert_eq!(serde_json::to_value(&k).unwrap(), json!(["instructor", "ta_names"]));
    }
}
