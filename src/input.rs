//! Raw per-offering evaluation data, as delivered by the course data service.

use crate::errors::{self, Result};
use crate::period::{self, Period};
use log::trace;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::result;

/// Response label to number of respondents choosing it.
pub type FrequencyTable = HashMap<String, i64>;

/// One run of a course in one period.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Offering {
    #[serde(default)]
    pub instructor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_table", skip_serializing_if = "Option::is_none")]
    pub overall_quality_frequency: Option<FrequencyTable>,
    #[serde(default, deserialize_with = "lenient_table", skip_serializing_if = "Option::is_none")]
    pub instructor_effectiveness_frequency: Option<FrequencyTable>,
    #[serde(default, deserialize_with = "lenient_table", skip_serializing_if = "Option::is_none")]
    pub intellectual_challenge_frequency: Option<FrequencyTable>,
    #[serde(default, deserialize_with = "lenient_table", skip_serializing_if = "Option::is_none")]
    pub workload_frequency: Option<FrequencyTable>,
    #[serde(default, deserialize_with = "lenient_table", skip_serializing_if = "Option::is_none")]
    pub feedback_frequency: Option<FrequencyTable>,
    #[serde(default, deserialize_with = "lenient_table", skip_serializing_if = "Option::is_none")]
    pub ta_frequency: Option<FrequencyTable>,
    /// Everything else the service stored for this offering (e.g. `ta_names`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Respondent count in a scraped table cell. Integral floats are accepted,
/// counts beyond `i64` saturate, anything else has no count.
fn count_of(v: &Value) -> Option<i64> {
    v.as_i64()
        .or_else(|| v.as_u64().map(|_| i64::MAX))
        .or_else(|| {
            v.as_f64()
                .filter(|x| x.fract() == 0.0 && x.abs() < i64::MAX as f64)
                .map(|x| x as i64)
        })
}

/// A frequency table where cells without a usable count are dropped, and a
/// table that is not an object at all counts as missing.
fn lenient_table<'de, D>(d: D) -> result::Result<Option<FrequencyTable>, D::Error>
where
    D: Deserializer<'de>,
{
    let table = match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(table)) => table,
        Some(other) => {
            trace!(target: "coursestats", "frequency table {other} is not an object, ignoring");
            return Ok(None);
        }
    };
    let table = table
        .into_iter()
        .filter_map(|(label, v)| match count_of(&v) {
            Some(count) => Some((label, count)),
            None => {
                trace!(target: "coursestats", "'{label}': count {v} is not an integer, ignoring");
                None
            }
        })
        .collect();
    Ok(Some(table))
}

/// An offering together with its key and the period decoded from that key.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub key: String,
    pub period: Period,
    pub offering: Offering,
}

impl Instance {
    pub fn new(key: String, offering: Offering) -> Instance {
        let period = period::period_of(&key);
        Instance {
            key,
            period,
            offering,
        }
    }

    /// The course code of the record, or the `DEPT.NNN.NNN` prefix of the key.
    pub fn course_code(&self) -> Option<&str> {
        match self.offering.course_code.as_deref() {
            Some(code) if !code.is_empty() => Some(code),
            _ => course_code_from_key(&self.key),
        }
    }
}

/// The `DEPT.NNN.NNN` prefix of an offering key such as `EN.601.226.01.FA23`.
pub fn course_code_from_key(key: &str) -> Option<&str> {
    let mut parts = key.splitn(4, '.');
    let dept = parts.next()?;
    let a = parts.next()?;
    let b = parts.next()?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());
    let ok = !dept.is_empty() && dept.bytes().all(|c| c.is_ascii_uppercase()) && digits(a) && digits(b);
    ok.then(|| &key[..dept.len() + a.len() + b.len() + 2])
}

/// All offerings of one course, in the order the service listed them.
///
/// `metadata` (course names and the like) and `grouping_metadata` (how
/// courses were merged) are carried through analysis without inspection.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDataset {
    pub instances: Vec<Instance>,
    pub metadata: Value,
    pub grouping_metadata: Value,
}

impl RawDataset {
    /// Validate and convert a parsed JSON document.
    ///
    /// Accepts either the dataset itself or a service response that wraps
    /// it under `raw_data`.
    pub fn from_value(value: &Value) -> Result<RawDataset> {
        let obj = value
            .as_object()
            .ok_or_else(|| errors::invalid_input_ref("expected a JSON object"))?;
        if !obj.contains_key("instances") {
            if let Some(inner) = obj.get("raw_data") {
                return RawDataset::from_value(inner);
            }
        }
        let instances = obj
            .get("instances")
            .ok_or_else(|| errors::invalid_input_ref("missing 'instances'"))?
            .as_object()
            .ok_or_else(|| errors::invalid_input_ref("'instances' is not keyed by offering"))?;
        let instances = instances
            .iter()
            .map(|(key, v)| {
                if !v.is_object() {
                    return Err(errors::invalid_input(format!(
                        "{key}: offering is not an object"
                    )));
                }
                let offering = Offering::deserialize(v)
                    .map_err(|e| errors::invalid_input(format!("{key}: {e}")))?;
                Ok(Instance::new(key.clone(), offering))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RawDataset {
            instances,
            metadata: obj.get("metadata").cloned().unwrap_or(Value::Null),
            grouping_metadata: obj.get("grouping_metadata").cloned().unwrap_or(Value::Null),
        })
    }

    pub fn from_json(s: &str) -> Result<RawDataset> {
        let value: Value = serde_json::from_str(s)?;
        RawDataset::from_value(&value)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
