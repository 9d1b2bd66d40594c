//! Main entry point for analysing a course: filter, group, summarize.

use crate::errors;
use crate::filter::{self, FilterSpec};
use crate::grouping::{self, GroupKey, SeparationKey, SeparationSpec};
use crate::input::RawDataset;
use crate::output;
use crate::statistic::Statistic;
use crate::summary::{self, StatResult};
use itertools::Itertools;
use log::{debug, info, warn};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Which statistics to calculate, by identifier, in order.
///
/// Deserializes from either `{"overall_quality": true, "workload": false}`
/// or `["overall_quality"]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "StatsRepr")]
pub struct StatSelection(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum StatsRepr {
    Flags(Map<String, Value>),
    List(Vec<String>),
}

impl From<StatsRepr> for StatSelection {
    fn from(repr: StatsRepr) -> StatSelection {
        match repr {
            StatsRepr::Flags(flags) => StatSelection(
                flags
                    .into_iter()
                    .filter(|(_, v)| *v == Value::Bool(true))
                    .map(|(k, _)| k)
                    .collect_vec(),
            ),
            StatsRepr::List(ids) => StatSelection(ids),
        }
    }
}

impl StatSelection {
    pub fn from_statistics(stats: &[Statistic]) -> StatSelection {
        StatSelection(stats.iter().map(|s| s.id().to_owned()).collect_vec())
    }

    /// Recognized statistics, without repetitions; unknown identifiers are skipped.
    pub fn statistics(&self) -> Vec<Statistic> {
        let mut stats = vec![];
        for id in &self.0 {
            match Statistic::parse(id) {
                Some(stat) if !stats.contains(&stat) => stats.push(stat),
                Some(_) => (),
                None => debug!(target: "coursestats", "unknown statistic '{id}', skipping"),
            }
        }
        stats
    }
}

/// What to calculate.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub stats: StatSelection,
    #[serde(default)]
    pub filters: FilterSpec,
    /// Group name parts, in order. Empty means one group for all data.
    #[serde(default, alias = "separationKeys")]
    pub separation_keys: Vec<SeparationKey>,
}

/// Statistics of one group.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupResult {
    pub name: String,
    pub key: GroupKey,
    pub offerings: usize,
    pub stats: Vec<StatResult>,
}

impl GroupResult {
    pub fn get(&self, stat: Statistic) -> Option<&StatResult> {
        self.stats.iter().find(|r| r.stat == stat)
    }
}

/// Result of one analysis.
///
/// Serializes to `{"data": ..., "metadata": ..., "statistics_metadata": ...}`
/// with groups in order of first appearance.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisResponse {
    pub groups: Vec<GroupResult>,
    /// The dataset's `metadata`, with its `grouping_metadata` added.
    pub metadata: Value,
}

impl AnalysisResponse {
    pub fn group(&self, name: &str) -> Option<&GroupResult> {
        self.groups.iter().find(|g| g.name == name)
    }
}

struct Values<'a>(&'a [StatResult]);

impl Serialize for Values<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|r| (r.stat.id(), &r.value)))
    }
}

struct Details<'a>(&'a [StatResult]);

impl Serialize for Details<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|r| (r.stat.id(), &r.detail)))
    }
}

struct Data<'a>(&'a [GroupResult]);

impl Serialize for Data<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|g| (&g.name, Values(&g.stats))))
    }
}

struct StatisticsMetadata<'a>(&'a [GroupResult]);

impl Serialize for StatisticsMetadata<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|g| (&g.name, Details(&g.stats))))
    }
}

impl Serialize for AnalysisResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("AnalysisResponse", 3)?;
        s.serialize_field("data", &Data(&self.groups))?;
        s.serialize_field("metadata", &self.metadata)?;
        s.serialize_field("statistics_metadata", &StatisticsMetadata(&self.groups))?;
        s.end()
    }
}

fn merge_metadata(dataset: &RawDataset) -> Value {
    let mut metadata = match &dataset.metadata {
        Value::Object(m) => m.clone(),
        _ => Map::new(),
    };
    metadata.insert(
        "grouping_metadata".to_owned(),
        dataset.grouping_metadata.clone(),
    );
    Value::Object(metadata)
}

/// Group names that would coincide get a numeric suffix, so that no group
/// is hidden in the name-keyed response.
fn unique_names(keys: &[&GroupKey]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    keys.iter()
        .map(|key| {
            let name = key.name();
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                name
            } else {
                warn!(target: "coursestats", "group name '{name}' is not unique, reporting as '{name} ({count})'");
                format!("{name} ({count})")
            }
        })
        .collect_vec()
}

/// Analyse a dataset.
///
/// This is the main entry point for the library. It has no side effects
/// apart from logging, and it never fails: missing data shows up as missing
/// or empty statistics.
pub fn process_analysis_request(dataset: &RawDataset, request: &AnalysisRequest) -> AnalysisResponse {
    let stats = request.stats.statistics();
    let spec = SeparationSpec::new(&request.separation_keys);
    info!(target: "coursestats", "offerings: {}", dataset.len());
    let filtered = filter::filter_instances(dataset, &request.filters);
    if !request.filters.is_unrestricted() {
        info!(target: "coursestats", "offerings after filtering: {}", filtered.len());
    }
    let groups = grouping::separate_instances(&filtered, &spec);
    info!(
        target: "coursestats",
        "groups: {} by [{}] ({:?} in time), statistics: {}",
        groups.len(),
        spec.keys().iter().join(", "),
        spec.temporal(),
        stats.iter().map(|s| s.id()).join(", ")
    );
    let names = unique_names(&groups.iter().map(|g| &g.key).collect_vec());
    let groups = groups
        .into_iter()
        .zip(names)
        .map(|(group, name)| {
            let results = summary::calculate_group_statistics(&group.instances, &stats);
            debug!(
                target: "coursestats",
                "{}: {} offerings; {}",
                name,
                group.instances.len(),
                results
                    .iter()
                    .map(|r| format!("{} {}", r.stat.id(), output::pretty_stat(r)))
                    .join(", ")
            );
            GroupResult {
                name,
                key: group.key,
                offerings: group.instances.len(),
                stats: results,
            }
        })
        .collect_vec();
    AnalysisResponse {
        groups,
        metadata: merge_metadata(dataset),
    }
}

/// Validate a raw JSON dataset and analyse it.
///
/// Fails only if the dataset is not a keyed collection of offerings.
pub fn process_raw(raw: &Value, request: &AnalysisRequest) -> errors::Result<AnalysisResponse> {
    let dataset = RawDataset::from_value(raw)?;
    Ok(process_analysis_request(&dataset, request))
}
