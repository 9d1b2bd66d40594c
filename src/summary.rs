//! Summary statistics for one group of offerings.
//!
//! Frequency tables are added label by label across the group, then scored
//! with the statistic's fixed scale. Every respondent counts once, so a
//! large offering weighs more than a small one.

use crate::input::{FrequencyTable, Instance};
use crate::period;
use crate::statistic::Statistic;
use itertools::Itertools;
use log::trace;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Value reported for [Statistic::PeriodsRun] when no key has a period code.
pub const NO_PERIODS: &str = "N/A";

/// Mean and sample standard deviation of the scores, both rounded to two
/// decimals. Without any responses `mean` and `std` are `None`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub n: u64,
}

impl Summary {
    pub const EMPTY: Summary = Summary {
        mean: None,
        std: None,
        n: 0,
    };
}

/// Primary value shown for a statistic.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Mean(Option<f64>),
    Periods(String),
}

/// Sample size and spread behind a [StatValue]; both `None` for periods.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StatDetail {
    pub n: Option<u64>,
    pub std: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatResult {
    pub stat: Statistic,
    pub value: StatValue,
    pub detail: StatDetail,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Label-wise sum of the statistic's tables over `instances`.
///
/// `None` if not a single offering has a table for this statistic.
pub fn aggregate(stat: Statistic, instances: &[&Instance]) -> Option<FrequencyTable> {
    let mut total: Option<FrequencyTable> = None;
    for inst in instances {
        if let Some(table) = stat.table(&inst.offering) {
            let total = total.get_or_insert_with(HashMap::new);
            for (label, &count) in table {
                let sum = total.entry(label.clone()).or_insert(0);
                *sum = sum.saturating_add(count);
            }
        }
    }
    total
}

/// Labels outside the statistic's scale and non-positive counts are ignored.
pub fn summarize(stat: Statistic, frequencies: &FrequencyTable) -> Summary {
    let mut scored: Vec<(u128, u128)> = vec![];
    for (label, &count) in frequencies {
        let Some(score) = stat.score(label) else {
            continue;
        };
        if count <= 0 {
            continue;
        }
        scored.push((count as u128, score as u128));
    }
    let n: u128 = scored.iter().map(|&(count, _)| count).sum();
    if n == 0 {
        return Summary::EMPTY;
    }
    let sum: u128 = scored.iter().map(|&(count, score)| count * score).sum();
    let sum_sq: u128 = scored.iter().map(|&(count, score)| count * score * score).sum();
    let mean = sum as f64 / n as f64;
    let std = if n > 1 {
        // Sum of squared deviations is (n * sum_sq - sum^2) / n, exact in integers
        // unless the counts are astronomically large.
        let variance = match (n.checked_mul(sum_sq), sum.checked_mul(sum)) {
            (Some(a), Some(b)) => (a - b) as f64 / (n * (n - 1)) as f64,
            _ => {
                let dev: f64 = scored
                    .iter()
                    .map(|&(count, score)| count as f64 * (score as f64 - mean).powi(2))
                    .sum();
                dev / (n - 1) as f64
            }
        };
        variance.sqrt()
    } else {
        0.0
    };
    Summary {
        mean: Some(round2(mean)),
        std: Some(round2(std)),
        n: u64::try_from(n).unwrap_or(u64::MAX),
    }
}

/// Sorted distinct period codes of the offerings, joined with `", "`.
pub fn periods_run(instances: &[&Instance]) -> String {
    let codes: BTreeSet<&str> = instances
        .iter()
        .filter_map(|i| period::period_code(&i.key))
        .collect();
    if codes.is_empty() {
        NO_PERIODS.to_owned()
    } else {
        codes.into_iter().join(", ")
    }
}

/// Statistics for one group, in the order requested.
///
/// A frequency-based statistic that no offering in a non-empty group
/// carries is left out. An empty group reports every statistic as having
/// no responses.
pub fn calculate_group_statistics(instances: &[&Instance], stats: &[Statistic]) -> Vec<StatResult> {
    let mut results = vec![];
    for &stat in stats {
        if stat == Statistic::PeriodsRun {
            results.push(StatResult {
                stat,
                value: StatValue::Periods(periods_run(instances)),
                detail: StatDetail { n: None, std: None },
            });
            continue;
        }
        let summary = match aggregate(stat, instances) {
            Some(freq) => summarize(stat, &freq),
            None if instances.is_empty() => Summary::EMPTY,
            None => {
                trace!(target: "coursestats", "{}: no offering has {}", stat, stat.id());
                continue;
            }
        };
        results.push(StatResult {
            stat,
            value: StatValue::Mean(summary.mean),
            detail: StatDetail {
                n: Some(summary.n),
                std: summary.std,
            },
        });
    }
    results
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::input::Offering;

    fn freq(pairs: &[(&str, i64)]) -> FrequencyTable {
        pairs.iter().map(|&(l, c)| (l.to_owned(), c)).collect()
    }

    fn quality(key: &str, pairs: &[(&str, i64)]) -> Instance {
        let offering = Offering {
            instructor_name: Some("Ada Byron".to_owned()),
            overall_quality_frequency: Some(freq(pairs)),
            ..Default::default()
        };
        Instance::new(key.to_owned(), offering)
    }

    #[test]
    fn two_offerings_known_values() {
        let a = quality("EN.601.226.01.FA22", &[("Excellent", 2), ("Good", 1)]);
        let b = quality("EN.601.226.01.SP23", &[("Excellent", 1)]);
        let group = [&a, &b];
        let freq = aggregate(Statistic::OverallQuality, &group).unwrap();
        assert_eq!(freq["Excellent"], 3);
        assert_eq!(freq["Good"], 1);
        let s = summarize(Statistic::OverallQuality, &freq);
        assert_eq!(s.n, 4);
        assert_eq!(s.mean, Some(4.75));
        assert_eq!(s.std, Some(0.5));
    }

    #[test]
    fn single_response() {
        let s = summarize(Statistic::OverallQuality, &freq(&[("Satisfactory", 1)]));
        assert_eq!(
            s,
            Summary {
                mean: Some(3.0),
                std: Some(0.0),
                n: 1
            }
        );
    }

    #[test]
    fn ignores_unknown_labels_and_non_positive_counts() {
        let f = freq(&[("Good", 2), ("Meh", 7), ("Poor", 0), ("Weak", -3)]);
        let s = summarize(Statistic::OverallQuality, &f);
        assert_eq!(s.n, 2);
        assert_eq!(s.mean, Some(4.0));
        assert_eq!(s.std, Some(0.0));
        assert_eq!(summarize(Statistic::Workload, &f), Summary::EMPTY);
    }

    #[test]
    fn sample_standard_deviation_is_rounded() {
        // Scores 1, 2, 2, 5: mean 2.5, squared deviations sum to 9.
        let f = freq(&[("Much lighter", 1), ("Somewhat lighter", 2), ("Much heavier", 1)]);
        let s = summarize(Statistic::Workload, &f);
        assert_eq!(s.n, 4);
        assert_eq!(s.mean, Some(2.5));
        assert_eq!(s.std, Some(1.73));
    }

    #[test]
    fn huge_counts_do_not_overflow() {
        let a = quality("EN.601.226.01.FA22", &[("Good", i64::MAX - 1)]);
        let b = quality("EN.601.226.01.SP23", &[("Good", i64::MAX - 1)]);
        let total = aggregate(Statistic::OverallQuality, &[&a, &b]).unwrap();
        assert_eq!(total["Good"], i64::MAX);
        let s = summarize(Statistic::OverallQuality, &total);
        assert_eq!(s.n, i64::MAX as u64);
        assert_eq!(s.mean, Some(4.0));
        assert_eq!(s.std, Some(0.0));

        let f = freq(&[("Poor", 4_000_000_000_000_000_000), ("Excellent", 4_000_000_000_000_000_000)]);
        let s = summarize(Statistic::OverallQuality, &f);
        assert_eq!(s.n, 8_000_000_000_000_000_000);
        assert_eq!(s.mean, Some(3.0));
        assert_eq!(s.std, Some(2.0));

        let f = freq(&[("Poor", i64::MAX), ("Weak", i64::MAX), ("Excellent", i64::MAX)]);
        let s = summarize(Statistic::OverallQuality, &f);
        assert_eq!(s.n, u64::MAX);
        assert!(s.mean.is_some_and(|m| (m - 8.0 / 3.0).abs() < 0.01));
    }

    #[test]
    fn periods_are_sorted_and_distinct() {
        let a = quality("EN.601.226.01.FA22", &[]);
        let b = quality("EN.601.226.01.SP23", &[]);
        let c = quality("EN.601.226.02.FA22", &[]);
        assert_eq!(periods_run(&[&a, &b, &c]), "FA22, SP23");
        let d = quality("EN.601.226.02", &[]);
        assert_eq!(periods_run(&[&d]), NO_PERIODS);
    }

    #[test]
    fn group_statistics_follow_request_order() {
        let a = quality("EN.601.226.01.FA22", &[("Good", 3)]);
        let stats = [
            Statistic::PeriodsRun,
            Statistic::Workload,
            Statistic::OverallQuality,
        ];
        let r = calculate_group_statistics(&[&a], &stats);
        assert_eq!(r.len(), 2);
        assert_eq!(r[0].value, StatValue::Periods("FA22".to_owned()));
        assert_eq!(r[0].detail, StatDetail { n: None, std: None });
        assert_eq!(r[1].stat, Statistic::OverallQuality);
        assert_eq!(r[1].value, StatValue::Mean(Some(4.0)));
        assert_eq!(
            r[1].detail,
            StatDetail {
                n: Some(3),
                std: Some(0.0)
            }
        );
        assert_eq!(calculate_group_statistics(&[&a], &stats), r);
    }

    #[test]
    fn empty_group_reports_no_responses() {
        let r = calculate_group_statistics(&[], &[Statistic::Workload, Statistic::PeriodsRun]);
        assert_eq!(r[0].value, StatValue::Mean(None));
        assert_eq!(r[0].detail, StatDetail { n: Some(0), std: None });
        assert_eq!(r[1].value, StatValue::Periods(NO_PERIODS.to_owned()));
    }

    #[test]
    fn present_but_empty_table_reports_no_responses() {
        let a = quality("EN.601.226.01.FA22", &[]);
        let r = calculate_group_statistics(&[&a], &[Statistic::OverallQuality]);
        assert_eq!(r[0].detail.n, Some(0));
        assert_eq!(r[0].value, StatValue::Mean(None));
    }
}
