//! Instructor names.
//!
//! Names are scraped free text, and the same person is often spelled
//! differently from one period to the next ("J. Smith", "j smith"). All
//! spellings with the same [simplify] key are shown under the spelling used
//! in the most recent offering.

use crate::input::Instance;
use crate::period::Period;
use itertools::Itertools;
use std::collections::hash_map::Entry::{Occupied, Vacant};
use std::collections::{BTreeSet, HashMap};

const TITLES: [&str; 4] = ["Dr.", "Mr.", "Mrs.", "Ms."];

/// Letters only, lowercased.
pub fn simplify(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Simplified name to display name.
///
/// Offerings without an instructor name, or whose name has no letters at
/// all, do not take part. Among offerings with equal periods the first one
/// seen wins.
pub fn canonicalize<'a>(instances: &[&'a Instance]) -> HashMap<String, String> {
    let mut latest: HashMap<String, (Period, &'a str)> = HashMap::new();
    for &inst in instances {
        let Some(name) = inst.offering.instructor_name.as_deref() else {
            continue;
        };
        let simplified = simplify(name);
        if simplified.is_empty() {
            continue;
        }
        match latest.entry(simplified) {
            Vacant(e) => {
                e.insert((inst.period, name));
            }
            Occupied(mut e) => {
                if inst.period > e.get().0 {
                    e.insert((inst.period, name));
                }
            }
        }
    }
    latest
        .into_iter()
        .map(|(k, (_, name))| (k, name.to_owned()))
        .collect()
}

/// Display name for one offering's instructor, given the output of [canonicalize].
pub fn display_name<'a>(names: &'a HashMap<String, String>, name: Option<&'a str>) -> &'a str {
    match name {
        None | Some("") => "Unknown",
        Some(name) => names.get(&simplify(name)).map_or(name, String::as_str),
    }
}

fn last_name(full_name: &str) -> String {
    let name = full_name.trim();
    let name = TITLES
        .iter()
        .find_map(|t| {
            name.strip_prefix(*t)
                .filter(|rest| rest.starts_with(char::is_whitespace))
        })
        .unwrap_or(name);
    name.split_whitespace()
        .last()
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// All instructor spellings in the data that share a last name with `name`.
///
/// The result is sorted and always contains `name` itself.
pub fn instructor_variants(name: &str, instances: &[Instance]) -> Vec<String> {
    let target = last_name(name);
    if target.is_empty() {
        return vec![name.to_owned()];
    }
    let mut variants: BTreeSet<String> = instances
        .iter()
        .filter_map(|i| i.offering.instructor_name.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty() && last_name(n) == target)
        .map(str::to_owned)
        .collect();
    variants.insert(name.to_owned());
    variants.into_iter().collect_vec()
}
