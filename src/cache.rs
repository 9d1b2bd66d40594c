//! Read-through cache of raw datasets, kept by whoever calls the engine.
//!
//! The engine itself is stateless. Changing filters, groups, or statistics
//! only needs a recalculation over the dataset already fetched for the
//! course; selecting another course or asking for a recheck needs a fetch.

use crate::engine::{self, AnalysisRequest, AnalysisResponse};
use crate::errors::Result;
use log::{debug, info, warn};
use serde_json::Value;
use std::path::PathBuf;
use std::{fs, mem};

/// Where raw datasets come from.
pub trait DatasetSource {
    /// Raw dataset JSON for `course`.
    ///
    /// With `recheck`, the source should look for newly released periods
    /// before answering.
    fn fetch(&mut self, course: &str, recheck: bool) -> Result<Value>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum CacheState {
    Empty,
    Loaded { course: String, raw: Value },
    Stale { course: String },
}

pub struct DatasetCache<S> {
    source: S,
    state: CacheState,
    fetches: u64,
}

impl<S: DatasetSource> DatasetCache<S> {
    pub fn new(source: S) -> DatasetCache<S> {
        DatasetCache {
            source,
            state: CacheState::Empty,
            fetches: 0,
        }
    }

    pub fn state(&self) -> &CacheState {
        &self.state
    }

    /// Number of fetches made so far.
    pub fn fetches(&self) -> u64 {
        self.fetches
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Force the next analysis to fetch.
    pub fn invalidate(&mut self) {
        self.state = match mem::replace(&mut self.state, CacheState::Empty) {
            CacheState::Loaded { course, .. } | CacheState::Stale { course } => {
                CacheState::Stale { course }
            }
            CacheState::Empty => CacheState::Empty,
        };
    }

    /// Analyse `course`, reusing the cached dataset when it belongs to the
    /// same course.
    ///
    /// If the cached dataset cannot be analysed, it is fetched again and
    /// analysed once more; only that second failure is reported.
    pub fn analyze(&mut self, course: &str, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        let local = match &self.state {
            CacheState::Loaded { course: c, raw } if c == course => {
                Some(engine::process_raw(raw, request))
            }
            _ => None,
        };
        match local {
            Some(Ok(response)) => {
                debug!(target: "coursestats", "{course}: analysed cached dataset");
                return Ok(response);
            }
            Some(Err(e)) => {
                warn!(target: "coursestats", "{course}: cached dataset unusable ({e}), fetching again");
            }
            None => (),
        }
        self.invalidate();
        self.fetch_and_analyze(course, false, request)
    }

    /// Ask the source to look for new data for `course`, then analyse it.
    pub fn recheck(&mut self, course: &str, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        self.invalidate();
        self.fetch_and_analyze(course, true, request)
    }

    fn fetch_and_analyze(
        &mut self,
        course: &str,
        recheck: bool,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResponse> {
        info!(target: "coursestats", "{course}: fetching{}", if recheck { " (recheck)" } else { "" });
        let raw = self.source.fetch(course, recheck)?;
        self.fetches += 1;
        let response = engine::process_raw(&raw, request)?;
        self.state = CacheState::Loaded {
            course: course.to_owned(),
            raw,
        };
        Ok(response)
    }
}

/// Datasets stored as `<dir>/<course>.json`, either bare or wrapped under `raw_data`.
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> DirectorySource {
        DirectorySource { dir: dir.into() }
    }
}

impl DatasetSource for DirectorySource {
    fn fetch(&mut self, course: &str, recheck: bool) -> Result<Value> {
        let mut path = self.dir.clone();
        path.push(format!("{course}.json"));
        if recheck {
            debug!(target: "coursestats", "{course}: files have no newer periods to look for");
        }
        info!(target: "coursestats", "read: {}", path.display());
        let data = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
