//! Writing results.

use crate::errors::Result;
use crate::summary::{StatResult, StatValue};
use serde::Serialize;
use std::{error, fs, io};

#[derive(Serialize)]
pub struct OError {
    pub error: String,
}

pub fn write_json<T: Serialize>(filename: &str, value: &T, compact: bool) -> Result<()> {
    let file = fs::File::create(filename)?;
    let writer = io::BufWriter::new(file);
    if compact {
        serde_json::to_writer(writer, value)?;
    } else {
        serde_json::to_writer_pretty(writer, value)?;
    }
    Ok(())
}

pub fn store_error(filename: &str, e: &dyn error::Error) -> Result<()> {
    let error = OError {
        error: format!("{e}"),
    };
    write_json(filename, &error, true)
}

/// One statistic for humans, e.g. `4.75 ± 0.50 (n = 4)`.
pub fn pretty_stat(r: &StatResult) -> String {
    match &r.value {
        StatValue::Mean(Some(mean)) => format!(
            "{:.2} ± {:.2} (n = {})",
            mean,
            r.detail.std.unwrap_or(0.0),
            r.detail.n.unwrap_or(0)
        ),
        StatValue::Mean(None) => "no responses".to_owned(),
        StatValue::Periods(periods) => periods.clone(),
    }
}
