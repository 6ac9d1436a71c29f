//! Statewide per-year averages across every registry record.

use crate::models::{SchoolRecord, TrackedYears};
use crate::parse::round1;
use crate::registry::SchoolRegistry;
use serde::Serialize;
use std::collections::BTreeMap;

/// Year → mean value. Years without a single contributing school are absent.
pub type YearAverages = BTreeMap<String, f64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StateAverages {
    pub graduation: YearAverages,
    pub ready_grad: YearAverages,
    pub college_going: YearAverages,
    pub act: YearAverages,
}

fn average_by_year<F>(registry: &SchoolRegistry, years: &[String], value: F) -> YearAverages
where
    F: Fn(&SchoolRecord, &str) -> Option<f64>,
{
    years
        .iter()
        .filter_map(|year| {
            let values: Vec<f64> = registry.iter().filter_map(|r| value(r, year.as_str())).collect();
            mean(&values).map(|avg| (year.clone(), avg))
        })
        .collect()
}

/// Arithmetic mean rounded to one decimal, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    Some(round1(avg))
}

pub fn state_averages(registry: &SchoolRegistry, years: &TrackedYears) -> StateAverages {
    StateAverages {
        graduation: average_by_year(registry, &years.graduation, SchoolRecord::graduation_rate),
        ready_grad: average_by_year(registry, &years.ready_grad, SchoolRecord::ready_grad_rate),
        college_going: average_by_year(registry, &years.college_going, SchoolRecord::college_going_rate),
        act: average_by_year(registry, &years.act, SchoolRecord::act_composite),
    }
}
