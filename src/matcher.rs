//! Name-based join of the college-going feed onto the registry.
//!
//! The college-going source has no numeric key, so rows are matched on the
//! upper-cased, trimmed school and district names. Matching is exact and
//! the first registry record (in first-sighting order) carrying a given
//! name pair wins; later duplicates are reported but never matched.

use crate::error::Result;
use crate::models::CollegeGoingStat;
use crate::parse::{is_missing_marker, normalize_name, parse_percentage, title_case};
use crate::registry::SchoolRegistry;
use crate::source::Table;
use std::collections::HashMap;

pub const SCHOOL_COLUMN: &str = "High_School";
pub const DISTRICT_COLUMN: &str = "HS_District";
pub const COUNTY_COLUMN: &str = "HS_County";

pub fn rate_column(year: &str) -> String {
    format!("Class of {} CGR", year)
}

/// Outcome of one matching pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    pub matched: usize,
    pub skipped: usize,
    /// `"SCHOOL (DISTRICT)"` labels of rows with no registry counterpart
    pub unmatched: Vec<String>,
    /// Name pairs shared by more than one registry record
    pub ambiguous: usize,
}

/// Normalized (school, district) → registry position of the first record
/// carrying that pair.
struct NameIndex {
    positions: HashMap<(String, String), usize>,
    ambiguous: usize,
}

impl NameIndex {
    fn build(registry: &SchoolRegistry) -> Self {
        let mut positions = HashMap::new();
        let mut duplicated = HashMap::new();
        for (position, record) in registry.iter().enumerate() {
            let key = (normalize_name(&record.school), normalize_name(&record.district));
            if positions.contains_key(&key) {
                *duplicated.entry(key).or_insert(1usize) += 1;
            } else {
                positions.insert(key, position);
            }
        }

        for ((school, district), copies) in &duplicated {
            log::warn!(
                "{} registry records share the name {} ({}); only the first is matched",
                copies,
                school,
                district
            );
        }

        Self {
            positions,
            ambiguous: duplicated.len(),
        }
    }

    fn lookup(&self, school: &str, district: &str) -> Option<usize> {
        self.positions
            .get(&(school.to_string(), district.to_string()))
            .copied()
    }
}

pub struct NameMatcher {
    years: Vec<String>,
}

impl NameMatcher {
    pub fn new(years: Vec<String>) -> Self {
        Self { years }
    }

    /// Attach college-going rates and county labels from `table` to the
    /// matching registry records.
    pub fn match_rows(&self, table: &Table, registry: &mut SchoolRegistry) -> Result<MatchReport> {
        table.require_columns(&[SCHOOL_COLUMN, DISTRICT_COLUMN])?;

        let index = NameIndex::build(registry);
        let mut report = MatchReport {
            ambiguous: index.ambiguous,
            ..MatchReport::default()
        };

        for row in table.rows() {
            let school = normalize_name(row.get(SCHOOL_COLUMN).unwrap_or_default());
            let district = normalize_name(row.get(DISTRICT_COLUMN).unwrap_or_default());
            if is_missing_marker(&school) || is_missing_marker(&district) {
                report.skipped += 1;
                continue;
            }

            let Some(record) = index
                .lookup(&school, &district)
                .and_then(|position| registry.get_by_position_mut(position))
            else {
                log::debug!("No registry match for {} ({})", school, district);
                report.unmatched.push(format!("{} ({})", school, district));
                continue;
            };

            for year in &self.years {
                let column = rate_column(year);
                if let Some(rate) = row.get(&column).and_then(parse_percentage) {
                    record.college_going.insert(year.clone(), CollegeGoingStat { rate });
                }
            }

            let county = row.get(COUNTY_COLUMN).map(str::trim).unwrap_or_default();
            if !is_missing_marker(&normalize_name(county)) {
                record.county = Some(title_case(county));
            }
            report.matched += 1;
        }

        Ok(report)
    }
}
