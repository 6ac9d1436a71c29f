//! Ingestors for the three keyed yearly feeds.
//!
//! Each feed hard-codes its own column names; all of them filter to one
//! demographic slice, derive the composite key, and write that year's
//! bundle into the matching map of the record.

use crate::error::Result;
use crate::models::{ActStat, GraduationStat, ReadyGradStat, SchoolKey};
use crate::parse::{parse_code, parse_count, parse_rate};
use crate::registry::SchoolRegistry;
use crate::source::{Row, Table};

/// Row counts for one ingested table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub ingested: usize,
    pub skipped: usize,
    pub filtered: usize,
}

/// Column names identifying a school in a keyed feed.
struct KeyColumns {
    system: &'static str,
    system_name: &'static str,
    school: &'static str,
    school_name: &'static str,
    group: &'static str,
}

impl KeyColumns {
    fn all(&self) -> [&'static str; 5] {
        [self.system, self.system_name, self.school, self.school_name, self.group]
    }
}

const STATE_KEY_COLUMNS: KeyColumns = KeyColumns {
    system: "system",
    system_name: "system_name",
    school: "school",
    school_name: "school_name",
    group: "student_group",
};

const ACT_KEY_COLUMNS: KeyColumns = KeyColumns {
    system: "District",
    system_name: "District Name",
    school: "School",
    school_name: "School Name",
    group: "Subgroup",
};

const COHORT_COLUMN: &str = "grad_cohort_state";
const COHORT_FALLBACK_COLUMN: &str = "grad_cohort";

/// One keyed yearly feed.
pub trait Ingestor {
    fn name(&self) -> &'static str;

    fn ingest(&self, table: &Table, year: &str, registry: &mut SchoolRegistry) -> Result<IngestStats>;
}

/// Drive `write` for every in-slice row of `table` that carries a usable key.
fn ingest_rows<F>(
    table: &Table,
    columns: &KeyColumns,
    value_columns: &[&str],
    student_group: &str,
    registry: &mut SchoolRegistry,
    mut write: F,
) -> Result<IngestStats>
where
    F: FnMut(&Row<'_>, &mut crate::models::SchoolRecord),
{
    table.require_columns(&columns.all())?;
    table.require_columns(value_columns)?;

    let mut stats = IngestStats::default();
    for row in table.rows() {
        if row.get(columns.group).map(str::trim) != Some(student_group) {
            stats.filtered += 1;
            continue;
        }

        let system = row.get(columns.system).and_then(parse_code);
        let school = row.get(columns.school).and_then(parse_code);
        let (Some(system), Some(school)) = (system, school) else {
            log::debug!("Skipping row without a usable key in {}", table.name());
            stats.skipped += 1;
            continue;
        };

        let record = registry.upsert(
            SchoolKey::new(system, school),
            row.get(columns.system_name).unwrap_or_default().trim(),
            row.get(columns.school_name).unwrap_or_default().trim(),
        );
        write(&row, record);
        stats.ingested += 1;
    }

    Ok(stats)
}

fn rate(row: &Row<'_>, column: &str) -> Option<f64> {
    row.get(column).and_then(parse_rate)
}

fn count(row: &Row<'_>, column: &str) -> Option<i64> {
    row.get(column).and_then(parse_count)
}

/// Four-year graduation rates.
pub struct GraduationIngestor {
    pub student_group: String,
}

impl Ingestor for GraduationIngestor {
    fn name(&self) -> &'static str {
        "graduation"
    }

    fn ingest(&self, table: &Table, year: &str, registry: &mut SchoolRegistry) -> Result<IngestStats> {
        // The cohort column was renamed between releases
        let cohort_column = if table.has_column(COHORT_COLUMN) {
            COHORT_COLUMN
        } else {
            COHORT_FALLBACK_COLUMN
        };

        ingest_rows(
            table,
            &STATE_KEY_COLUMNS,
            &["grad_rate_state", cohort_column],
            &self.student_group,
            registry,
            |row, record| {
                record.graduation.insert(
                    year.to_string(),
                    GraduationStat {
                        rate: rate(row, "grad_rate_state"),
                        cohort: count(row, cohort_column),
                    },
                );
            },
        )
    }
}

/// Ready Graduate rates.
pub struct ReadyGradIngestor {
    pub student_group: String,
}

impl Ingestor for ReadyGradIngestor {
    fn name(&self) -> &'static str {
        "ready_grad"
    }

    fn ingest(&self, table: &Table, year: &str, registry: &mut SchoolRegistry) -> Result<IngestStats> {
        ingest_rows(
            table,
            &STATE_KEY_COLUMNS,
            &["pct_ready_grad", "n_count"],
            &self.student_group,
            registry,
            |row, record| {
                record.ready_grad.insert(
                    year.to_string(),
                    ReadyGradStat {
                        rate: rate(row, "pct_ready_grad"),
                        count: count(row, "n_count"),
                    },
                );
            },
        )
    }
}

/// ACT subject and composite averages.
pub struct ActIngestor {
    pub student_group: String,
}

impl Ingestor for ActIngestor {
    fn name(&self) -> &'static str {
        "act"
    }

    fn ingest(&self, table: &Table, year: &str, registry: &mut SchoolRegistry) -> Result<IngestStats> {
        ingest_rows(
            table,
            &ACT_KEY_COLUMNS,
            &[
                "Average Composite Score",
                "Average English Score",
                "Average Math Score",
                "Average Reading Score",
                "Average Science Score",
                "Percent Scoring 21 or Higher",
                "Valid Tests",
            ],
            &self.student_group,
            registry,
            |row, record| {
                record.act.insert(
                    year.to_string(),
                    ActStat {
                        composite: rate(row, "Average Composite Score"),
                        english: rate(row, "Average English Score"),
                        math: rate(row, "Average Math Score"),
                        reading: rate(row, "Average Reading Score"),
                        science: rate(row, "Average Science Score"),
                        pct_21_plus: rate(row, "Percent Scoring 21 or Higher"),
                        tested: count(row, "Valid Tests"),
                    },
                );
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graduation() -> GraduationIngestor {
        GraduationIngestor {
            student_group: "All Students".to_string(),
        }
    }

    #[test]
    fn test_graduation_filters_slice_and_parses() {
        let table = Table::from_rows(
            "grad_2025",
            &["system", "system_name", "school", "school_name", "student_group", "grad_rate_state", "grad_cohort_state"],
            &[
                &["190", "Davidson County", "25", "Hillsboro High", "All Students", "91.26", "300"],
                &["190", "Davidson County", "25", "Hillsboro High", "Black or African American", "85", "90"],
                &["190", "Davidson County", "30", "Glencliff High", "All Students", "*", "*"],
            ],
        );
        let mut registry = SchoolRegistry::new();
        let stats = graduation().ingest(&table, "2025", &mut registry).unwrap();

        assert_eq!(stats, IngestStats { ingested: 2, skipped: 0, filtered: 1 });
        let hillsboro = registry.get(&SchoolKey::new(190, 25)).unwrap();
        assert_eq!(hillsboro.graduation["2025"], GraduationStat { rate: Some(91.3), cohort: Some(300) });
        let glencliff = registry.get(&SchoolKey::new(190, 30)).unwrap();
        assert_eq!(glencliff.graduation["2025"], GraduationStat { rate: None, cohort: None });
    }

    #[test]
    fn test_graduation_falls_back_to_older_cohort_column() {
        let table = Table::from_rows(
            "grad_2023",
            &["system", "system_name", "school", "school_name", "student_group", "grad_rate_state", "grad_cohort"],
            &[&["10", "Anderson County", "5", "Clinton High", "All Students", "88", "210"]],
        );
        let mut registry = SchoolRegistry::new();
        graduation().ingest(&table, "2023", &mut registry).unwrap();

        let record = registry.get(&SchoolKey::new(10, 5)).unwrap();
        assert_eq!(record.graduation["2023"].cohort, Some(210));
    }

    #[test]
    fn test_rows_without_key_are_skipped() {
        let table = Table::from_rows(
            "rg_2024",
            &["system", "system_name", "school", "school_name", "student_group", "pct_ready_grad", "n_count"],
            &[
                &["", "Ghost District", "1", "Ghost High", "All Students", "40", "10"],
                &["12", "Real District", "2", "Real High", "All Students", "40", "10"],
            ],
        );
        let mut registry = SchoolRegistry::new();
        let ingestor = ReadyGradIngestor {
            student_group: "All Students".to_string(),
        };
        let stats = ingestor.ingest(&table, "2024", &mut registry).unwrap();

        assert_eq!(stats.skipped, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_required_column_is_an_error() {
        let table = Table::from_rows("rg", &["system", "school"], &[]);
        let mut registry = SchoolRegistry::new();
        let ingestor = ReadyGradIngestor {
            student_group: "All Students".to_string(),
        };
        assert!(ingestor.ingest(&table, "2024", &mut registry).is_err());
    }

    #[test]
    fn test_act_feed_can_create_schools() {
        let table = Table::from_rows(
            "act_2025",
            &[
                "District", "District Name", "School", "School Name", "Subgroup",
                "Average Composite Score", "Average English Score", "Average Math Score",
                "Average Reading Score", "Average Science Score", "Percent Scoring 21 or Higher", "Valid Tests",
            ],
            &[&["470", "Knox County", "8", "Farragut High", "All Students", "23.4", "23", "22.1", "24", "23.2", "61.5", "410"]],
        );
        let mut registry = SchoolRegistry::new();
        let ingestor = ActIngestor {
            student_group: "All Students".to_string(),
        };
        ingestor.ingest(&table, "2025", &mut registry).unwrap();

        let record = registry.get(&SchoolKey::new(470, 8)).unwrap();
        assert_eq!(record.school, "Farragut High");
        assert_eq!(record.act_composite("2025"), Some(23.4));
        assert_eq!(record.act["2025"].tested, Some(410));
    }
}
