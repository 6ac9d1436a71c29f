//! The school registry: one canonical record per composite key.

use crate::models::{SchoolKey, SchoolRecord};
use std::collections::HashMap;

/// Records are kept in first-sighting order, which every later phase
/// relies on for deterministic iteration.
#[derive(Debug, Default)]
pub struct SchoolRegistry {
    records: Vec<SchoolRecord>,
    index: HashMap<SchoolKey, usize>,
}

impl SchoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the record for `key`, creating it with the given display
    /// names when absent. Names of an existing record are never replaced.
    pub fn upsert(&mut self, key: SchoolKey, district: &str, school: &str) -> &mut SchoolRecord {
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                self.records.push(SchoolRecord::new(key, district, school));
                let position = self.records.len() - 1;
                self.index.insert(key, position);
                position
            }
        };
        &mut self.records[position]
    }

    pub fn get(&self, key: &SchoolKey) -> Option<&SchoolRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchoolRecord> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SchoolRecord> {
        self.records.iter_mut()
    }

    /// Record at `position` in first-sighting order.
    pub fn get_by_position_mut(&mut self, position: usize) -> Option<&mut SchoolRecord> {
        self.records.get_mut(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GraduationStat;

    #[test]
    fn test_upsert_creates_once() {
        let mut registry = SchoolRegistry::new();
        let key = SchoolKey::new(10, 5);
        registry.upsert(key, "Alpha County", "Alpha High");
        registry.upsert(key, "Renamed District", "Renamed High");

        assert_eq!(registry.len(), 1);
        let record = registry.get(&key).unwrap();
        assert_eq!(record.school, "Alpha High");
        assert_eq!(record.district, "Alpha County");
        assert_eq!(record.county, None);
        assert_eq!(record.key().to_string(), "10-5");
    }

    #[test]
    fn test_metric_writes_are_last_write_wins() {
        let mut registry = SchoolRegistry::new();
        let key = SchoolKey::new(1, 1);
        registry.upsert(key, "D", "S").graduation.insert(
            "2024".to_string(),
            GraduationStat { rate: Some(80.0), cohort: Some(100) },
        );
        registry.upsert(key, "D", "S").graduation.insert(
            "2024".to_string(),
            GraduationStat { rate: Some(82.0), cohort: Some(101) },
        );

        assert_eq!(registry.get(&key).unwrap().graduation_rate("2024"), Some(82.0));
    }

    #[test]
    fn test_iteration_follows_first_sighting() {
        let mut registry = SchoolRegistry::new();
        registry.upsert(SchoolKey::new(9, 1), "D", "Zeta");
        registry.upsert(SchoolKey::new(1, 1), "D", "Alpha");
        registry.upsert(SchoolKey::new(9, 1), "D", "Zeta");

        let names: Vec<_> = registry.iter().map(|r| r.school.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }
}
