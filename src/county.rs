//! Back-fill of county labels for records the name join did not reach.

use crate::matcher::{COUNTY_COLUMN, DISTRICT_COLUMN};
use crate::parse::{is_missing_marker, normalize_name, title_case};
use crate::registry::SchoolRegistry;
use crate::source::Table;
use std::collections::HashMap;

const COUNTY_WORD: &str = "COUNTY";

#[derive(Debug, Default)]
pub struct CountyResolver {
    /// Normalized district name → upper-cased county
    district_counties: HashMap<String, String>,
}

impl CountyResolver {
    /// Build the district → county table from every row of the
    /// college-going feed, matched or not. Later rows overwrite earlier ones.
    pub fn from_table(table: &Table) -> Self {
        let mut district_counties = HashMap::new();
        for row in table.rows() {
            let district = normalize_name(row.get(DISTRICT_COLUMN).unwrap_or_default());
            let county = normalize_name(row.get(COUNTY_COLUMN).unwrap_or_default());
            if !is_missing_marker(&district) && !is_missing_marker(&county) {
                district_counties.insert(district, county);
            }
        }
        Self { district_counties }
    }

    pub fn len(&self) -> usize {
        self.district_counties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.district_counties.is_empty()
    }

    /// County for a district: table lookup first, then the text preceding
    /// the word `COUNTY` in the district name.
    pub fn county_for(&self, district: &str) -> Option<String> {
        let district = normalize_name(district);
        if let Some(county) = self.district_counties.get(&district) {
            return Some(title_case(county));
        }

        let (prefix, _) = district.split_once(COUNTY_WORD)?;
        let prefix = prefix.trim();
        (!prefix.is_empty()).then(|| title_case(prefix))
    }

    /// Fill in every record still lacking a county. Returns how many were filled.
    pub fn resolve(&self, registry: &mut SchoolRegistry) -> usize {
        let mut resolved = 0;
        for record in registry.iter_mut().filter(|r| r.county.is_none()) {
            if let Some(county) = self.county_for(&record.district) {
                record.county = Some(county);
                resolved += 1;
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SchoolKey;

    fn resolver() -> CountyResolver {
        CountyResolver::from_table(&Table::from_rows(
            "cgr",
            &["High_School", "HS_District", "HS_County"],
            &[
                &["Any High", "Metro Nashville Public Schools", "DAVIDSON"],
                &["Other High", "Orphan District", "NAN"],
            ],
        ))
    }

    #[test]
    fn test_lookup_by_district_table() {
        assert_eq!(resolver().county_for(" metro nashville public schools"), Some("Davidson".to_string()));
        assert_eq!(resolver().len(), 1);
    }

    #[test]
    fn test_fallback_extracts_county_from_district_name() {
        assert_eq!(resolver().county_for("Van Buren County Schools"), Some("Van Buren".to_string()));
        assert_eq!(resolver().county_for("County Line Academy"), None);
        assert_eq!(resolver().county_for("Orphan District"), None);
    }

    #[test]
    fn test_resolve_leaves_existing_counties_alone() {
        let mut registry = SchoolRegistry::new();
        registry.upsert(SchoolKey::new(1, 1), "Wilson County", "A High").county = Some("Sumner".to_string());
        registry.upsert(SchoolKey::new(1, 2), "Wilson County", "B High");
        registry.upsert(SchoolKey::new(2, 1), "Special School District", "C High");

        let filled = resolver().resolve(&mut registry);

        assert_eq!(filled, 1);
        assert_eq!(registry.get(&SchoolKey::new(1, 1)).unwrap().county.as_deref(), Some("Sumner"));
        assert_eq!(registry.get(&SchoolKey::new(1, 2)).unwrap().county.as_deref(), Some("Wilson"));
        assert_eq!(registry.get(&SchoolKey::new(2, 1)).unwrap().county, None);
    }
}
