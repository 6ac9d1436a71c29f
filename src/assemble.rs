//! Shapes eligible registry records into the output document and derives
//! the cross-school views: county rankings, top improvers, score summary.

use crate::aggregate::{mean, StateAverages};
use crate::models::{
    ActStat, CollegeGoingStat, GraduationStat, MetaConfig, ReadyGradStat, SchoolRecord, TrackedYears,
};
use crate::parse::{create_slug, round1};
use crate::registry::SchoolRegistry;
use crate::score::{LatestValues, ScoreEngine, ScoreWeights, Tier, Trend};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const UNKNOWN_COUNTY: &str = "Unknown";
pub const TOP_PER_COUNTY: usize = 3;
pub const TOP_IMPROVERS: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolOutput {
    pub school: String,
    pub district: String,
    pub county: String,
    pub system_code: u32,
    pub school_code: u32,
    pub slug: String,
    pub latest: LatestValues,
    pub graduation: BTreeMap<String, GraduationStat>,
    pub ready_grad: BTreeMap<String, ReadyGradStat>,
    pub college_going: BTreeMap<String, CollegeGoingStat>,
    pub act: BTreeMap<String, ActStat>,
    pub flight_score: Option<f64>,
    pub flight_tier: Tier,
    pub flight_tier_class: &'static str,
    pub trend: Trend,
    pub county_rank: Option<usize>,
    pub county_total: Option<usize>,
    pub is_top_county: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Improver {
    pub school: String,
    pub slug: String,
    pub county: String,
    pub district: String,
    pub change: f64,
    pub flight_score: Option<f64>,
    pub flight_tier: Tier,
    pub start_year: String,
    pub end_year: String,
    pub rg_start: Option<f64>,
    pub rg_end: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub average: Option<f64>,
    pub max: Option<f64>,
    pub min: Option<f64>,
    pub tier_counts: BTreeMap<&'static str, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSummary {
    pub schools_count: usize,
    pub counties_count: usize,
    pub averages: StateAverages,
    pub flight_score: ScoreSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDescriptions {
    pub graduation: &'static str,
    pub ready_grad: &'static str,
    pub college_going: &'static str,
    pub act: &'static str,
}

impl Default for MetricDescriptions {
    fn default() -> Self {
        Self {
            graduation: "Percentage of students who graduate within 4 years",
            ready_grad: "Percentage meeting Ready Graduate criteria (ACT 21+, industry cert, military, etc.)",
            college_going: "Percentage enrolled in postsecondary education within 1 year",
            act: "Average ACT composite score",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaMeta {
    #[serde(flatten)]
    pub weights: ScoreWeights,
    pub momentum_bonus: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierMeta {
    pub min: f64,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightScoreMeta {
    pub name: &'static str,
    pub description: &'static str,
    pub formula: FormulaMeta,
    pub tiers: BTreeMap<&'static str, TierMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meta {
    #[serde(flatten)]
    pub info: MetaConfig,
    pub metrics: MetricDescriptions,
    pub flight_score: FlightScoreMeta,
}

/// The single emitted artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputDocument {
    pub meta: Meta,
    pub state: StateSummary,
    pub top_improvers: Vec<Improver>,
    pub schools: Vec<SchoolOutput>,
}

pub struct Assembler {
    engine: ScoreEngine,
    years: TrackedYears,
    meta: MetaConfig,
}

impl Assembler {
    pub fn new(engine: ScoreEngine, years: TrackedYears, meta: MetaConfig) -> Self {
        Self { engine, years, meta }
    }

    /// A school is emitted only with a rate for the latest graduation or
    /// ready-grad year.
    pub fn is_eligible(&self, record: &SchoolRecord) -> bool {
        let has_grad = self
            .years
            .latest_graduation()
            .is_some_and(|y| record.graduation_rate(y).is_some());
        let has_ready = self
            .years
            .latest_ready_grad()
            .is_some_and(|y| record.ready_grad_rate(y).is_some());
        has_grad || has_ready
    }

    fn shape(&self, record: &SchoolRecord) -> SchoolOutput {
        let result = self.engine.evaluate(record);
        SchoolOutput {
            school: record.school.clone(),
            district: record.district.clone(),
            county: record.county.clone().unwrap_or_else(|| UNKNOWN_COUNTY.to_string()),
            system_code: record.system_code,
            school_code: record.school_code,
            slug: create_slug(&record.school),
            latest: result.latest,
            graduation: record.graduation.clone(),
            ready_grad: record.ready_grad.clone(),
            college_going: record.college_going.clone(),
            act: record.act.clone(),
            flight_score: result.score,
            flight_tier: result.tier,
            flight_tier_class: result.tier.class(),
            trend: result.trend,
            county_rank: None,
            county_total: None,
            is_top_county: false,
        }
    }

    /// Eligible schools, shaped, sorted by name, with county ranks filled in.
    pub fn schools(&self, registry: &SchoolRegistry) -> Vec<SchoolOutput> {
        let mut schools: Vec<SchoolOutput> = registry
            .iter()
            .filter(|r| self.is_eligible(r))
            .map(|r| self.shape(r))
            .collect();
        schools.sort_by(|a, b| a.school.cmp(&b.school));
        rank_within_counties(&mut schools);
        schools
    }

    pub fn top_improvers(&self, schools: &[SchoolOutput]) -> Vec<Improver> {
        let (start_year, end_year) = match self.years.ready_grad_span() {
            Some((start, end)) => (start.to_string(), end.to_string()),
            None => return Vec::new(),
        };

        let mut improvers: Vec<Improver> = schools
            .iter()
            .filter_map(|s| {
                let change = s.trend.change.filter(|c| *c > 0.0)?;
                Some(Improver {
                    school: s.school.clone(),
                    slug: s.slug.clone(),
                    county: s.county.clone(),
                    district: s.district.clone(),
                    change,
                    flight_score: s.flight_score,
                    flight_tier: s.flight_tier,
                    start_year: start_year.clone(),
                    end_year: end_year.clone(),
                    rg_start: s.ready_grad.get(&start_year).and_then(|r| r.rate),
                    rg_end: s.ready_grad.get(&end_year).and_then(|r| r.rate),
                })
            })
            .collect();

        improvers.sort_by(|a, b| b.change.total_cmp(&a.change));
        improvers.truncate(TOP_IMPROVERS);
        improvers
    }

    pub fn meta(&self) -> Meta {
        let tiers = Tier::ALL
            .iter()
            .filter_map(|tier| {
                tier.min_score()
                    .map(|min| (tier.key(), TierMeta { min, label: tier.label() }))
            })
            .collect();

        Meta {
            info: self.meta.clone(),
            metrics: MetricDescriptions::default(),
            flight_score: FlightScoreMeta {
                name: "Flight Score",
                description: "Score measuring how well a school prepares students for life after graduation",
                formula: FormulaMeta {
                    weights: *self.engine.weights(),
                    momentum_bonus: "+/- 5 points based on 2-year Ready Grad trend".to_string(),
                },
                tiers,
            },
        }
    }

    pub fn assemble(&self, registry: &SchoolRegistry, averages: StateAverages) -> OutputDocument {
        let schools = self.schools(registry);
        let top_improvers = self.top_improvers(&schools);
        let counties: BTreeSet<&str> = schools.iter().map(|s| s.county.as_str()).collect();

        let state = StateSummary {
            schools_count: schools.len(),
            counties_count: counties.len(),
            averages,
            flight_score: score_summary(&schools),
        };

        OutputDocument {
            meta: self.meta(),
            state,
            top_improvers,
            schools,
        }
    }
}

/// Rank scored schools within each county, best first. Unscored schools
/// keep no rank and are never featured.
pub fn rank_within_counties(schools: &mut [SchoolOutput]) {
    let mut by_county: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, school) in schools.iter().enumerate() {
        if school.flight_score.is_some() {
            by_county.entry(school.county.clone()).or_default().push(i);
        }
    }

    for members in by_county.values_mut() {
        // Stable: equal scores keep their alphabetical order
        members.sort_by(|&a, &b| {
            let score = |i: usize| schools[i].flight_score.unwrap_or_default();
            score(b).total_cmp(&score(a))
        });

        let total = members.len();
        for (rank, &i) in members.iter().enumerate() {
            schools[i].county_rank = Some(rank + 1);
            schools[i].county_total = Some(total);
            schools[i].is_top_county = rank < TOP_PER_COUNTY;
        }
    }
}

pub fn score_summary(schools: &[SchoolOutput]) -> ScoreSummary {
    let scores: Vec<f64> = schools.iter().filter_map(|s| s.flight_score).collect();

    let mut tier_counts: BTreeMap<&'static str, usize> =
        Tier::ALL.iter().map(|t| (t.key(), 0)).collect();
    for school in schools {
        *tier_counts.entry(school.flight_tier.key()).or_default() += 1;
    }

    ScoreSummary {
        average: mean(&scores),
        max: scores.iter().copied().reduce(f64::max).map(round1),
        min: scores.iter().copied().reduce(f64::min).map(round1),
        tier_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SchoolKey;

    fn school(name: &str, county: &str, score: Option<f64>) -> SchoolOutput {
        let tier = Tier::from_score(score);
        SchoolOutput {
            school: name.to_string(),
            district: "D".to_string(),
            county: county.to_string(),
            system_code: 1,
            school_code: 1,
            slug: create_slug(name),
            latest: LatestValues::default(),
            graduation: BTreeMap::new(),
            ready_grad: BTreeMap::new(),
            college_going: BTreeMap::new(),
            act: BTreeMap::new(),
            flight_score: score,
            flight_tier: tier,
            flight_tier_class: tier.class(),
            trend: Trend::from_change(None),
            county_rank: None,
            county_total: None,
            is_top_county: false,
        }
    }

    fn assembler() -> Assembler {
        Assembler::new(ScoreEngine::default(), TrackedYears::default(), MetaConfig::default())
    }

    #[test]
    fn test_county_ranking_features_top_three() {
        let mut schools = vec![
            school("A", "Knox", Some(60.0)),
            school("B", "Knox", Some(90.0)),
            school("C", "Knox", Some(75.0)),
            school("D", "Knox", None),
            school("E", "Knox", Some(40.0)),
            school("F", "Knox", Some(82.0)),
            school("G", "Knox", Some(51.0)),
            school("H", "Blount", Some(30.0)),
        ];
        rank_within_counties(&mut schools);

        let rank = |name: &str| schools.iter().find(|s| s.school == name).unwrap();
        assert_eq!(rank("B").county_rank, Some(1));
        assert_eq!(rank("F").county_rank, Some(2));
        assert_eq!(rank("C").county_rank, Some(3));
        assert_eq!(rank("A").county_rank, Some(4));
        assert_eq!(rank("E").county_rank, Some(6));
        assert_eq!(rank("B").county_total, Some(6));
        assert!(rank("C").is_top_county);
        assert!(!rank("A").is_top_county);
        assert_eq!(rank("D").county_rank, None);
        assert_eq!(rank("D").county_total, None);
        assert!(!rank("D").is_top_county);
        assert_eq!(rank("H").county_rank, Some(1));
        assert_eq!(rank("H").county_total, Some(1));
        assert!(rank("H").is_top_county);
    }

    #[test]
    fn test_score_summary() {
        let schools = vec![
            school("A", "X", Some(90.0)),
            school("B", "X", Some(41.0)),
            school("C", "X", None),
        ];
        let summary = score_summary(&schools);
        assert_eq!(summary.average, Some(65.5));
        assert_eq!(summary.max, Some(90.0));
        assert_eq!(summary.min, Some(41.0));
        assert_eq!(summary.tier_counts["elite"], 1);
        assert_eq!(summary.tier_counts["building"], 1);
        assert_eq!(summary.tier_counts["na"], 1);
        assert_eq!(summary.tier_counts["strong"], 0);

        let empty = score_summary(&[]);
        assert_eq!(empty.average, None);
        assert_eq!(empty.max, None);
    }

    #[test]
    fn test_top_improvers_sorted_and_truncated() {
        let mut schools: Vec<SchoolOutput> = (1..=20)
            .map(|i| {
                let mut s = school(&format!("School {:02}", i), "X", Some(50.0));
                s.trend = Trend::from_change(Some(i as f64));
                s
            })
            .collect();
        schools.push({
            let mut s = school("Decliner", "X", Some(50.0));
            s.trend = Trend::from_change(Some(-8.0));
            s
        });

        let improvers = assembler().top_improvers(&schools);
        assert_eq!(improvers.len(), TOP_IMPROVERS);
        assert_eq!(improvers[0].school, "School 20");
        assert_eq!(improvers[0].change, 20.0);
        assert_eq!(improvers[14].change, 6.0);
        assert!(improvers.iter().all(|i| i.school != "Decliner"));
    }

    #[test]
    fn test_eligibility_requires_latest_grad_or_ready_grad() {
        let assembler = assembler();
        let mut record = SchoolRecord::new(SchoolKey::new(1, 1), "D", "S");
        record.graduation.insert("2024".into(), GraduationStat { rate: Some(90.0), cohort: None });
        assert!(!assembler.is_eligible(&record));

        record.ready_grad.insert("2025".into(), ReadyGradStat { rate: Some(40.0), count: None });
        assert!(assembler.is_eligible(&record));
    }

    #[test]
    fn test_meta_lists_tiers_with_thresholds() {
        let meta = assembler().meta();
        assert_eq!(meta.flight_score.tiers.len(), 5);
        assert_eq!(meta.flight_score.tiers["elite"].min, 85.0);
        assert_eq!(meta.flight_score.tiers["grow"].label, "Room to Grow");
        assert_eq!(meta.flight_score.formula.weights.ready_grad_weight, 0.40);
    }
}
