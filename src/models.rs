use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub output_path: String,
    pub student_group: String,
    // Yearly sources, oldest year first
    pub graduation_sources: Vec<SourceFile>,
    pub ready_grad_sources: Vec<SourceFile>,
    pub act_sources: Vec<SourceFile>,
    pub college_going_source: CollegeGoingSource,
    pub college_going_years: Vec<String>,
    pub meta: MetaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub year: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollegeGoingSource {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaConfig {
    pub title: String,
    pub description: String,
    pub source: String,
    pub updated: String,
    pub version: String,
}

impl Default for Config {
    fn default() -> Self {
        let yearly = |dir: &str, stem: &str| {
            ["2023", "2024", "2025"]
                .iter()
                .map(|year| SourceFile {
                    path: format!("data-source/{}/{}_{}.csv", dir, stem, year),
                    year: year.to_string(),
                })
                .collect::<Vec<_>>()
        };

        Self {
            output_path: "output/after-graduation-data.json".to_string(),
            student_group: "All Students".to_string(),
            graduation_sources: yearly("graduation", "school_grad_rate"),
            ready_grad_sources: yearly("ready-graduate", "ready_graduate_school"),
            act_sources: yearly("act", "act_school"),
            college_going_source: CollegeGoingSource {
                path: "data-source/college-going/cgr_by_hs_5_year.csv".to_string(),
            },
            college_going_years: ["2019", "2020", "2021", "2022", "2023"]
                .iter()
                .map(|y| y.to_string())
                .collect(),
            meta: MetaConfig::default(),
        }
    }
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            title: "What Happens After Graduation - High School Outcomes".to_string(),
            description: "Graduation rates, college readiness, college enrollment, and ACT scores for high schools".to_string(),
            source: "State Department of Education".to_string(),
            updated: "2025-01".to_string(),
            version: "3.0".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> crate::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }
}

/// Year labels per metric family, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedYears {
    pub graduation: Vec<String>,
    pub ready_grad: Vec<String>,
    pub college_going: Vec<String>,
    pub act: Vec<String>,
}

impl TrackedYears {
    pub fn latest_graduation(&self) -> Option<&str> {
        self.graduation.last().map(String::as_str)
    }

    pub fn latest_ready_grad(&self) -> Option<&str> {
        self.ready_grad.last().map(String::as_str)
    }

    /// Earliest and latest ready-grad years, the fixed pair used for momentum and trend.
    pub fn ready_grad_span(&self) -> Option<(&str, &str)> {
        match (self.ready_grad.first(), self.ready_grad.last()) {
            (Some(first), Some(last)) if first != last => Some((first.as_str(), last.as_str())),
            _ => None,
        }
    }
}

impl Default for TrackedYears {
    fn default() -> Self {
        let labels = |years: &[&str]| years.iter().map(|y| y.to_string()).collect::<Vec<_>>();
        Self {
            graduation: labels(&["2023", "2024", "2025"]),
            ready_grad: labels(&["2023", "2024", "2025"]),
            college_going: labels(&["2019", "2020", "2021", "2022", "2023"]),
            act: labels(&["2023", "2024", "2025"]),
        }
    }
}

/// Composite `system-school` identifier of a school.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchoolKey {
    pub system_code: u32,
    pub school_code: u32,
}

impl SchoolKey {
    pub fn new(system_code: u32, school_code: u32) -> Self {
        Self { system_code, school_code }
    }
}

impl fmt::Display for SchoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.system_code, self.school_code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GraduationStat {
    pub rate: Option<f64>,
    pub cohort: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReadyGradStat {
    pub rate: Option<f64>,
    pub count: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollegeGoingStat {
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActStat {
    pub composite: Option<f64>,
    pub english: Option<f64>,
    pub math: Option<f64>,
    pub reading: Option<f64>,
    pub science: Option<f64>,
    pub pct_21_plus: Option<f64>,
    pub tested: Option<i64>,
}

/// Canonical per-school record accumulated across all feeds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolRecord {
    pub system_code: u32,
    pub school_code: u32,
    pub district: String,
    pub school: String,
    pub county: Option<String>,
    pub graduation: BTreeMap<String, GraduationStat>,
    pub ready_grad: BTreeMap<String, ReadyGradStat>,
    pub college_going: BTreeMap<String, CollegeGoingStat>,
    pub act: BTreeMap<String, ActStat>,
}

impl SchoolRecord {
    pub fn new(key: SchoolKey, district: &str, school: &str) -> Self {
        Self {
            system_code: key.system_code,
            school_code: key.school_code,
            district: district.to_string(),
            school: school.to_string(),
            county: None,
            graduation: BTreeMap::new(),
            ready_grad: BTreeMap::new(),
            college_going: BTreeMap::new(),
            act: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> SchoolKey {
        SchoolKey::new(self.system_code, self.school_code)
    }

    pub fn graduation_rate(&self, year: &str) -> Option<f64> {
        self.graduation.get(year).and_then(|s| s.rate)
    }

    pub fn ready_grad_rate(&self, year: &str) -> Option<f64> {
        self.ready_grad.get(year).and_then(|s| s.rate)
    }

    pub fn college_going_rate(&self, year: &str) -> Option<f64> {
        self.college_going.get(year).map(|s| s.rate)
    }

    pub fn act_composite(&self, year: &str) -> Option<f64> {
        self.act.get(year).and_then(|s| s.composite)
    }
}
