//! One run of the merge-and-derive pipeline.
//!
//! Ingestors → registry → name matcher / county resolver → aggregator and
//! score engine → assembler. Every phase reads only what earlier phases
//! produced; the registry lives for exactly one run.

use crate::aggregate::state_averages;
use crate::assemble::{Assembler, OutputDocument};
use crate::county::CountyResolver;
use crate::error::Result;
use crate::ingest::{ActIngestor, GraduationIngestor, IngestStats, Ingestor, ReadyGradIngestor};
use crate::matcher::{MatchReport, NameMatcher};
use crate::models::{Config, MetaConfig, TrackedYears};
use crate::registry::SchoolRegistry;
use crate::score::{ScoreEngine, ScoreWeights};
use crate::source::{CsvSource, TabularSource};
use std::time::Instant;

/// A tabular source holding one year of a keyed feed.
pub struct YearlySource {
    pub year: String,
    pub source: Box<dyn TabularSource>,
}

impl YearlySource {
    pub fn new(year: impl Into<String>, source: impl TabularSource + 'static) -> Self {
        Self {
            year: year.into(),
            source: Box::new(source),
        }
    }
}

/// All inputs of a run. Yearly lists are ordered oldest first.
pub struct PipelineSources {
    pub graduation: Vec<YearlySource>,
    pub ready_grad: Vec<YearlySource>,
    pub act: Vec<YearlySource>,
    pub college_going: Box<dyn TabularSource>,
}

impl PipelineSources {
    /// CSV-backed sources at the paths named in `config`.
    pub fn from_config(config: &Config) -> Self {
        let yearly = |files: &[crate::models::SourceFile]| -> Vec<YearlySource> {
            files
                .iter()
                .map(|f| YearlySource::new(f.year.clone(), CsvSource::new(&f.path)))
                .collect()
        };

        Self {
            graduation: yearly(&config.graduation_sources),
            ready_grad: yearly(&config.ready_grad_sources),
            act: yearly(&config.act_sources),
            college_going: Box::new(CsvSource::new(&config.college_going_source.path)),
        }
    }

    pub fn tracked_years(&self, college_going_years: &[String]) -> TrackedYears {
        let years = |sources: &[YearlySource]| -> Vec<String> {
            sources.iter().map(|s| s.year.clone()).collect()
        };
        TrackedYears {
            graduation: years(&self.graduation),
            ready_grad: years(&self.ready_grad),
            college_going: college_going_years.to_vec(),
            act: years(&self.act),
        }
    }
}

/// Counters collected while building the registry.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub graduation: IngestStats,
    pub ready_grad: IngestStats,
    pub act: IngestStats,
    pub matches: MatchReport,
    pub counties_resolved: usize,
}

pub struct PipelineRun {
    pub document: OutputDocument,
    pub report: RunReport,
}

pub struct Pipeline {
    student_group: String,
    college_going_years: Vec<String>,
    meta: MetaConfig,
    weights: ScoreWeights,
}

impl Pipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            student_group: config.student_group.clone(),
            college_going_years: config.college_going_years.clone(),
            meta: config.meta.clone(),
            weights: ScoreWeights::default(),
        }
    }

    fn ingest_feed(
        &self,
        ingestor: &dyn Ingestor,
        sources: &[YearlySource],
        registry: &mut SchoolRegistry,
    ) -> Result<IngestStats> {
        let mut total = IngestStats::default();
        for yearly in sources {
            let table = yearly.source.load()?;
            let stats = ingestor.ingest(&table, &yearly.year, registry)?;
            log::info!(
                "   {} {}: {} rows ingested, {} skipped, {} outside slice",
                ingestor.name(),
                yearly.year,
                stats.ingested,
                stats.skipped,
                stats.filtered
            );
            total.ingested += stats.ingested;
            total.skipped += stats.skipped;
            total.filtered += stats.filtered;
        }
        Ok(total)
    }

    /// Run every ingestion and enrichment phase, returning the populated registry.
    pub fn build_registry(&self, sources: &PipelineSources) -> Result<(SchoolRegistry, RunReport)> {
        let mut registry = SchoolRegistry::new();
        let mut report = RunReport::default();
        let group = self.student_group.clone();

        log::info!("[1/4] Loading graduation rates...");
        report.graduation = self.ingest_feed(
            &GraduationIngestor { student_group: group.clone() },
            &sources.graduation,
            &mut registry,
        )?;
        log::info!("   Loaded {} schools", registry.len());

        log::info!("[2/4] Loading ready graduate rates...");
        report.ready_grad = self.ingest_feed(
            &ReadyGradIngestor { student_group: group.clone() },
            &sources.ready_grad,
            &mut registry,
        )?;

        log::info!("[3/4] Loading ACT scores...");
        report.act = self.ingest_feed(&ActIngestor { student_group: group }, &sources.act, &mut registry)?;
        log::info!("   Registry holds {} schools", registry.len());

        log::info!("[4/4] Matching college-going rates...");
        let college_going = sources.college_going.load()?;
        let resolver = CountyResolver::from_table(&college_going);
        report.matches = NameMatcher::new(self.college_going_years.clone()).match_rows(&college_going, &mut registry)?;
        log::info!(
            "   Matched {} rows, {} unmatched, {} skipped",
            report.matches.matched,
            report.matches.unmatched.len(),
            report.matches.skipped
        );

        log::info!("Assigning counties from {} known districts...", resolver.len());
        report.counties_resolved = resolver.resolve(&mut registry);
        log::info!("   Resolved {} counties", report.counties_resolved);

        Ok((registry, report))
    }

    pub fn run(&self, sources: &PipelineSources) -> Result<PipelineRun> {
        let started = Instant::now();
        let years = sources.tracked_years(&self.college_going_years);
        let (registry, report) = self.build_registry(sources)?;

        log::info!("Calculating state averages...");
        let averages = state_averages(&registry, &years);

        log::info!("Building final school list...");
        let engine = ScoreEngine::new(self.weights, years.clone());
        let assembler = Assembler::new(engine, years, self.meta.clone());
        let document = assembler.assemble(&registry, averages);
        log::info!(
            "Final count: {} schools in {} counties ({:?})",
            document.state.schools_count,
            document.state.counties_count,
            started.elapsed()
        );

        Ok(PipelineRun { document, report })
    }
}
