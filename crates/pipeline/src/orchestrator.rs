//! Three-stage pipeline contract and the usage pipeline built on it.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use analytics_core::{Error, Result};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use duckdb_client::{DuckDbStore, WriteMode, WriteSummary};
use serde::Serialize;
use sqlserver_client::SourceReader;
use telemetry::{metrics, MetricsSnapshot};
use tracing::{error, info, info_span, Instrument};

use crate::engine::{self, DerivedTables, EngineInputs};
use crate::extract::{self, Extracts};
use crate::load;

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extracting,
    Transforming,
    Loading,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extracting => "extracting",
            Stage::Transforming => "transforming",
            Stage::Loading => "loading",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed: Duration,
}

/// Successful run.
#[derive(Debug, Clone)]
pub struct RunReport<T> {
    pub pipeline: String,
    pub timings: Vec<StageTiming>,
    pub elapsed: Duration,
    pub output: T,
    /// Process metrics as of the end of the run.
    pub metrics: MetricsSnapshot,
}

/// A failed run: the stage that raised, the stages that completed before it,
/// and the underlying error.
#[derive(Debug, thiserror::Error)]
#[error("pipeline failed while {stage} after {elapsed:?}: {source}")]
pub struct RunFailure {
    pub stage: Stage,
    pub elapsed: Duration,
    pub completed: Vec<StageTiming>,
    #[source]
    pub source: Error,
    pub metrics: MetricsSnapshot,
}

/// Fixed extract -> transform -> load contract.
///
/// `run` executes the stages strictly in order, times each one, and stops at
/// the first failure. Nothing is retried between stages.
#[async_trait]
pub trait Pipeline: Send + Sync {
    type Extracted: Send;
    type Transformed: Send;
    type Loaded: Send;

    fn name(&self) -> &str;

    async fn extract(&self) -> Result<Self::Extracted>;

    fn transform(&self, extracted: Self::Extracted) -> Result<Self::Transformed>;

    fn load(&self, transformed: Self::Transformed) -> Result<Self::Loaded>;

    async fn run(&self) -> std::result::Result<RunReport<Self::Loaded>, RunFailure> {
        let started = Instant::now();
        let mut timings = Vec::with_capacity(3);
        metrics().runs_started.inc();
        info!(pipeline = self.name(), "Pipeline run starting");

        let stage_start = Instant::now();
        let outcome = self
            .extract()
            .instrument(info_span!("stage", stage = %Stage::Extracting))
            .await;
        let extracted = finish_stage(Stage::Extracting, stage_start, started, &mut timings, outcome)?;

        let stage_start = Instant::now();
        let outcome = {
            let _span = info_span!("stage", stage = %Stage::Transforming).entered();
            self.transform(extracted)
        };
        let transformed = finish_stage(Stage::Transforming, stage_start, started, &mut timings, outcome)?;

        let stage_start = Instant::now();
        let outcome = {
            let _span = info_span!("stage", stage = %Stage::Loading).entered();
            self.load(transformed)
        };
        let output = finish_stage(Stage::Loading, stage_start, started, &mut timings, outcome)?;

        let elapsed = started.elapsed();
        metrics().runs_succeeded.inc();
        let snapshot = metrics().snapshot();
        info!(
            pipeline = self.name(),
            elapsed_ms = elapsed.as_millis() as u64,
            metrics = ?snapshot,
            "Pipeline run succeeded"
        );

        Ok(RunReport {
            pipeline: self.name().to_string(),
            timings,
            elapsed,
            output,
            metrics: snapshot,
        })
    }
}

fn finish_stage<T>(
    stage: Stage,
    stage_start: Instant,
    run_start: Instant,
    timings: &mut Vec<StageTiming>,
    outcome: Result<T>,
) -> std::result::Result<T, RunFailure> {
    let elapsed = stage_start.elapsed();
    let elapsed_ms = elapsed.as_millis() as u64;
    let timer = match stage {
        Stage::Extracting => &metrics().extract_ms,
        Stage::Transforming => &metrics().transform_ms,
        Stage::Loading => &metrics().load_ms,
    };
    timer.observe(elapsed_ms);

    match outcome {
        Ok(value) => {
            info!(%stage, elapsed_ms, "Stage complete");
            timings.push(StageTiming { stage, elapsed });
            Ok(value)
        }
        Err(e) => {
            metrics().runs_failed.inc();
            let snapshot = metrics().snapshot();
            error!(
                %stage,
                elapsed_ms,
                kind = e.kind(),
                error = %e,
                metrics = ?snapshot,
                "Stage failed"
            );
            Err(RunFailure {
                stage,
                elapsed: run_start.elapsed(),
                completed: timings.clone(),
                source: e,
                metrics: snapshot,
            })
        }
    }
}

/// Run parameters for the usage pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub target_date: NaiveDate,
    /// Pull the whole history instead of the lookback window.
    pub full_refresh: bool,
    pub lookback_days: u32,
    /// First day counted toward the fixed retention denominator.
    pub retention_baseline: NaiveDate,
    pub write_mode: WriteMode,
}

impl PipelineOptions {
    pub fn new(target_date: NaiveDate, retention_baseline: NaiveDate) -> Self {
        Self {
            target_date,
            full_refresh: false,
            lookback_days: 90,
            retention_baseline,
            write_mode: WriteMode::Replace,
        }
    }

    pub fn full_refresh(mut self, full_refresh: bool) -> Self {
        self.full_refresh = full_refresh;
        self
    }

    pub fn lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    /// `target_date - lookback_days` for incremental runs, `None` for full refreshes.
    pub fn start_date(&self) -> Result<Option<NaiveDate>> {
        if self.full_refresh {
            return Ok(None);
        }
        self.target_date
            .checked_sub_days(Days::new(u64::from(self.lookback_days)))
            .map(Some)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "lookback of {} days underflows target date {}",
                    self.lookback_days, self.target_date
                ))
            })
    }
}

/// The workforce usage pipeline: source extracts in, derived tables stored.
pub struct UsagePipeline<S: ?Sized> {
    source: Arc<S>,
    store: Arc<DuckDbStore>,
    options: PipelineOptions,
}

impl<S: SourceReader + ?Sized> UsagePipeline<S> {
    pub fn new(source: Arc<S>, store: Arc<DuckDbStore>, options: PipelineOptions) -> Self {
        Self {
            source,
            store,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }
}

#[async_trait]
impl<S: SourceReader + ?Sized> Pipeline for UsagePipeline<S> {
    type Extracted = Extracts;
    type Transformed = DerivedTables;
    type Loaded = Vec<WriteSummary>;

    fn name(&self) -> &str {
        "usage"
    }

    async fn extract(&self) -> Result<Extracts> {
        let start_date = self.options.start_date()?;
        info!(
            target_date = %self.options.target_date,
            start_date = ?start_date,
            full_refresh = self.options.full_refresh,
            "Extracting source data"
        );
        extract::extract(self.source.as_ref(), self.options.target_date, start_date).await
    }

    fn transform(&self, extracted: Extracts) -> Result<DerivedTables> {
        let inputs = EngineInputs::from_extracts(&extracted)?;
        let derived = engine::transform(
            &inputs,
            self.options.target_date,
            self.options.retention_baseline,
        )?;
        info!(rows = derived.row_count(), "Derived tables computed");
        Ok(derived)
    }

    fn load(&self, derived: DerivedTables) -> Result<Vec<WriteSummary>> {
        load::load(&self.store, &derived, self.options.write_mode)
    }
}
