// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Plan command - show the stage list

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{load_config, OutputFormat};
use crate::pipeline::{BuildPaths, BuildPipeline, StageDescriptor};
use crate::process::TokioProcessRunner;

#[derive(Serialize)]
struct PlanReport<'a> {
    source: &'a str,
    paths: &'a BuildPaths,
    artifact: PathBuf,
    stages: Vec<PlanStage<'a>>,
}

#[derive(Serialize)]
struct PlanStage<'a> {
    #[serde(flatten)]
    stage: &'a StageDescriptor,
    command: String,
}

/// Run the plan command
pub async fn run(config_path: PathBuf, format: OutputFormat, _verbose: bool) -> Result<()> {
    let pipeline = pipeline(&config_path)?;
    print_plan(&pipeline, format)
}

pub(crate) fn pipeline(config_path: &Path) -> Result<BuildPipeline> {
    let config = load_config(config_path)?;
    let paths = config.paths()?;
    Ok(BuildPipeline::new(config, paths, Arc::new(TokioProcessRunner::new())))
}

pub(crate) fn print_plan(pipeline: &BuildPipeline, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => pipeline.print_plan(),
        OutputFormat::Json => {
            let plan = pipeline.plan();
            let interpreter = &pipeline.config().interpreter;
            let report = PlanReport {
                source: &pipeline.config().source.url,
                paths: pipeline.paths(),
                artifact: pipeline.config().artifact_path(&pipeline.paths().staging_root),
                stages: plan
                    .iter()
                    .map(|stage| PlanStage {
                        stage,
                        command: stage.describe(interpreter),
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
    }
    Ok(())
}
