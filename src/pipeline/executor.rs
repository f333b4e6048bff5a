// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Build pipeline executor
//!
//! Runs the stage list in order, stopping at the first failure.

use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::{
    build_plan, BuildConfig, BuildPaths, DeterministicEnv, ExitPolicy, StageAction,
    StageDescriptor,
};
use crate::errors::{FreezeError, FreezeResult};
use crate::process::{CancelToken, Invocation, ProcessRunner};
use crate::rewriter::{rewrite_tree, RewriteReport};
use crate::stager::{GitFetcher, SourceFetcher, WorkspaceStager};

/// State of one build, filled in as stages complete
#[derive(Debug, Clone)]
pub struct BuildRun {
    /// Build root
    pub root: PathBuf,
    /// Absolute interpreter path, once resolved
    pub interpreter: Option<String>,
    /// Overlay for every process
    pub env: DeterministicEnv,
    /// Upstream revision, once staged
    pub revision: Option<String>,
    /// Present only after the freeze stage succeeded
    pub artifact: Option<PathBuf>,
    pub rewrite: Option<RewriteReport>,
    pub stages: Vec<StageRecord>,
}

/// How a stage finished
#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub name: String,
    pub duration_ms: u128,
    /// Exit code of an advisory stage that failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory_failure: Option<i32>,
}

/// Result of a successful build
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
    pub artifact: PathBuf,
    pub interpreter: String,
    pub revision: Option<String>,
    pub stages: Vec<StageRecord>,
    pub rewrite: Option<RewriteReport>,
    pub duration_ms: u128,
}

/// Sequences the build stages
pub struct BuildPipeline {
    config: BuildConfig,
    paths: BuildPaths,
    runner: Arc<dyn ProcessRunner>,
    stager: WorkspaceStager,
    progress: bool,
}

impl BuildPipeline {
    /// Create a pipeline that clones with git through `runner`
    pub fn new(config: BuildConfig, paths: BuildPaths, runner: Arc<dyn ProcessRunner>) -> Self {
        let fetcher = GitFetcher::new(runner.clone(), config.git.clone())
            .with_branch(config.source.branch.clone());

        Self {
            config,
            paths,
            runner,
            stager: WorkspaceStager::new(Arc::new(fetcher)),
            progress: true,
        }
    }

    /// Replace the source fetcher
    pub fn with_fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.stager = WorkspaceStager::new(fetcher);
        self
    }

    /// Print per-stage progress to stdout
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn paths(&self) -> &BuildPaths {
        &self.paths
    }

    /// The ordered stage list this pipeline runs
    pub fn plan(&self) -> Vec<StageDescriptor> {
        build_plan(&self.config)
    }

    /// Run every stage and return the artifact location.
    ///
    /// The first failing stage aborts the build; its error is returned
    /// wrapped with the stage name. Nothing is retried.
    pub async fn run(&self, cancel: &CancelToken) -> FreezeResult<BuildOutcome> {
        let start = Instant::now();
        let plan = self.plan();

        let mut run = BuildRun {
            root: self.paths.staging_root.clone(),
            interpreter: None,
            env: DeterministicEnv::default(),
            revision: None,
            artifact: None,
            rewrite: None,
            stages: Vec::with_capacity(plan.len()),
        };

        info!(root = %run.root.display(), stages = plan.len(), "starting build");

        for (i, stage) in plan.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(FreezeError::Cancelled.in_stage(stage.name));
            }

            if self.progress {
                println!("  {} [{}/{}] {}", "→".blue(), i + 1, plan.len(), stage.name.bold());
            }

            let stage_start = Instant::now();
            let result = self.run_stage(stage, &mut run, cancel).await;
            let elapsed = stage_start.elapsed();

            match result {
                Ok(advisory_failure) => {
                    if self.progress {
                        self.print_done(stage, elapsed, advisory_failure);
                    }
                    run.stages.push(StageRecord {
                        name: stage.name.to_string(),
                        duration_ms: elapsed.as_millis(),
                        advisory_failure,
                    });
                }
                Err(e) => {
                    if self.progress {
                        println!("  {} {} failed", "✗".red(), stage.name.bold());
                    }
                    return Err(e.in_stage(stage.name));
                }
            }
        }

        let artifact = run.artifact.take().ok_or_else(|| FreezeError::InvalidConfig {
            reason: "the stage list has no freeze stage".to_string(),
            help: None,
        })?;
        let duration = start.elapsed();

        info!(artifact = %artifact.display(), seconds = duration.as_secs_f64(), "build finished");

        Ok(BuildOutcome {
            artifact,
            interpreter: run.interpreter.unwrap_or_default(),
            revision: run.revision,
            stages: run.stages,
            rewrite: run.rewrite,
            duration_ms: duration.as_millis(),
        })
    }

    /// Run a single stage; returns the exit code of a tolerated failure
    async fn run_stage(
        &self,
        stage: &StageDescriptor,
        run: &mut BuildRun,
        cancel: &CancelToken,
    ) -> FreezeResult<Option<i32>> {
        match &stage.action {
            StageAction::ConfigureEnvironment => {
                run.env = DeterministicEnv::new(self.config.epoch).with_extra(&self.config.env);
                info!(vars = ?run.env.vars(), "configured deterministic environment");
                Ok(None)
            }

            StageAction::ResolveInterpreter => {
                let resolved = self.resolve_interpreter(&run.env, cancel).await?;
                info!(interpreter = %resolved, "resolved interpreter");
                run.interpreter = Some(resolved);
                Ok(None)
            }

            StageAction::StageWorkspace => {
                let staged = self
                    .stager
                    .stage_reproducible(
                        &self.config.source.url,
                        &self.paths.scratch_dir,
                        &run.root,
                        self.config.epoch,
                        cancel,
                    )
                    .await?;
                run.revision = staged.revision;
                Ok(None)
            }

            StageAction::Interpreter { args } => {
                self.run_interpreter(stage, args, run, cancel).await
            }

            StageAction::Freeze { args } => {
                let advisory_failure = self.run_interpreter(stage, args, run, cancel).await?;
                run.artifact = Some(self.config.artifact_path(&run.root));
                Ok(advisory_failure)
            }

            StageAction::RewriteImports { dir } => {
                let report = rewrite_tree(&run.root.join(dir)).await?;
                if !report.is_clean() {
                    warn!(
                        failed = report.failures.len(),
                        "some files could not be rewritten; the freeze may miss imports"
                    );
                }
                info!(
                    scanned = report.scanned,
                    rewritten = report.rewritten.len(),
                    lines = report.lines_changed,
                    "rewrote imports"
                );
                run.rewrite = Some(report);
                Ok(None)
            }
        }
    }

    /// Run the resolved interpreter in the build root under the stage's
    /// exit policy
    async fn run_interpreter(
        &self,
        stage: &StageDescriptor,
        args: &[String],
        run: &BuildRun,
        cancel: &CancelToken,
    ) -> FreezeResult<Option<i32>> {
        let interpreter = run
            .interpreter
            .as_deref()
            .unwrap_or(self.config.interpreter.as_str());
        let invocation = Invocation::new(interpreter)
            .args(args.iter().cloned())
            .current_dir(&run.root)
            .envs(run.env.vars());

        let output = self.runner.run(&invocation, cancel).await?;

        match stage.policy {
            ExitPolicy::Fatal => {
                output.ensure_success(interpreter)?;
                Ok(None)
            }
            ExitPolicy::Advisory if !output.success() => {
                warn!(
                    stage = stage.name,
                    code = ?output.code(),
                    "advisory stage failed; continuing"
                );
                Ok(Some(output.code().unwrap_or(-1)))
            }
            ExitPolicy::Advisory => Ok(None),
        }
    }

    /// Ask the interpreter where it lives, so later calls are unambiguous
    async fn resolve_interpreter(
        &self,
        env: &DeterministicEnv,
        cancel: &CancelToken,
    ) -> FreezeResult<String> {
        let program = self.config.interpreter.as_str();
        let invocation = Invocation::new(program)
            .args(["-c", "import sys; print(sys.executable)"])
            .envs(env.vars())
            .quiet();

        let output = self.runner.run(&invocation, cancel).await?.ensure_success(program)?;

        let path = output
            .lines
            .iter()
            .rev()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
            .map(str::to_string);

        match path {
            Some(p) if Path::new(&p).is_absolute() => Ok(p),
            other => Err(FreezeError::InvalidConfig {
                reason: format!(
                    "'{}' did not report an absolute executable path (got {:?})",
                    program, other
                ),
                help: Some("Set `interpreter` to a working Python 3 interpreter".into()),
            }),
        }
    }

    fn print_done(
        &self,
        stage: &StageDescriptor,
        elapsed: Duration,
        advisory_failure: Option<i32>,
    ) {
        match advisory_failure {
            None => println!(
                "  {} {} ({:.2}s)",
                "✓".green(),
                stage.name.bold(),
                elapsed.as_secs_f64()
            ),
            Some(code) => println!(
                "  {} {} {}",
                "⚠".yellow(),
                stage.name.bold(),
                format!("(exit {}, continuing)", code).dimmed()
            ),
        }
    }

    /// Print the execution plan
    pub fn print_plan(&self) {
        let plan = self.plan();

        println!();
        println!("{}: {}", "Source".bold(), self.config.source.url);
        println!("{}: {}", "Build root".bold(), self.paths.staging_root.display());
        println!("{}", "═".repeat(50));
        println!(
            "Execution plan ({} stage{}):",
            plan.len(),
            if plan.len() == 1 { "" } else { "s" }
        );
        println!();

        for (i, stage) in plan.iter().enumerate() {
            print!("  {}. {} ", i + 1, stage.name.bold());
            print!("{}", stage.describe(&self.config.interpreter).dimmed());
            if stage.policy == ExitPolicy::Advisory {
                print!(" {}", "[advisory]".yellow());
            }
            println!();
        }

        println!();
        println!(
            "{}: {}",
            "Artifact".bold(),
            self.config.artifact_path(&self.paths.staging_root).display()
        );
    }
}
