// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! The fixed stage list
//!
//! A build is a static, ordered list of stage descriptors. Nothing is added,
//! skipped or repeated at run time; the only branching is on exit status.

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::BuildConfig;

/// What a non-zero exit from a stage means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitPolicy {
    /// Abort the build
    Fatal,
    /// Log and continue
    Advisory,
}

/// What a stage does
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageAction {
    /// Build the deterministic variable set
    ConfigureEnvironment,
    /// Ask the interpreter for its absolute path
    ResolveInterpreter,
    /// Reproducible clone and copy into the build root
    StageWorkspace,
    /// Run the resolved interpreter in the build root
    Interpreter { args: Vec<String> },
    /// Rewrite relative imports under a directory of the build root
    RewriteImports { dir: PathBuf },
    /// Run the freeze tool through the interpreter; produces the artifact
    Freeze { args: Vec<String> },
}

/// One step of the build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageDescriptor {
    pub name: &'static str,
    pub action: StageAction,
    pub policy: ExitPolicy,
}

impl StageDescriptor {
    fn fatal(name: &'static str, action: StageAction) -> Self {
        Self {
            name,
            action,
            policy: ExitPolicy::Fatal,
        }
    }

    fn interpreter<I, S>(name: &'static str, args: I, policy: ExitPolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name,
            action: StageAction::Interpreter {
                args: args.into_iter().map(Into::into).collect(),
            },
            policy,
        }
    }

    /// One-line summary for plans and progress output
    pub fn describe(&self, interpreter: &str) -> String {
        match &self.action {
            StageAction::ConfigureEnvironment => {
                "pin SOURCE_DATE_EPOCH and PYTHONHASHSEED".to_string()
            }
            StageAction::ResolveInterpreter => format!("locate {}", interpreter),
            StageAction::StageWorkspace => "clone and copy into the build root".to_string(),
            StageAction::Interpreter { args } | StageAction::Freeze { args } => {
                format!("{} {}", interpreter, args.join(" "))
            }
            StageAction::RewriteImports { dir } => {
                format!("rewrite relative imports in {}", dir.display())
            }
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Build the ordered stage list for a configuration
pub fn build_plan(config: &BuildConfig) -> Vec<StageDescriptor> {
    let diagnostics = if config.provision.advisory_diagnostics {
        ExitPolicy::Advisory
    } else {
        ExitPolicy::Fatal
    };

    let mut plan = vec![
        StageDescriptor::fatal("configure-environment", StageAction::ConfigureEnvironment),
        StageDescriptor::fatal("resolve-interpreter", StageAction::ResolveInterpreter),
        StageDescriptor::fatal("stage-workspace", StageAction::StageWorkspace),
        StageDescriptor::interpreter(
            "upgrade-pip",
            ["-m", "pip", "install", "--upgrade", "pip"],
            ExitPolicy::Fatal,
        ),
        StageDescriptor::interpreter(
            "install-pip-review",
            ["-m", "pip", "install", "pip-review"],
            diagnostics,
        ),
        StageDescriptor::interpreter("site-diagnostics", ["-m", "site"], diagnostics),
    ];

    if config.provision.upgrade_installed {
        plan.push(StageDescriptor::interpreter(
            "upgrade-installed",
            ["-m", "pip_review", "--local", "--auto"],
            diagnostics,
        ));
    }

    plan.push(StageDescriptor::interpreter(
        "install-toolchain",
        ["-m", "pip", "install", "setuptools", "wheel", "build", "PyInstaller"],
        ExitPolicy::Fatal,
    ));
    plan.push(StageDescriptor::interpreter(
        "install-requirements",
        vec![
            "-m".to_string(),
            "pip".to_string(),
            "install".to_string(),
            "-r".to_string(),
            path_arg(&config.project.requirements),
        ],
        ExitPolicy::Fatal,
    ));
    plan.push(StageDescriptor::interpreter(
        "build-distributions",
        vec![
            path_arg(&config.project.setup_script),
            "sdist".to_string(),
            "bdist_wheel".to_string(),
        ],
        ExitPolicy::Fatal,
    ));
    plan.push(StageDescriptor::fatal(
        "rewrite-imports",
        StageAction::RewriteImports {
            dir: config.project.package_dir.clone(),
        },
    ));
    plan.push(StageDescriptor::fatal(
        "freeze",
        StageAction::Freeze {
            args: freeze_args(config),
        },
    ));

    plan
}

fn freeze_args(config: &BuildConfig) -> Vec<String> {
    let mut args: Vec<String> = ["-m", "PyInstaller", "--onefile", "--clean", "--noconfirm"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    if let Some(ref name) = config.freeze.name {
        args.push("--name".to_string());
        args.push(name.clone());
    }
    if let Some(ref key) = config.freeze.key {
        args.push("--key".to_string());
        args.push(key.clone());
    }
    if config.freeze.no_upx {
        args.push("--noupx".to_string());
    }

    args.push(path_arg(&config.project.entry_script));
    args
}
