// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Build pipeline
//!
//! Configuration, the fixed stage list, and the executor that runs it.

mod definition;
mod environment;
mod executor;
mod stages;
mod validation;

pub use definition::*;
pub use environment::{DeterministicEnv, PINNED_VARS};
pub use executor::{BuildOutcome, BuildPipeline, BuildRun, StageRecord};
pub use stages::{build_plan, ExitPolicy, StageAction, StageDescriptor};
pub use validation::{ConfigValidator, ValidationResult};
