// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! # freezerun - reproducible single-executable builds
//!
//! `freezerun` clones a Python project, provisions its dependencies and
//! freezes it into one executable, removing the usual sources of build
//! nondeterminism along the way.
//!
//! ## Features
//!
//! - **Reproducible staging** - Clone into scratch, copy into a fixed build
//!   root without VCS metadata, timestamps pinned
//! - **Deterministic environment** - `SOURCE_DATE_EPOCH` and
//!   `PYTHONHASHSEED` on every child process, parent untouched
//! - **Import rewriting** - Package-relative imports made absolute so the
//!   frozen entry script resolves them
//! - **Cancellable** - Ctrl-C stops the running child
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a default configuration
//! freezerun init
//!
//! # Show the stages
//! freezerun plan
//!
//! # Build
//! freezerun build
//! ```

pub mod artifact;
pub mod cli;
pub mod errors;
pub mod pipeline;
pub mod process;
pub mod publish;
pub mod rewriter;
pub mod stager;

// Re-export commonly used types
pub use errors::{FreezeError, FreezeResult};
pub use pipeline::{BuildConfig, BuildOutcome, BuildPipeline};
pub use process::{CancelToken, Invocation, ProcessRunner, TokioProcessRunner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
