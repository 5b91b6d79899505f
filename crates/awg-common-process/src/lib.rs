// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Runs the external tools enrollment depends on (`awg`, `ip`) with a hard
//! upper bound on how long each invocation may take. Enrollment holds the
//! gateway lock while these run, so a hung child must never block other
//! enrollments indefinitely.

mod error;
mod run;

pub use error::CommandError;
pub use run::{probe_command, run_command, CommandSpec};
