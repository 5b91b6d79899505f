// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use console::style;

use awg_enroll::{EnrollError, EnrollFailure, EnrollmentReport, SyncOutcome};

pub fn print_report(report: &EnrollmentReport) {
	println!(
		"{} Client '{}' created successfully",
		style("✓").green().bold(),
		style(&report.client).cyan()
	);
	println!("  Config:     {}", report.client_config.display());
	println!("  IP:         {}", style(report.address).cyan());
	println!("  Endpoint:   {}", report.endpoint);
	println!("  Public Key: {}", style(&report.public_key).dim());

	match &report.sync {
		SyncOutcome::Applied { interface } => {
			println!("  Interface:  peer added to {}", style(interface).cyan());
		}
		SyncOutcome::Skipped => {
			println!("  Interface:  {}", style("not updated (sync disabled)").dim());
		}
		SyncOutcome::Failed { interface, reason } => {
			eprintln!(
				"{} Could not add peer to running interface {}: {}",
				style("!").yellow().bold(),
				interface,
				reason
			);
			eprintln!("  The peer becomes active the next time the interface is brought up.");
		}
	}
}

pub fn print_failure(failure: &EnrollFailure) {
	eprintln!(
		"{} Failed to enroll '{}' during {}: {}",
		style("✗").red().bold(),
		failure.client,
		failure.step,
		failure.source
	);
	if let Some(hint) = hint(&failure.source) {
		eprintln!("  {}", style(hint).dim());
	}
}

pub fn print_error(error: &anyhow::Error) {
	eprintln!("{} {error:#}", style("✗").red().bold());
}

fn hint(error: &EnrollError) -> Option<&'static str> {
	match error {
		EnrollError::NotInitialized { .. } => Some("Please start the server first."),
		EnrollError::DuplicateClient { .. } => Some("Pick another name; existing clients are never overwritten."),
		EnrollError::ExternalCall(_) | EnrollError::ExternalCallTimeout(_) => {
			Some("Check that the awg tools are installed, or use --key-backend native.")
		}
		EnrollError::AddressSpaceExhausted(_) => Some("The tunnel network has no free addresses left."),
		_ => None,
	}
}
