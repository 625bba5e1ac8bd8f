//! PhD Application Auto-Pilot
//!
//! Scans academic RSS and Atom feeds for PhD opportunities, scores them
//! against a research profile, ranks them in a CSV dashboard, and drafts
//! cover letter templates. Feed URLs and identifiers are pseudonymised
//! before they reach logs or output files.

pub mod dashboard;
pub mod error;
pub mod feed;
pub mod letter;
pub mod logging;
pub mod opportunity;
pub mod privacy;
pub mod runner;
pub mod scanner;
pub mod scoring;
pub mod settings;
pub mod ui;
pub mod workspace;
