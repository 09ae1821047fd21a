//! `syncvar_core` is the engine behind the `sync-var` command. Variables are
//! declared once per environment in master files and rendered into any text
//! file that carries a marker comment describing the line below it.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Master files (.env / .yaml)        Target files
//!   → MasterVarStore                   → Scanner (marker line + following line)
//!                      ↘             ↙
//!                  Template resolver (quoted template, {{ env.key }} placeholders,
//!                                     validation against master variables)
//!                    → Engine (substitute values, keep indentation)
//!                    → Persister (diff, output directory, or backup + overwrite)
//! ```
//!
//! ## Marker syntax
//!
//! ```text
//! # [sync-var] "port: {{ staging.PORT }}"
//! port: 8080
//! ```
//!
//! The line following the marker is replaced by the rendered template. A bare
//! `{{ KEY }}` placeholder refers to the `default` environment.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use std::collections::BTreeSet;
//! use std::path::PathBuf;
//!
//! use syncvar_core::SaveOptions;
//! use syncvar_core::SaveOutcome;
//! use syncvar_core::SyncConfig;
//!
//! let config = SyncConfig {
//! 	marker: syncvar_core::DEFAULT_MARKER.to_string(),
//! 	master_files: BTreeMap::from([("default".to_string(), PathBuf::from("default.env"))]),
//! 	target_files: BTreeSet::from([PathBuf::from("docker-compose.yaml")]),
//! 	save_options: SaveOptions {
//! 		dry_run: true,
//! 		..SaveOptions::default()
//! 	},
//! };
//!
//! if let SaveOutcome::Diff(report) = syncvar_core::sync(&config).unwrap() {
//! 	print!("{report}");
//! }
//! ```

pub use config::*;
pub use engine::*;
pub use error::*;
pub use master::*;
pub use persist::*;
pub use scanner::*;
pub use sync::*;
pub use template::*;

pub mod config;
mod engine;
#[allow(unused_assignments)]
mod error;
pub mod master;
pub mod persist;
pub mod scanner;
mod sync;
pub mod template;

#[cfg(test)]
mod __fixtures;
