use crate::MasterVarStore;
use crate::SaveOutcome;
use crate::SyncConfig;
use crate::SyncVarResult;
use crate::TargetFile;
use crate::engine::replace_all;
use crate::persist::save_target_files;
use crate::template::parse_target_files;

/// Counts gathered by a successful validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationSummary {
	/// Number of master variables across all environments.
	pub master_vars: usize,
	/// Number of target files scanned.
	pub target_files: usize,
	/// Number of marker lines found across all target files.
	pub markers: usize,
}

/// Master variables and validated target files for one run.
#[derive(Debug, Clone)]
pub struct SyncContext {
	pub store: MasterVarStore,
	pub files: Vec<TargetFile>,
}

impl SyncContext {
	/// Validate the configuration, parse every master file, then scan and
	/// validate every target file.
	pub fn load(config: &SyncConfig) -> SyncVarResult<Self> {
		config.validate()?;

		let store = MasterVarStore::load(&config.master_files)?;
		tracing::debug!(
			count = store.len(),
			environments = ?store.environments(),
			"loaded master variables"
		);

		let files = parse_target_files(&config.target_files, &config.marker, &store)?;

		Ok(Self { store, files })
	}

	pub fn summary(&self) -> ValidationSummary {
		ValidationSummary {
			master_vars: self.store.len(),
			target_files: self.files.len(),
			markers: self.files.iter().map(|file| file.lines.len()).sum(),
		}
	}
}

/// Check the configuration, master files, and target files without
/// rendering anything.
pub fn validate(config: &SyncConfig) -> SyncVarResult<ValidationSummary> {
	SyncContext::load(config).map(|ctx| ctx.summary())
}

/// Run the full pipeline: load, render every marker line, and persist
/// according to `config.save_options`.
pub fn sync(config: &SyncConfig) -> SyncVarResult<SaveOutcome> {
	let SyncContext { store, mut files } = SyncContext::load(config)?;

	let replaced = replace_all(&mut files, &store);
	tracing::debug!(replaced, "rendered marker lines");

	save_target_files(&files, &config.save_options)
}
