use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use syncvar_cli::Commands;
use syncvar_cli::DEFAULT_CONFIG_FILE;
use syncvar_cli::INIT_TEMPLATE;
use syncvar_cli::SyncVarCli;
use syncvar_cli::load_config;
use syncvar_core::DiffReport;
use syncvar_core::SaveOptions;
use syncvar_core::SaveOutcome;
use syncvar_core::SyncVarError;
use tracing_subscriber::EnvFilter;

/// Exit status used when the run is interrupted with Ctrl+C.
const INTERRUPTED_EXIT_CODE: i32 = 130;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,cyan) => {
		if color_enabled() {
			format!("{}", $text.cyan())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = SyncVarCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.wrap_lines(false)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	if let Err(e) = ctrlc::set_handler(|| {
		eprintln!("\n{}", colored!("Interrupted.", yellow));
		process::exit(INTERRUPTED_EXIT_CODE);
	}) {
		tracing::debug!(error = %e, "could not install interrupt handler");
	}

	let result = match &args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Validate) => run_validate(&args),
		Some(Commands::Sync {
			dry_run,
			output_dir,
			no_backup,
		}) => {
			let options = SaveOptions {
				dry_run: *dry_run,
				output_dir: output_dir.clone(),
				no_backup: *no_backup,
			};
			run_sync(&args, options)
		}
		None => {
			eprintln!("No subcommand specified. Run `sync-var --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		match e.downcast::<SyncVarError>() {
			Ok(sync_err) => {
				let report: miette::Report = (*sync_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(1);
	}
}

/// Log to stderr. `RUST_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let level = if verbose { "debug" } else { "warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.without_time()
		.init();
}

fn current_dir() -> PathBuf {
	std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn run_init(args: &SyncVarCli) -> Result<(), Box<dyn std::error::Error>> {
	let output_path = args
		.config
		.clone()
		.unwrap_or_else(|| current_dir().join(DEFAULT_CONFIG_FILE));

	if output_path.exists() {
		return Err(SyncVarError::ConfigExists(output_path.display().to_string()).into());
	}

	std::fs::write(&output_path, INIT_TEMPLATE)?;
	println!(
		"Created configuration file: {}",
		colored!(output_path.display(), cyan)
	);

	Ok(())
}

fn run_validate(args: &SyncVarCli) -> Result<(), Box<dyn std::error::Error>> {
	let config = load_config(
		args.config.as_deref(),
		&current_dir(),
		SaveOptions::default(),
	)?;
	let summary = syncvar_core::validate(&config)?;

	println!(
		"{} ({} master variable(s), {} target file(s), {} marker(s))",
		colored!("Validation completed successfully.", green),
		summary.master_vars,
		summary.target_files,
		summary.markers,
	);

	Ok(())
}

fn run_sync(args: &SyncVarCli, options: SaveOptions) -> Result<(), Box<dyn std::error::Error>> {
	let config = load_config(args.config.as_deref(), &current_dir(), options)?;

	match syncvar_core::sync(&config)? {
		SaveOutcome::Diff(report) => {
			println!("{}", colored!("Dry run mode:", yellow));
			print_report(&report);
		}
		SaveOutcome::Written(actions) => {
			if actions.is_empty() {
				println!("No target files were modified.");
			}
			for action in &actions {
				println!("{action}");
			}
			println!("{}", colored!("Target files saved.", green));
		}
	}

	Ok(())
}

/// Print every changed line of a dry run, colorized.
fn print_report(report: &DiffReport) {
	if report.is_empty() {
		print!("{report}");
		return;
	}

	let root = current_dir();
	for file in &report.files {
		println!();
		println!("{}", colored!(make_relative(&file.path, &root), bold));
		for change in &file.changes {
			println!("  Line {}:", change.line_number);
			print_diff(&format!("{}\n", change.before), &format!("{}\n", change.after));
		}
	}

	println!();
	println!(
		"{} line(s) in {} file(s) would change.",
		report.change_count(),
		report.files.len()
	);
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				print!("    {}", colored!(format!("- {change}"), red));
			}
			ChangeTag::Insert => {
				print!("    {}", colored!(format!("+ {change}"), green));
			}
			ChangeTag::Equal => {
				print!("      {change}");
			}
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
