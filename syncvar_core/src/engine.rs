use crate::MasterVar;
use crate::MasterVarStore;
use crate::TargetFile;
use crate::Template;

/// Render every marker line of every file. Returns the number of lines that
/// received a replacement.
pub fn replace_all(files: &mut [TargetFile], store: &MasterVarStore) -> usize {
	files
		.iter_mut()
		.map(|file| replace_target_lines(file, store))
		.sum()
}

/// Render each marker line of `file` whose template references at least one
/// known master variable. Lines without any match, and a marker on the last
/// line of the file, keep `None` and are skipped when writing.
pub fn replace_target_lines(file: &mut TargetFile, store: &MasterVarStore) -> usize {
	let mut replaced = 0;

	for line in &mut file.lines {
		if !line.has_target_line {
			tracing::warn!(
				path = %file.path.display(),
				line = line.marker_line_number,
				"marker has no following line to render"
			);
			continue;
		}

		let Ok(template) = line.template(&file.marker) else {
			continue;
		};

		let Some(rendered) = render_template(&template, store) else {
			tracing::debug!(
				path = %file.path.display(),
				line = line.marker_line_number,
				"no master variable matches marker template"
			);
			continue;
		};

		if line.set_replacement(rendered) {
			replaced += 1;
		}
	}

	replaced
}

/// Substitute each placeholder token, exactly as written in the template,
/// with its master value. Escaped `\{{ ... }}` sequences are left alone.
/// Returns `None` when no placeholder matches a master variable.
pub fn render_template(template: &Template, store: &MasterVarStore) -> Option<String> {
	let matches = corresponding_vars(template, store);
	if matches.iter().all(Option::is_none) {
		return None;
	}

	let mut rendered = String::with_capacity(template.text.len());
	let mut last = 0;

	for (placeholder, var) in template.placeholders.iter().zip(&matches) {
		rendered.push_str(&template.text[last..placeholder.span.start]);
		match var {
			Some(var) => rendered.push_str(&var.value),
			None => rendered.push_str(&template.text[placeholder.span.clone()]),
		}
		last = placeholder.span.end;
	}

	rendered.push_str(&template.text[last..]);
	Some(rendered)
}

/// The master variable referenced by each placeholder, in placeholder order.
/// A bare `{{ KEY }}` placeholder is already normalized to the `default`
/// environment, so it matches default variables only.
fn corresponding_vars<'a>(
	template: &Template,
	store: &'a MasterVarStore,
) -> Vec<Option<&'a MasterVar>> {
	template
		.placeholders
		.iter()
		.map(|placeholder| store.get(&placeholder.environment, &placeholder.key))
		.collect()
}
