use std::path::{Path, PathBuf};

use minijinja::{context, Environment, HtmlEscape};
use ram_core::models::Note;
use thiserror::Error;

pub const NOTES_LIST_TEMPLATE: &str = "notes-list.html";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Store(#[from] ram_core::Error),

    #[error("cannot read template {}: {source}", .path.display())]
    TemplateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

/// Renders `notes` through `<static_dir>/templates/notes-list.html`.
///
/// The template is read from disk on every call, so edits show up without a
/// restart.
pub fn notes_fragment(static_dir: &Path, notes: &[Note]) -> Result<String, RenderError> {
    let path = static_dir.join("templates").join(NOTES_LIST_TEMPLATE);
    let source = std::fs::read_to_string(&path)
        .map_err(|source| RenderError::TemplateFile { path, source })?;

    let mut env = Environment::new();
    env.add_template(NOTES_LIST_TEMPLATE, &source)?;
    let html = env
        .get_template(NOTES_LIST_TEMPLATE)?
        .render(context! { notes => notes })?;
    Ok(html)
}

/// Inline markup shown in place of the list when rendering fails.
pub fn error_snippet(err: &RenderError) -> String {
    format!("<div class='error'>ERROR: {}</div>", HtmlEscape(&err.to_string()))
}
