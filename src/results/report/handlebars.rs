//! Handlebars page rendering module.

use crate::{
    error::ErrorKind,
    results::{utils::html_escape, Results},
};
use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use handlebars::Handlebars;
use log::debug;
use serde_json::json;
use std::{fs, path::Path};

/// Templates every templates folder must provide.
const REQUIRED_TEMPLATES: [&str; 2] = ["index", "report"];

/// Handlebars templates of the web pages.
pub struct Templates {
    /// Handlebars template structure.
    handler: Handlebars<'static>,
}

impl Templates {
    /// Loads the templates in the given folder.
    pub fn from_path<P: AsRef<Path>>(template_path: P) -> Result<Self> {
        let handler =
            Self::load_templates(template_path).context("could not load handlebars templates")?;

        Ok(Self { handler })
    }

    /// Loads templates from the given path.
    ///
    /// Every `.hbs` file is registered with its file stem as name, so it can also be used as a
    /// partial by the rest of the templates.
    fn load_templates<P: AsRef<Path>>(template_path: P) -> Result<Handlebars<'static>> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(|s| html_escape(s).into_owned());
        for dir_entry in fs::read_dir(template_path)? {
            let dir_entry = dir_entry?;
            if let Some(ext) = dir_entry.path().extension() {
                if ext == "hbs" {
                    let path = dir_entry.path();
                    let template_file = path
                        .file_stem()
                        .ok_or_else(|| anyhow!("template files must have a file name"))
                        .and_then(|stem| {
                            stem.to_str()
                                .ok_or_else(|| anyhow!("template names must be unicode"))
                        })?;

                    handlebars
                        .register_template_file(template_file, &path)
                        .context("error registering template file")?;
                    debug!("registered the `{}` template", template_file);
                }
            }
        }

        if REQUIRED_TEMPLATES
            .iter()
            .any(|name| handlebars.get_template(name).is_none())
        {
            bail!(ErrorKind::TemplateName {
                message: format!(
                    "templates must include {} and {} templates",
                    "index".italic(),
                    "report".italic()
                ),
            });
        }

        Ok(handlebars)
    }

    /// Renders the upload page, with an optional error message.
    pub fn render_index(&self, error: Option<&str>) -> Result<String> {
        self.handler
            .render("index", &json!({ "error": error }))
            .context("could not render the upload page")
    }

    /// Renders the result page of an analysis.
    pub fn render_report(&self, results: &Results) -> Result<String> {
        self.handler
            .render("report", results)
            .context("could not render the report page")
    }
}
