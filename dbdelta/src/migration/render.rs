use crate::common::Context;
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").ok());

/// Turns a template and a context into text.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, context: &Context) -> MigrationResult<String>;
}

/// Replaces `${key}` placeholders with context values.
///
/// Placeholders without a value are left as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderRenderer;

impl TemplateRenderer for PlaceholderRenderer {
    fn render(&self, template: &str, context: &Context) -> MigrationResult<String> {
        let pattern = PLACEHOLDER
            .as_ref()
            .ok_or_else(|| MigrationError::new(ErrorKind::Other, "placeholder pattern unavailable"))?;

        let rendered = pattern.replace_all(template, |caps: &Captures| {
            let key = &caps[1];
            match context.get(key) {
                Some(value) => value.to_string(),
                None => {
                    log::debug!("No value for placeholder '{}'", key);
                    caps[0].to_string()
                }
            }
        });
        Ok(rendered.into_owned())
    }
}

/// Indents every line after the first of `value` to the column at which
/// `${key}` sits in `template`.
///
/// Only applies when exactly one template line holds the placeholder; the
/// first line inherits the indentation from the template itself.
pub fn indent_placeholder_value(template: &str, key: &str, value: &str) -> String {
    let placeholder = format!("${{{}}}", key);
    let mut lines = template.lines().filter(|line| line.contains(&placeholder));
    let prefix = match (lines.next(), lines.next()) {
        (Some(line), None) => {
            let width = line.len() - line.trim_start().len();
            &line[..width]
        }
        _ => "",
    };

    if prefix.is_empty() {
        return value.to_string();
    }

    value
        .split('\n')
        .enumerate()
        .map(|(i, line)| {
            if i == 0 || line.is_empty() {
                line.to_string()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_known_keys() {
        let ctx = Context::new().with("moduleName", "Accounting").with("index", 1);
        let rendered = PlaceholderRenderer
            .render("-- ${moduleName} #${index} ${unknown}", &ctx)
            .unwrap();
        assert_eq!(rendered, "-- Accounting #1 ${unknown}");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let ctx = Context::new().with("a", "${b}").with("b", "x");
        assert_eq!(PlaceholderRenderer.render("${a}", &ctx).unwrap(), "${b}");
    }

    #[test]
    fn test_indent_placeholder_value() {
        let template = "BEGIN\n    ${scriptContents}\nEND\n";
        let indented = indent_placeholder_value(template, "scriptContents", "ALTER TABLE t\nADD c INT;");
        assert_eq!(indented, "ALTER TABLE t\n    ADD c INT;");

        let rendered = PlaceholderRenderer
            .render(template, &Context::new().with("scriptContents", indented))
            .unwrap();
        assert_eq!(rendered, "BEGIN\n    ALTER TABLE t\n    ADD c INT;\nEND\n");
    }

    #[test]
    fn test_indent_skipped_without_single_placeholder_line() {
        let value = "a\nb";
        assert_eq!(indent_placeholder_value("${x}\n  ${x}", "x", value), value);
        assert_eq!(indent_placeholder_value("none", "x", value), value);
        assert_eq!(indent_placeholder_value("${x}", "x", value), value);
    }
}
