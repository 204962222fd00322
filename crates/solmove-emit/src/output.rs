use crate::config::EmitterConfig;
use crate::emitter::{EmitContext, EmitHelper};
use crate::summary::ModuleSummary;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
}

pub trait OutputFormatter {
    fn format_pair(&self, key: &str, value: &str) -> String;

    fn format_list(&self, items: &[String]) -> String;

    fn format_section(&self, title: &str) -> String;
}

pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn format_pair(&self, key: &str, value: &str) -> String {
        format!("{}: {}", key, value)
    }

    fn format_list(&self, items: &[String]) -> String {
        items
            .iter()
            .map(|item| format!("  - {}", item))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_section(&self, title: &str) -> String {
        format!("=== {} ===", title)
    }
}

pub struct MarkdownFormatter;

impl OutputFormatter for MarkdownFormatter {
    fn format_pair(&self, key: &str, value: &str) -> String {
        format!("**{}**: {}", key, value)
    }

    fn format_list(&self, items: &[String]) -> String {
        items
            .iter()
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_section(&self, title: &str) -> String {
        format!("## {}", title)
    }
}

pub fn render_summary(
    summary: &ModuleSummary,
    format: OutputFormat,
    config: &EmitterConfig,
) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
        OutputFormat::Text => render_with(&TextFormatter, summary, config),
        OutputFormat::Markdown => {
            let plain = EmitterConfig {
                use_colors: false,
                ..config.clone()
            };
            render_with(&MarkdownFormatter, summary, &plain)
        }
    }
}

fn render_with(
    formatter: &dyn OutputFormatter,
    summary: &ModuleSummary,
    config: &EmitterConfig,
) -> Result<String> {
    let mut buffer = Vec::new();
    let ctx = EmitContext::from_config(config);
    EmitHelper::write_colored_line(
        &mut buffer,
        &ctx,
        &formatter.format_section(&summary.module),
        "cyan",
    )?;
    let pairs = [
        ("resources", summary.resources.join(", ")),
        ("events", summary.events.join(", ")),
        ("error codes", summary.error_codes.len().to_string()),
    ];
    for (key, value) in pairs {
        if !value.is_empty() {
            EmitHelper::write_line(&mut buffer, &ctx, &formatter.format_pair(key, &value))?;
        }
    }
    if config.verbosity.should_list_functions() && !summary.functions.is_empty() {
        let items: Vec<String> = summary
            .functions
            .iter()
            .map(|f| {
                if config.verbosity.should_list_acquires() && !f.acquires.is_empty() {
                    format!("{} ({}) acquires {}", f.name, f.kind, f.acquires.join(", "))
                } else {
                    format!("{} ({})", f.name, f.kind)
                }
            })
            .collect();
        EmitHelper::write_line(&mut buffer, &ctx, &formatter.format_list(&items))?;
    }
    Ok(String::from_utf8(buffer)?)
}
