use crate::config::EmitterConfig;
use anyhow::Result;
use std::io::Write;

pub type EmitResult = Result<()>;

#[derive(Debug, Clone)]
pub struct EmitContext {
    pub indent_level: usize,
    pub indent_chars: String,
    pub use_colors: bool,
}

impl EmitContext {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            indent_chars: "    ".to_string(),
            use_colors: false,
        }
    }

    pub fn from_config(config: &EmitterConfig) -> Self {
        Self {
            indent_level: 0,
            indent_chars: config.indent_style.unit(),
            use_colors: config.use_colors,
        }
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    pub fn get_indent(&self) -> String {
        self.indent_chars.repeat(self.indent_level)
    }
}

impl Default for EmitContext {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Emitter {
    type Item;

    fn emit<W: Write>(
        &self,
        item: &Self::Item,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult;

    fn emit_to_string(&self, item: &Self::Item) -> Result<String> {
        let mut buffer = Vec::new();
        let mut context = EmitContext::new();
        self.emit(item, &mut buffer, &mut context)?;
        Ok(String::from_utf8(buffer)?)
    }
}

pub struct EmitHelper;

impl EmitHelper {
    pub fn write_line<W: Write>(writer: &mut W, context: &EmitContext, text: &str) -> EmitResult {
        if text.is_empty() {
            writeln!(writer)?;
        } else {
            writeln!(writer, "{}{}", context.get_indent(), text)?;
        }
        Ok(())
    }

    pub fn blank_line<W: Write>(writer: &mut W) -> EmitResult {
        writeln!(writer)?;
        Ok(())
    }

    pub fn write_colored_line<W: Write>(
        writer: &mut W,
        context: &EmitContext,
        text: &str,
        color: &str,
    ) -> EmitResult {
        if context.use_colors {
            use colored::Colorize;
            let colored_text = match color {
                "red" => text.red().to_string(),
                "green" => text.green().to_string(),
                "yellow" => text.yellow().to_string(),
                "cyan" => text.cyan().to_string(),
                "bold" => text.bold().to_string(),
                _ => text.to_string(),
            };
            writeln!(writer, "{}{}", context.get_indent(), colored_text)?;
        } else {
            Self::write_line(writer, context, text)?;
        }
        Ok(())
    }

    pub fn write_doc<W: Write>(writer: &mut W, context: &EmitContext, doc: &str) -> EmitResult {
        for line in doc.lines() {
            Self::write_line(writer, context, format!("/// {}", line).trim_end())?;
        }
        Ok(())
    }

    /// Writes `header {`, the indented body, then `}` followed by `trailer`.
    pub fn write_block<W: Write, F>(
        writer: &mut W,
        context: &mut EmitContext,
        header: &str,
        trailer: &str,
        body: F,
    ) -> EmitResult
    where
        F: FnOnce(&mut W, &mut EmitContext) -> EmitResult,
    {
        let open = if header.is_empty() {
            "{".to_string()
        } else {
            format!("{} {{", header)
        };
        Self::write_line(writer, context, &open)?;
        context.indent();
        body(writer, context)?;
        context.dedent();
        Self::write_line(writer, context, &format!("}}{}", trailer))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndentStyle;

    #[test]
    fn test_context_indentation() {
        let mut ctx = EmitContext::new();
        assert_eq!(ctx.get_indent(), "");
        ctx.indent();
        ctx.indent();
        assert_eq!(ctx.get_indent(), "        ");
        ctx.dedent();
        ctx.dedent();
        ctx.dedent();
        assert_eq!(ctx.indent_level, 0);
    }

    #[test]
    fn test_context_from_config() {
        let config = EmitterConfig {
            indent_style: IndentStyle::Tabs,
            ..EmitterConfig::default()
        };
        let mut ctx = EmitContext::from_config(&config);
        ctx.indent();
        assert_eq!(ctx.get_indent(), "\t");
    }

    #[test]
    fn test_blank_lines_carry_no_indent() {
        let mut buffer = Vec::new();
        let mut ctx = EmitContext::new();
        ctx.indent();
        EmitHelper::write_line(&mut buffer, &ctx, "").unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "\n");
    }

    #[test]
    fn test_write_block_with_trailer() {
        let mut buffer = Vec::new();
        let mut ctx = EmitContext::new();
        EmitHelper::write_block(&mut buffer, &mut ctx, "while (go)", ";", |w, c| {
            EmitHelper::write_line(w, c, "go = false;")
        })
        .unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "while (go) {\n    go = false;\n};\n"
        );
    }

    #[test]
    fn test_doc_lines() {
        let mut buffer = Vec::new();
        let ctx = EmitContext::new();
        EmitHelper::write_doc(&mut buffer, &ctx, "first\n\nsecond").unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "/// first\n///\n/// second\n"
        );
    }
}
