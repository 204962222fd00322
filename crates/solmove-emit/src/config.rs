use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    pub indent_style: IndentStyle,
    /// Colors only apply to terminal summaries, never to Move source.
    pub use_colors: bool,
    pub verbosity: VerbosityLevel,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            indent_style: IndentStyle::Spaces(4),
            use_colors: false,
            verbosity: VerbosityLevel::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentStyle {
    Spaces(usize),
    Tabs,
}

impl IndentStyle {
    pub fn unit(&self) -> String {
        match self {
            IndentStyle::Spaces(n) => " ".repeat(*n),
            IndentStyle::Tabs => "\t".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbosityLevel {
    Quiet,
    Normal,
    Verbose,
}

impl VerbosityLevel {
    pub fn should_list_functions(&self) -> bool {
        !matches!(self, VerbosityLevel::Quiet)
    }

    pub fn should_list_acquires(&self) -> bool {
        matches!(self, VerbosityLevel::Verbose)
    }
}
