use std::path::PathBuf;

use clap::{Args, ValueEnum};
use lectern_core::models::ContentFormat;

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Query text. Double-quoted phrases match as a single token.
    pub query: String,
    /// Maximum number of hits to print.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
    #[arg(long, value_enum, default_value_t = SearchKindArg::All)]
    pub kind: SearchKindArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchKindArg {
    All,
    Talks,
    Papers,
}

#[derive(Debug, Args)]
pub struct SuggestArgs {
    /// Prefix or fragment to complete.
    pub query: String,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Record id, e.g. `2022-10-12` or `p-2019-03`.
    pub id: String,
    /// Base URL used to resolve relative links and images.
    #[arg(long)]
    pub base_url: Option<String>,
}

#[derive(Debug, Args)]
pub struct RenderFileArgs {
    /// File whose contents are rendered to HTML on stdout.
    pub path: PathBuf,
    #[arg(long, value_enum, default_value_t = FormatArg::Markdown)]
    pub format: FormatArg,
    /// Base URL used to resolve relative links and images.
    #[arg(long)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Markdown,
    Html,
}

impl From<FormatArg> for ContentFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Markdown => Self::Markdown,
            FormatArg::Html => Self::Html,
        }
    }
}
