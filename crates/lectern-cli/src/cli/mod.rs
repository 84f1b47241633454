use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod args;


pub use args::{FormatArg, RenderArgs, RenderFileArgs, SearchArgs, SearchKindArg, SuggestArgs};

#[derive(Debug, Parser)]
#[command(name = "lectern")]
#[command(about = "LLVM developers' meeting archive search and rendering", version)]
pub struct Cli {
    /// Data directory holding the event and paper bundle files.
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Search(SearchArgs),
    Suggest(SuggestArgs),
    Render(RenderArgs),
    RenderFile(RenderFileArgs),
    Stats,
}
