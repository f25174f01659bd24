use std::path::PathBuf;

use archiver_engine::BookmarkId;
use clap::{Parser, Subcommand};

use crate::platform::config::DEFAULT_CONFIG_FILE;

#[derive(Debug, Parser)]
#[command(name = "archiver", version, about = "Offline archives for saved bookmarks")]
pub struct Cli {
    /// Settings file; missing means built-in defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Overrides the configured log level (error, warn, info, debug, trace, off).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Save a new bookmark and print its id.
    Add {
        url: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        excerpt: Option<String>,
    },

    /// Show saved bookmarks and how they are archived.
    List,

    /// Fetch and archive the given bookmarks.
    Archive {
        #[arg(required = true)]
        ids: Vec<BookmarkId>,
    },

    /// Archive every bookmark that has no archive yet.
    ArchiveAll,

    /// Archive a bookmark from a local file instead of fetching it.
    Import {
        id: BookmarkId,
        file: PathBuf,
        /// Content type of the file, e.g. "text/html; charset=utf-8".
        #[arg(long)]
        content_type: String,
    },

    /// Extract a resource from a bookmark's archive.
    File {
        id: BookmarkId,
        /// Resource inside the archive; empty means the main document.
        #[arg(default_value = "")]
        path: String,
        /// Write to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Combine archived bookmarks into one long-form Markdown document.
    Ebook {
        #[arg(required = true)]
        ids: Vec<BookmarkId>,
        #[arg(long)]
        title: String,
        #[arg(long)]
        out_dir: PathBuf,
        /// Defaults to a name derived from the title and ids.
        #[arg(long)]
        file_name: Option<String>,
        /// Also write a JSON manifest next to the document.
        #[arg(long)]
        manifest: bool,
    },

    /// List registered encoders in dispatch order.
    Encoders,
}
