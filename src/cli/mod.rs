//! CLI module - Command-line interface for Anitable
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Args, Parser, Subcommand};

use crate::models::anime::AnimeType;
use crate::services::sorting::SortField;

/// Anitable - Anime catalog table
/// Browse the Jikan catalog with filters, sorting and paging
#[derive(Parser)]
#[command(name = "anitable")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load catalog pages and print the filtered, sorted table
    #[command(alias = "b")]
    Browse(BrowseArgs),

    /// List anime genres
    #[command(alias = "g")]
    Genres {
        /// Only show genres whose name contains this text
        filter: Option<String>,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

#[derive(Args, Debug, Clone)]
pub struct BrowseArgs {
    /// Title search, sent to the server
    #[arg(short, long)]
    pub search: Option<String>,

    /// Only show these types (repeatable): tv, movie, ova, tv-special, ona, music, cm, pv
    #[arg(short = 't', long = "type")]
    pub types: Vec<AnimeType>,

    /// Only show entries tagged with any of these genre IDs (repeatable)
    #[arg(short, long = "genre")]
    pub genres: Vec<i32>,

    #[arg(long, default_value_t = 0.0)]
    pub min_score: f64,

    #[arg(long, default_value_t = 10.0)]
    pub max_score: f64,

    /// Column to sort by: air-date, episodes or score
    #[arg(long, default_value = "air-date")]
    pub sort: SortField,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    /// Number of pages to load
    #[arg(short, long, default_value_t = 1)]
    pub pages: u32,
}

pub use commands::*;
