//! Command-line argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::FormatArg;

/// Thunderstore catalog suggestions, profile import and author stats
#[derive(Parser, Clone, Debug)]
#[command(name = "tscache")]
#[command(version)]
#[command(about = "Thunderstore catalog suggestions, profile import and author stats", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Disable colored output (also honors `NO_COLOR`)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to a configuration file (defaults to the platform config dir)
    #[arg(long, global = true, value_name = "FILE", env = "TSCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Community to query, overriding the configured one
    #[arg(long, global = true, value_name = "SLUG")]
    pub community: Option<String>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Suggest authors, mods, versions or categories from the live catalog
    #[command(alias = "s")]
    Suggest {
        #[command(subcommand)]
        target: SuggestTarget,
    },

    /// Decode a legacy profile code and resolve its mods
    Profile {
        /// Profile code as shown by the mod manager
        code: String,

        /// Give up after this many seconds (defaults to the configured timeout)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        #[command(flatten)]
        format: FormatArg,
    },

    /// Author download statistics
    Stats {
        #[command(subcommand)]
        target: StatsTarget,
    },

    /// Keep the catalog fresh in the foreground until interrupted
    Watch {
        /// Seconds between refreshes (defaults to the configured interval)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
}

/// Limit and format shared by every suggestion query.
#[derive(Args, Clone, Debug)]
pub struct QueryArgs {
    /// Maximum number of suggestions
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub format: FormatArg,
}

#[derive(Subcommand, Clone, Debug)]
pub enum SuggestTarget {
    /// Authors, most downloaded first
    Authors {
        /// Case-insensitive substring to match
        #[arg(default_value = "")]
        needle: String,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Mod names, optionally scoped to one author
    Mods {
        /// Case-insensitive substring to match
        #[arg(default_value = "")]
        needle: String,

        /// Only mods owned by this author
        #[arg(long)]
        author: Option<String>,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Versions of one mod, newest first
    Versions {
        /// Package owner
        author: String,

        /// Package name
        name: String,

        /// Case-insensitive substring to match
        #[arg(default_value = "")]
        needle: String,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Categories, most used first
    Categories {
        /// Case-insensitive substring to match
        #[arg(default_value = "")]
        needle: String,

        /// Keep the Modpacks category in the results
        #[arg(long)]
        include_modpacks: bool,

        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum StatsTarget {
    /// Figures for a single author
    Author {
        /// Author name (case-insensitive)
        name: String,

        #[command(flatten)]
        format: FormatArg,
    },

    /// Authors ranked by median downloads times mod count
    Leaderboard {
        /// Minimum number of ranked mods to qualify
        #[arg(long, default_value_t = 5)]
        min_mods: usize,

        /// Maximum number of rows
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,

        #[command(flatten)]
        format: FormatArg,
    },

    /// Most recently created packages
    Latest {
        /// Number of packages to show
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,

        #[command(flatten)]
        format: FormatArg,
    },

    /// Dependencies of a mod's newest version
    Dependencies {
        /// Mod owner (case-insensitive)
        author: String,

        /// Mod name (case-insensitive)
        name: String,

        #[command(flatten)]
        format: FormatArg,
    },

    /// Mods that depend on a given mod, most downloaded first
    Dependents {
        /// Mod owner (case-insensitive)
        author: String,

        /// Mod name (case-insensitive)
        name: String,

        /// Maximum number of rows
        #[arg(
            short = 'n',
            long,
            default_value_t = 25,
            value_parser = clap::value_parser!(u16).range(1..=50)
        )]
        limit: u16,

        #[command(flatten)]
        format: FormatArg,
    },

    /// Deprecated mods owned by an author
    Deprecated {
        /// Author name (case-insensitive)
        author: String,

        #[command(flatten)]
        format: FormatArg,
    },

    /// The mod with the most published versions
    MostVersions {
        #[command(flatten)]
        format: FormatArg,
    },
}

impl Commands {
    /// Output format argument of the selected command, if it has one.
    pub const fn format_arg(&self) -> Option<&FormatArg> {
        match self {
            Self::Suggest { target } => match target {
                SuggestTarget::Authors { query, .. }
                | SuggestTarget::Mods { query, .. }
                | SuggestTarget::Versions { query, .. }
                | SuggestTarget::Categories { query, .. } => Some(&query.format),
            },
            Self::Profile { format, .. } => Some(format),
            Self::Stats { target } => match target {
                StatsTarget::Author { format, .. }
                | StatsTarget::Leaderboard { format, .. }
                | StatsTarget::Latest { format, .. }
                | StatsTarget::Dependencies { format, .. }
                | StatsTarget::Dependents { format, .. }
                | StatsTarget::Deprecated { format, .. }
                | StatsTarget::MostVersions { format } => Some(format),
            },
            Self::Watch { .. } => None,
        }
    }
}
