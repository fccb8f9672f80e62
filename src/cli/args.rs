//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Squeaker - build customized Smalltalk images from declarative recipes
///
/// Derives images from a base image plus a sequence of in-image Smalltalk
/// expressions, caching every intermediate derivation so repeated builds
/// become incremental.
#[derive(Parser, Debug)]
#[command(name = "squeaker")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SQUEAKER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache directory override
    #[arg(long, global = true, env = "SQUEAKER_CACHE")]
    pub cache_root: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build an image from a recipe
    Build(BuildArgs),

    /// Run a cached image interactively
    Run(RunArgs),

    /// Remove unreferenced images and stages
    Gc(GcArgs),

    /// List tags
    Tags,

    /// Print the image digest a tag points to
    ResolveTag {
        /// Tag name
        tag: String,
    },

    /// Emit the stage graph as Graphviz DOT
    Dot,

    /// Extract a cached image into a directory
    Create {
        /// Tag name or image digest prefix
        image: String,
        /// Destination directory
        dir: PathBuf,
    },

    /// Remove tags
    Untag {
        /// Tag names
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Remove stage records by digest prefix
    Unstage {
        /// Stage digest prefixes
        #[arg(required = true)]
        digests: Vec<String>,
    },

    /// Show where a Smalltalk VM was looked for
    PrintAutodetect,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Recipe file (defaults to DIR/Squeakerfile.st)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Tag the final image
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Re-download URL stages even when cached
    #[arg(long)]
    pub no_cache_urls: bool,

    /// Re-run chunk stages even when cached
    #[arg(long)]
    pub no_cache_stages: bool,

    /// Run the VM headless
    #[arg(long, overrides_with = "no_headless")]
    pub headless: bool,

    /// Run the VM with a display
    #[arg(long, overrides_with = "headless")]
    pub no_headless: bool,

    /// Smalltalk VM executable
    #[arg(long)]
    pub vm: Option<PathBuf>,

    /// Project directory the in-image code may read from
    pub dir: PathBuf,
}

impl BuildArgs {
    /// Explicit headless choice, if either flag was given
    pub fn headless_override(&self) -> Option<bool> {
        if self.headless {
            Some(true)
        } else if self.no_headless {
            Some(false)
        } else {
            None
        }
    }
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Smalltalk VM executable
    #[arg(long)]
    pub vm: Option<PathBuf>,

    /// Expose the invoking directory to the image as its project root
    #[arg(long)]
    pub root: bool,

    /// Run the VM headless
    #[arg(long, overrides_with = "no_headless")]
    pub headless: bool,

    /// Run the VM with a display
    #[arg(long, overrides_with = "headless")]
    pub no_headless: bool,

    /// Tag name or image digest prefix
    pub image: String,

    /// Extra arguments passed to the VM
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl RunArgs {
    pub fn headless_override(&self) -> Option<bool> {
        if self.headless {
            Some(true)
        } else if self.no_headless {
            Some(false)
        } else {
            None
        }
    }
}

/// Arguments for the gc command
#[derive(Parser, Debug)]
pub struct GcArgs {
    /// Dry run - list what would be removed
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Delete downloaded blobs no tag depends on
    #[arg(long, conflicts_with = "delete_all_urls")]
    pub delete_unreferenced_urls: bool,

    /// Delete every downloaded blob
    #[arg(long)]
    pub delete_all_urls: bool,

    /// Keep only tagged tip images
    #[arg(long, conflicts_with = "keep_intermediate")]
    pub discard_all_intermediate: bool,

    /// Keep intermediate images up to N stages behind a tag
    #[arg(long)]
    pub keep_intermediate: Option<u64>,
}
