use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "auditstore")]
#[command(author, version, about = "Maintenance tool for audit template and image storage")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the storage directories
    Init,

    /// Manage template records
    Templates {
        #[command(subcommand)]
        command: TemplateCommands,
    },

    /// Manage image artifacts
    Images {
        #[command(subcommand)]
        command: ImageCommands,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// List template records
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a template record
    Show {
        /// Template file name
        file: String,
    },

    /// Save a template from a JSON file
    Import {
        /// JSON file holding the template
        #[arg(required = true)]
        input: PathBuf,

        /// Overwrite this existing record instead of creating a new one
        #[arg(long)]
        existing: Option<String>,
    },

    /// Copy a template into the backup directory
    Backup {
        /// Template file name
        file: String,
    },

    /// List template backups
    Backups,

    /// Delete a template record
    Delete {
        /// Template file name
        file: String,
    },
}

#[derive(Subcommand)]
pub enum ImageCommands {
    /// Show size and timestamps of an image
    Stat {
        /// Image file name
        file: String,
    },

    /// List images referenced by none of the given documents
    Orphans {
        /// Live document JSON files
        #[arg(required = true)]
        documents: Vec<PathBuf>,
    },

    /// Delete images referenced by none of the given documents
    Prune {
        /// Live document JSON files
        #[arg(required = true)]
        documents: Vec<PathBuf>,

        /// Show what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },
}
