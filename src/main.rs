mod cli;

use auditstore::{
    config::{self, Config},
    images::ImageStore,
    scanner,
    storage::{self, StorageRoots},
    templates::{TemplateDraft, TemplateStore},
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ImageCommands, TemplateCommands};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "auditstore=debug,auditstore_common=debug".to_string()
        } else {
            "auditstore=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("auditstore {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = config::load_config_or_default(cli.config.as_deref())?;
    let roots = config.storage.roots();

    match cli.command {
        Commands::Init => init(&roots),
        Commands::Templates { command } => run_templates(command, &config, &roots),
        Commands::Images { command } => run_images(command, &config, &roots),
        Commands::Version => Ok(()),
    }
}

fn init(roots: &StorageRoots) -> Result<()> {
    storage::ensure_storage_roots(roots)?;
    println!("Templates: {}", roots.templates.display());
    println!("Backups:   {}", roots.template_backups.display());
    println!("Images:    {}", roots.images.display());
    Ok(())
}

fn template_store(config: &Config, roots: &StorageRoots) -> TemplateStore {
    TemplateStore::new(&roots.templates)
        .with_backup_dir(&roots.template_backups)
        .with_max_attempts(config.storage.unique_name_attempts)
}

fn image_store(config: &Config, roots: &StorageRoots) -> ImageStore {
    ImageStore::new(&roots.images)
        .with_max_bytes(config.storage.max_image_bytes)
        .with_max_attempts(config.storage.unique_name_attempts)
}

fn run_templates(command: TemplateCommands, config: &Config, roots: &StorageRoots) -> Result<()> {
    let store = template_store(config, roots);

    match command {
        TemplateCommands::List { json } => {
            let summaries = store.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
                return Ok(());
            }
            if summaries.is_empty() {
                println!("No templates found.");
            }
            for summary in summaries {
                let version = summary.version.as_deref().unwrap_or("-");
                let marker = if summary.readable { "" } else { " (unreadable)" };
                println!(
                    "{}\t{}\t{}{}",
                    summary.file_name, summary.template_name, version, marker
                );
            }
        }
        TemplateCommands::Show { file } => {
            let record = store
                .read(&file)?
                .ok_or_else(|| anyhow::anyhow!("Template not found: {}", file))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        TemplateCommands::Import { input, existing } => {
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read template file: {:?}", input))?;
            let draft: TemplateDraft = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse template file: {:?}", input))?;
            let saved = store.save(draft, existing.as_deref())?;
            println!("Saved {}", saved.file_name);
        }
        TemplateCommands::Backup { file } => {
            let backup = store.backup(&file)?;
            println!("Backed up {} to {}", file, backup);
        }
        TemplateCommands::Backups => {
            for name in store.list_backups()? {
                println!("{}", name);
            }
        }
        TemplateCommands::Delete { file } => {
            store.delete(&file)?;
            println!("Deleted {}", file);
        }
    }

    Ok(())
}

fn run_images(command: ImageCommands, config: &Config, roots: &StorageRoots) -> Result<()> {
    let store = image_store(config, roots);

    match command {
        ImageCommands::Stat { file } => match store.stat(&file)? {
            Some(stat) => println!("{}", serde_json::to_string_pretty(&stat)?),
            None => anyhow::bail!("Image not found: {}", file),
        },
        ImageCommands::Orphans { documents } => {
            for name in orphans(&store, &documents)? {
                println!("{}", name);
            }
        }
        ImageCommands::Prune { documents, dry_run } => {
            let orphans = orphans(&store, &documents)?;
            if dry_run {
                println!("[DRY RUN] Would delete {} images", orphans.len());
                for name in &orphans {
                    println!("  {}", name);
                }
                return Ok(());
            }

            let report = store.delete_many(&orphans);
            println!(
                "Deleted {} of {} unreferenced images",
                report.deleted, report.attempted
            );
            for failure in &report.failed {
                println!("  failed: {} ({})", failure.file_name, failure.error);
            }
            if !report.failed.is_empty() {
                anyhow::bail!("{} images could not be deleted", report.failed.len());
            }
        }
    }

    Ok(())
}

/// Images referenced by none of the given live documents.
fn orphans(store: &ImageStore, documents: &[PathBuf]) -> Result<Vec<String>> {
    let docs = documents
        .iter()
        .map(|path| read_document(path))
        .collect::<Result<Vec<_>>>()?;
    let referenced = scanner::collect_references(&docs);
    tracing::debug!(
        documents = docs.len(),
        references = referenced.len(),
        "collected live references"
    );
    Ok(store.list_orphans(&referenced)?)
}

fn read_document(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse document: {:?}", path))
}
