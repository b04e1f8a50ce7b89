//! Command line front end of the object browser.
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

mod render;

use crate::api::types::BucketObject;
use crate::api::ListObjectsParams;
use crate::config::{ConnectionArgs, ConsoleConfig};
use crate::download::{download_object, download_selected, DownloadSelection};
use crate::navigator::{
    delete_objects, load_objects, load_versions, total_space, update_object_tags, versions_view,
    visible_records, DeleteOptions, SortDirection, SortField, VersionSort,
};
use crate::store::Action;
use crate::transfer::{cancel_all_transfers, settle_transfers, TransferOutcome};
use crate::upload::{collect_folder_files, upload_objects, UploadFile};
use crate::{db, license, Console};

pub use render::spawn_renderer;

/// How long an interrupted run waits for transfers to report their abort.
const INTERRUPT_GRACE: Duration = Duration::from_secs(5);

/// Browse, upload and download objects through an object-storage console.
#[derive(Debug, Parser)]
#[command(name = "objbrowser", about, version)]
pub struct Cli {
    /// Console connection and local storage settings.
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Select the command to run.
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the objects of a bucket under a prefix.
    Ls(LsArgs),

    /// Show the versions of one object.
    Versions(VersionsArgs),

    /// Upload files or folders into a bucket.
    Upload(UploadArgs),

    /// Download objects; several objects are fetched as one zip.
    Download(DownloadArgs),

    /// Delete objects; names ending in `/` delete the whole prefix.
    Rm(RmArgs),

    /// Add, change or remove tags of one object.
    Tag(TagArgs),

    /// Inspect or give AGPL license consent.
    License(LicenseCli),
}

#[derive(Debug, Args)]
pub struct LsArgs {
    pub bucket: String,

    /// Prefix to list, e.g. `photos/2024/`
    #[arg(default_value = "")]
    pub prefix: String,

    /// Sort by name, last_modified or size
    #[arg(long, default_value = "name")]
    pub sort: SortField,

    /// Reverse the sort order
    #[arg(long)]
    pub desc: bool,

    /// Only show names containing this text
    #[arg(long, default_value = "")]
    pub search: String,

    /// Include deleted objects
    #[arg(long)]
    pub show_deleted: bool,

    /// List the bucket as it was at this RFC 3339 time
    #[arg(long)]
    pub rewind: Option<DateTime<Utc>>,
}

#[derive(Debug, Args)]
pub struct VersionsArgs {
    pub bucket: String,
    pub object: String,

    /// Only show version IDs containing this text
    #[arg(long, default_value = "")]
    pub search: String,

    /// Sort by size instead of newest first
    #[arg(long)]
    pub by_size: bool,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    pub bucket: String,

    /// Files or folders to upload
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Destination prefix inside the bucket
    #[arg(long, default_value = "")]
    pub prefix: String,
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    pub bucket: String,

    /// Object names; names ending in `/` download a folder
    #[arg(required = true)]
    pub objects: Vec<String>,

    /// Download this version of a single object
    #[arg(long)]
    pub version_id: Option<String>,

    /// Save a single object under this name
    #[arg(long)]
    pub rename: Option<String>,
}

#[derive(Debug, Args)]
pub struct RmArgs {
    pub bucket: String,

    #[arg(required = true)]
    pub objects: Vec<String>,

    /// Delete this version of a single object
    #[arg(long, conflicts_with = "all_versions")]
    pub version_id: Option<String>,

    /// Delete every version, not just the current one
    #[arg(long)]
    pub all_versions: bool,

    /// Delete only the non-current versions of a single object
    #[arg(long)]
    pub non_current_versions: bool,

    /// Bypass governance retention
    #[arg(long)]
    pub bypass: bool,
}

#[derive(Debug, Args)]
pub struct TagArgs {
    pub bucket: String,
    pub object: String,

    /// Tags to set, as `key=value`
    #[arg(value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,

    /// Tag keys to remove
    #[arg(long = "remove", value_name = "KEY")]
    pub remove: Vec<String>,

    /// Tag this version of the object
    #[arg(long)]
    pub version_id: Option<String>,
}

fn parse_tag(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected `key=value`, got `{}`", raw)),
    }
}

#[derive(Debug, Args)]
pub struct LicenseCli {
    #[command(subcommand)]
    pub command: LicenseCommand,
}

#[derive(Debug, Subcommand)]
pub enum LicenseCommand {
    /// Acknowledge the AGPL license.
    Ack,
    /// Show whether the license was acknowledged.
    Status,
}

/// Run one CLI invocation to completion.
pub async fn run(cli: Cli) -> Result<()> {
    let config = ConsoleConfig::from_env_and_args(&cli.connection)?;
    log::debug!("config: {:?}", config);
    let console = Console::new(config)?;

    let stop = transfer_http::CancellationToken::new();
    let renderer = spawn_renderer(&console.store, stop.clone());

    let result = tokio::select! {
        result = execute(&console, cli.command) => result,
        _ = tokio::signal::ctrl_c() => {
            let cancelled = cancel_all_transfers().await;
            log::info!("interrupted, {} transfers cancelled", cancelled.len());
            if !settle_transfers(&cancelled, INTERRUPT_GRACE).await {
                log::warn!("some transfers did not stop within {:?}", INTERRUPT_GRACE);
            }
            Err(anyhow::anyhow!("interrupted"))
        }
    };

    stop.cancel();
    if let Err(e) = renderer.await {
        log::warn!("renderer stopped abnormally: {}", e);
    }
    result
}

async fn execute(console: &Console, command: Command) -> Result<()> {
    match command {
        Command::Ls(args) => list(console, args).await,
        Command::Versions(args) => versions(console, args).await,
        Command::Upload(args) => upload(console, args).await,
        Command::Download(args) => download(console, args).await,
        Command::Rm(args) => remove(console, args).await,
        Command::Tag(args) => tag(console, args).await,
        Command::License(cmd) => license_command(console, cmd.command).await,
    }
}

fn object_line(object: &BucketObject) -> String {
    let marker = if object.delete_flag { " (deleted)" } else { "" };
    format!(
        "{:>14}  {:<25}  {}{}",
        object.size, object.last_modified, object.name, marker
    )
}

async fn list(console: &Console, args: LsArgs) -> Result<()> {
    let store = &console.store;
    if let Some(date) = args.rewind {
        store.dispatch(Action::SetRewindEnable {
            state: true,
            bucket: args.bucket.clone(),
            date: Some(date),
        });
    }
    store.dispatch(Action::SetShowDeletedObjects(args.show_deleted));
    store.dispatch(Action::SetSearchObjects(args.search.clone()));

    let records = load_objects(&console.client, store, &args.bucket, &args.prefix).await?;
    let direction = if args.desc {
        SortDirection::Desc
    } else {
        SortDirection::Asc
    };
    for object in visible_records(&records, &args.search, args.sort, direction) {
        println!("{}", object_line(&object));
    }
    Ok(())
}

async fn versions(console: &Console, args: VersionsArgs) -> Result<()> {
    let store = &console.store;
    let versioned = console
        .client
        .get_bucket_versioning(&args.bucket)
        .await?
        .is_versioned();

    store.dispatch(Action::SetVersionsModeEnabled {
        status: true,
        object_name: Some(args.object.clone()),
    });
    store.dispatch(Action::SetSearchVersions(args.search));
    let current = load_versions(&console.client, store, &args.bucket, &args.object, versioned).await?;

    if !versioned {
        println!("{}", object_line(&current));
        println!("bucket `{}` is not versioned", args.bucket);
        return Ok(());
    }

    let by = if args.by_size {
        VersionSort::Size
    } else {
        VersionSort::Date
    };
    let view = store.select(|s| versions_view(&s.object_browser, by));
    for version in &view {
        let latest = if version.is_latest { "*" } else { " " };
        println!(
            "{} {:<38}  {}",
            latest,
            version.version_id.as_deref().unwrap_or_default(),
            object_line(version)
        );
    }
    let all = store.select(|s| s.object_browser.versions.clone());
    println!("{} versions, {} bytes in total", all.len(), total_space(&all));
    Ok(())
}

async fn upload(console: &Console, args: UploadArgs) -> Result<()> {
    let mut files = Vec::new();
    for path in &args.files {
        if path.is_dir() {
            let found = collect_folder_files(path)
                .await
                .with_context(|| format!("reading folder {}", path.display()))?;
            files.extend(found);
        } else {
            files.push(UploadFile::from_path(path));
        }
    }
    if files.is_empty() {
        anyhow::bail!("nothing to upload");
    }

    let summary =
        upload_objects(&console.client, &console.store, &args.bucket, &files, &args.prefix, "")
            .await;
    if summary.failed > 0 {
        anyhow::bail!("{} of {} uploads failed", summary.failed, summary.total);
    }
    println!("uploaded {} files", summary.total);
    Ok(())
}

/// Look the object up so the download can verify its size.
async fn resolve_object(
    console: &Console,
    bucket: &str,
    name: &str,
    version_id: Option<&str>,
) -> Result<BucketObject> {
    if name.ends_with('/') {
        return Ok(BucketObject::folder(name));
    }
    let params = ListObjectsParams {
        prefix: Some(name.to_string()),
        with_versions: version_id.is_some(),
        ..Default::default()
    };
    let objects = console.client.list_objects(bucket, &params).await?;
    let mut object = objects
        .into_iter()
        .find(|o| {
            o.name == name
                && version_id.map_or(true, |v| o.version_id.as_deref() == Some(v))
        })
        .with_context(|| format!("object `{}` not found in bucket `{}`", name, bucket))?;
    if version_id.is_none() {
        object.version_id = None;
    }
    Ok(object)
}

fn finish_transfer(outcome: TransferOutcome) -> Result<()> {
    match outcome {
        TransferOutcome::Completed => Ok(()),
        TransferOutcome::Failed(message) => anyhow::bail!("download failed: {}", message),
        TransferOutcome::Cancelled => anyhow::bail!("download cancelled"),
    }
}

async fn download(console: &Console, args: DownloadArgs) -> Result<()> {
    if args.objects.len() > 1 && (args.version_id.is_some() || args.rename.is_some()) {
        anyhow::bail!("--version-id and --rename apply to a single object");
    }
    let dest_dir = &console.config.download_dir;
    tokio::fs::create_dir_all(dest_dir)
        .await
        .with_context(|| format!("creating {}", dest_dir.display()))?;

    let mut records = Vec::with_capacity(args.objects.len());
    for name in &args.objects {
        records.push(resolve_object(console, &args.bucket, name, args.version_id.as_deref()).await?);
    }

    if let (Some(rename), [object]) = (args.rename.as_deref(), records.as_slice()) {
        let (_, handle) = download_object(
            &console.client,
            &console.store,
            dest_dir,
            &args.bucket,
            object,
            Some(rename),
        )
        .await;
        return finish_transfer(handle.await?);
    }

    console.store.dispatch(Action::SetRecords(records));
    console
        .store
        .dispatch(Action::SetSelectedObjects(args.objects.clone()));

    match download_selected(&console.client, &console.store, dest_dir, &args.bucket).await {
        DownloadSelection::Nothing => anyhow::bail!("nothing selected"),
        DownloadSelection::RenameRequired(object) => anyhow::bail!(
            "`{}` is too long to save on this system; pass --rename",
            object.name
        ),
        DownloadSelection::Single { handle, .. } => finish_transfer(handle.await?),
        DownloadSelection::Zip(Some(path)) => {
            println!("saved {}", path.display());
            Ok(())
        }
        DownloadSelection::Zip(None) => anyhow::bail!("zip download failed"),
    }
}

async fn remove(console: &Console, args: RmArgs) -> Result<()> {
    let single = args.objects.len() == 1;
    if !single && (args.version_id.is_some() || args.non_current_versions) {
        anyhow::bail!("--version-id and --non-current-versions apply to a single object");
    }
    // --bypass only makes sense on buckets under retention
    let options = DeleteOptions {
        version_id: args.version_id,
        all_versions: args.all_versions,
        non_current_versions: args.non_current_versions,
        bypass: args.bypass,
        retention_configured: args.bypass,
    };
    delete_objects(&console.client, &console.store, &args.bucket, &args.objects, &options).await?;
    println!("deleted {} objects", args.objects.len());
    Ok(())
}

async fn tag(console: &Console, args: TagArgs) -> Result<()> {
    if args.tags.is_empty() && args.remove.is_empty() {
        anyhow::bail!("nothing to change; pass `key=value` tags or --remove");
    }
    let params = ListObjectsParams {
        prefix: Some(args.object.clone()),
        with_versions: args.version_id.is_some(),
        with_metadata: true,
        ..Default::default()
    };
    let objects = console.client.list_objects(&args.bucket, &params).await?;
    let object = objects
        .into_iter()
        .find(|o| {
            o.name == args.object
                && args
                    .version_id
                    .as_deref()
                    .map_or(true, |v| o.version_id.as_deref() == Some(v))
        })
        .with_context(|| format!("object `{}` not found in bucket `{}`", args.object, args.bucket))?;

    // Single-node servers report no version IDs and expect the `null` version
    let distributed = object.version_id.is_some();
    let set: HashMap<String, String> = args.tags.into_iter().collect();
    let tags = update_object_tags(
        &console.client,
        &console.store,
        &args.bucket,
        &object,
        &set,
        &args.remove,
        distributed,
    )
    .await?;

    let mut keys: Vec<_> = tags.iter().collect();
    keys.sort();
    for (key, value) in keys {
        println!("{}={}", key, value);
    }
    Ok(())
}

async fn license_command(console: &Console, command: LicenseCommand) -> Result<()> {
    db::init_db(&console.config.db_path())
        .await
        .map_err(|e| anyhow::anyhow!("opening state database: {}", e))?;

    match command {
        LicenseCommand::Ack => {
            license::acknowledge_license(&console.client).await?;
            println!("license acknowledged, see {}", license::LICENSE_ACK_URL);
        }
        LicenseCommand::Status => {
            if license::license_consent_given().await? {
                println!("license acknowledged");
            } else {
                println!(
                    "license not acknowledged; run `objbrowser license ack` ({})",
                    license::LICENSE_ACK_URL
                );
            }
        }
    }
    Ok(())
}
