use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use common::{
    dashboard::{is_viewable, DocumentFilter},
    data::{AssetSource, BuildTarget, JobParameters, Language, Persona, SelectedAsset},
    tree, StatusTable,
};
use docflow_client::{
    api::{ApiClient, DownloadTarget},
    backend::Backend,
    clipboard::SystemClipboard,
    config::{ClientConfig, DEFAULT_BASE_URL},
    dashboard::Dashboard,
    job::{JobPhase, JobSnapshot, Uploader},
    notice::Notice,
    viewer::DocumentViewer,
};
use kdam::{
    term::{self, Colorizer},
    tqdm, BarExt, Column, RichProgress, Spinner,
};
use std::{
    io::{stderr, stdout, IsTerminal},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::{select, spawn, sync::watch};
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Backend root.
    #[arg(short, long, env = "DOCFLOW_API_URL", default_value = DEFAULT_BASE_URL)]
    base_url: Url,

    /// Seconds between status polls (1-10).
    #[arg(long, default_value_t = 3)]
    poll_interval: u64,

    /// Seconds before a request is abandoned.
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// JSON file of `{key, progress, label}` rows overriding the built-in stages.
    #[arg(long)]
    status_table: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a video or image and generate documentation from it.
    Upload {
        file: PathBuf,
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long)]
        persona: Option<Persona>,
        #[arg(long)]
        company_website: Option<String>,
        #[arg(long, default_value = "English")]
        language: Language,
        /// `guide` or `deck`.
        #[arg(long, default_value = "guide")]
        target: BuildTarget,
        /// Overrides the media type guessed from the file extension.
        #[arg(long)]
        media_type: Option<String>,
    },
    /// Show the processing status of an uploaded asset.
    Status {
        id: String,
        /// Keep polling until processing ends.
        #[arg(long)]
        follow: bool,
    },
    /// List generated documents.
    Dashboard {
        #[arg(long, default_value = "all")]
        filter: DocumentFilter,
    },
    /// Change a document's title.
    Rename { id: String, title: String },
    /// Print a generated documentation file.
    View {
        id: String,
        /// Path inside the documentation tree; defaults to the README.
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        tree: bool,
        #[arg(long, conflicts_with = "html")]
        raw: bool,
        #[arg(long)]
        html: bool,
        /// Also copy the markdown to the clipboard.
        #[arg(long)]
        copy: bool,
    },
    /// Save the documentation bundle or the slide deck.
    Download {
        id: String,
        #[arg(long)]
        deck: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn print_notices(notices: Vec<Notice>) {
    for n in notices {
        if n.is_error() {
            eprintln!("{} {}", n.title.colorize("bold red"), n.description);
        } else {
            eprintln!("{} {}", n.title.colorize("bold green"), n.description);
        }
    }
}

fn progress_bar() -> RichProgress {
    RichProgress::new(
        tqdm!(total = 100),
        vec![
            Column::Spinner(Spinner::new(
                &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"],
                80.0,
                1.0,
            )),
            Column::Animation,
            Column::Percentage(0),
            Column::Text("•".to_owned()),
            Column::Text("[bold blue]?".to_owned()),
        ],
    )
}

async fn refresh_bar(
    mut bar: Option<RichProgress>,
    token: CancellationToken,
    job: watch::Receiver<JobSnapshot>,
) -> Option<RichProgress> {
    let mut timer = tokio::time::interval(Duration::from_millis(100));
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut prev = String::new();
    loop {
        select! {
            _ = timer.tick() => {
                let snap = job.borrow().clone();
                let label = snap.label.unwrap_or_else(|| format!("{:?}", snap.phase));
                if let Some(bar) = bar.as_mut() {
                    bar.columns.truncate(4);
                    bar.columns.push(Column::Text(label.colorize("green")));
                    let _ = bar.update_to(snap.progress.into());
                } else if label != prev {
                    eprintln!("Status: {label} ({}%)", snap.progress);
                    prev = label;
                }
            }
            _ = token.cancelled() => {
                return bar;
            }
        }
    }
}

/// Draws the job until `work` finishes and the job stops being busy.
async fn watch_job<B, F>(job: &Uploader<B>, tty: bool, work: F) -> Result<JobSnapshot>
where
    B: Backend + 'static,
    F: std::future::Future<Output = Result<(), docflow_client::error::JobError>>,
{
    let token = CancellationToken::new();
    let f = spawn(refresh_bar(tty.then(progress_bar), token.clone(), job.subscribe()));
    let started = work.await;
    let snap = match started {
        Ok(()) => job.wait_until_settled().await,
        Err(_) => job.snapshot(),
    };
    token.cancel();
    if let Some(mut bar) = f.await? {
        bar.clear()?;
    }
    Ok(snap)
}

fn report(snap: &JobSnapshot) -> Result<()> {
    match &snap.phase {
        JobPhase::Completed => {
            if let Some(url) = &snap.download_url {
                println!("Documentation: {url}");
            }
            if let Some(url) = &snap.presentation_url {
                println!("Presentation: {url}");
            }
            Ok(())
        }
        JobPhase::NotFound => bail!("the backend does not know this asset"),
        JobPhase::Failed { kind, reason } => bail!("{kind:?} failed: {reason}"),
        other => bail!("job stopped while {other:?}"),
    }
}

async fn asset_from_path(path: &Path, media_type: Option<String>) -> Result<SelectedAsset> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    if !metadata.is_file() {
        bail!("{} is not a file", path.display());
    }
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?
        .to_string();
    let media_type = media_type.unwrap_or_else(|| {
        mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    });
    Ok(SelectedAsset {
        name,
        media_type,
        size: metadata.len(),
        source: AssetSource::Path(path.to_path_buf()),
    })
}

fn load_status_table(path: Option<&Path>) -> Result<StatusTable> {
    let Some(path) = path else {
        return Ok(StatusTable::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read status table {}", path.display()))?;
    let custom = StatusTable::from_json(&text)
        .with_context(|| format!("invalid status table {}", path.display()))?;
    log::info!("loaded {} stages from {}", custom.stages().len(), path.display());
    Ok(StatusTable::default().merge(custom))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let is_tty = stderr().is_terminal();
    term::init(is_tty);
    let args = Args::parse();

    let config = ClientConfig::new(args.base_url)?
        .with_poll_interval(Duration::from_secs(args.poll_interval))?
        .with_request_timeout(Duration::from_secs(args.timeout));
    let table = load_status_table(args.status_table.as_deref())?;
    let client = Arc::new(ApiClient::new(config.clone())?);

    match args.command {
        Command::Upload {
            file,
            prompt,
            persona,
            company_website,
            language,
            target,
            media_type,
        } => {
            let asset = asset_from_path(&file, media_type).await?;
            let job = Uploader::with_status_table(client, &config, table);
            if let Err(e) = job.select_file(asset) {
                print_notices(job.take_notices());
                bail!(e);
            }
            let params = JobParameters {
                prompt,
                persona,
                company_website,
                language,
                build_target: target,
            };
            let snap = watch_job(&job, is_tty, job.submit(params)).await?;
            print_notices(job.take_notices());
            if let Some(id) = &snap.asset_id {
                eprintln!("Asset ID: {id}");
            }
            report(&snap)
        }
        Command::Status { id, follow: false } => {
            let status = client.status(&id).await?.status;
            println!("{} ({}%)", table.label_for(&status), table.progress_for(&status));
            Ok(())
        }
        Command::Status { id, follow: true } => {
            let job = Uploader::with_status_table(client, &config, table);
            let snap = watch_job(&job, is_tty, async { job.follow(&id) }).await?;
            print_notices(job.take_notices());
            report(&snap)
        }
        Command::Dashboard { filter } => {
            let mut dash = Dashboard::new(client);
            let loaded = dash.load().await;
            print_notices(dash.take_notices());
            loaded?;
            for doc in dash.filtered(filter) {
                let marker = if is_viewable(doc) { "*" } else { " " };
                println!(
                    "{marker} {:<38} {:<10} {:<10} {}",
                    doc.id, doc.status, doc.date, doc.title
                );
            }
            let s = dash.summary();
            eprintln!(
                "{} documents: {} completed, {} processing, {} failed",
                s.total, s.completed, s.processing, s.failed
            );
            Ok(())
        }
        Command::Rename { id, title } => {
            let mut dash = Dashboard::new(client);
            let renamed = dash.rename(&id, &title).await;
            print_notices(dash.take_notices());
            renamed?;
            Ok(())
        }
        Command::View {
            id,
            file,
            tree: show_tree,
            raw,
            html,
            copy,
        } => {
            let mut viewer = DocumentViewer::new(client);
            let mut loaded = viewer.load_tree(&id).await;
            if let (true, Some(path)) = (loaded.is_ok(), file) {
                if tree::find_by_path(viewer.tree(), &path).is_none() {
                    log::warn!("{path} is not listed in the documentation tree");
                }
                loaded = viewer.select_file(&path).await;
            }
            if loaded.is_err() {
                print_notices(viewer.take_notices());
            }
            loaded?;

            if show_tree {
                for (depth, node) in tree::walk(viewer.tree()) {
                    let suffix = if node.is_folder() { "/" } else { "" };
                    println!("{}{}{suffix}", "  ".repeat(depth), node.name);
                }
            }
            let content = if html {
                viewer.rendered_html()
            } else if raw {
                viewer.raw().map(str::to_string)
            } else {
                viewer.rendered(stdout().is_terminal())
            };
            match content {
                Some(text) => print!("{text}"),
                None if show_tree => {}
                None => bail!("no markdown file to show"),
            }
            if copy {
                let mut clipboard = SystemClipboard::new()?;
                viewer.copy_content(&mut clipboard)?;
            }
            print_notices(viewer.take_notices());
            Ok(())
        }
        Command::Download { id, deck, output } => {
            let (target, extension) = if deck {
                (DownloadTarget::Presentation, "pptx")
            } else {
                (DownloadTarget::Bundle, "zip")
            };
            let dest = output.unwrap_or_else(|| PathBuf::from(format!("{id}.{extension}")));
            let written = client.download(&id, target, &dest).await?;
            eprintln!("Saved {written} bytes to {}", dest.display());
            Ok(())
        }
    }
}
