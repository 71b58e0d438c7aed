//! CLI binary for docrag.

use clap::{Parser, Subcommand};
use docrag::presentation::{
    current_step, format_ingestion_mode, format_ocr_mode, ocr_status_text, status_tone,
    truncate_id,
};
use docrag::{ClientConfig, DocragClient, SubmitOutcome, TrackerPhase, TrackerSnapshot};
use docrag_api::{ChatRequest, DocumentUpload, OcrMode, UploadOptions};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// docrag: track document-ingestion tasks on a RAG backend.
#[derive(Parser)]
#[command(name = "docrag", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Check whether the backend is reachable.
    Health,

    /// Follow a task until it finishes.
    Watch {
        /// Backend task id.
        task_id: String,
    },

    /// Upload a PDF for ingestion.
    Upload {
        /// PDF file to upload.
        file: PathBuf,
        /// Re-process the document even if the backend already has it.
        #[arg(long)]
        force: bool,
        /// OCR policy: auto, always, or never.
        #[arg(long, default_value = "auto")]
        ocr_mode: OcrMode,
        /// Follow the queued task until it finishes.
        #[arg(long)]
        watch: bool,
    },

    /// List recently submitted tasks.
    Recent,

    /// Forget all recently submitted tasks.
    ClearRecent,

    /// Change the backend address.
    SetUrl {
        /// New base address, e.g. `https://rag.example.com`.
        url: String,
    },

    /// Ask a question.
    Chat {
        /// Question text.
        query: String,
        /// Restrict retrieval to one document.
        #[arg(long)]
        doc_id: Option<String>,
        /// Only search extracted claims.
        #[arg(long)]
        claims: bool,
        /// Only search tables.
        #[arg(long)]
        tables: bool,
    },

    /// Print a document summary.
    Summary {
        /// Document id.
        doc_id: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("docrag=info,docrag_api=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::load(cli.config.as_deref())?;
    let mut client = DocragClient::open(config)?;

    match cli.command {
        Command::Health => run_health(&client).await,
        Command::Watch { task_id } => run_watch(&mut client, &task_id).await,
        Command::Upload {
            file,
            force,
            ocr_mode,
            watch,
        } => {
            let options = UploadOptions { force, ocr_mode };
            run_upload(&mut client, file, options, watch).await
        }
        Command::Recent => {
            print_recent(&client);
            Ok(())
        }
        Command::ClearRecent => {
            client.clear_recent_tasks()?;
            println!("Recent tasks cleared.");
            Ok(())
        }
        Command::SetUrl { url } => {
            let url = client.set_api_url(&url)?;
            println!("API address set to {url}");
            run_health(&client).await
        }
        Command::Chat {
            query,
            doc_id,
            claims,
            tables,
        } => {
            let request = ChatRequest {
                doc_id,
                is_claim: claims.then_some(true),
                is_table: tables.then_some(true),
                ..ChatRequest::new(query)
            };
            run_chat(&client, &request).await
        }
        Command::Summary { doc_id } => {
            let summary = client.summary(&doc_id).await?;
            println!("{}", summary.summary);
            Ok(())
        }
    }
}

async fn run_health(client: &DocragClient) -> anyhow::Result<()> {
    let state = client.check_health().await;
    if state.online {
        println!("online  {}", client.api_url());
        Ok(())
    } else {
        let reason = state.message.unwrap_or_else(|| "unreachable".to_owned());
        anyhow::bail!("offline {}: {reason}", client.api_url())
    }
}

async fn run_upload(
    client: &mut DocragClient,
    file: PathBuf,
    options: UploadOptions,
    watch: bool,
) -> anyhow::Result<()> {
    let upload = DocumentUpload::from_path(&file)?.with_options(options);
    match client.upload(upload, None).await? {
        SubmitOutcome::Queued {
            task_id, message, ..
        } => {
            if !message.is_empty() {
                println!("{message}");
            }
            println!("task {task_id}");
            if watch {
                run_watch(client, &task_id).await?;
            }
        }
        SubmitOutcome::Existing { doc_id, message } => {
            println!("{message}");
            if let Some(doc_id) = doc_id {
                println!("document {doc_id}");
            }
        }
    }
    Ok(())
}

async fn run_watch(client: &mut DocragClient, task_id: &str) -> anyhow::Result<()> {
    client.start_health_monitor();
    let tracker = client.tracker();
    let mut updates = tracker.subscribe();
    tracker.set_task(task_id)?;
    info!(task_id, "watching task");

    let mut last_line = String::new();
    loop {
        let snapshot = updates.borrow_and_update().clone();
        let line = describe(&snapshot);
        if line != last_line {
            println!("{line}");
            last_line = line;
        }
        if !snapshot.is_live && !snapshot.is_loading {
            print_details(&snapshot);
            return match snapshot.phase {
                TrackerPhase::Halted | TrackerPhase::Failed => {
                    anyhow::bail!(snapshot.error.unwrap_or_else(|| "task failed".to_owned()))
                }
                _ => Ok(()),
            };
        }

        tokio::select! {
            changed = updates.changed() => changed?,
            _ = tokio::signal::ctrl_c() => {
                tracker.teardown();
                println!("stopped watching {}", truncate_id(task_id));
                return Ok(());
            }
        }
    }
}

fn describe(snapshot: &TrackerSnapshot) -> String {
    let id = snapshot.task_id.as_deref().map(truncate_id).unwrap_or_default();
    let Some(status) = &snapshot.status else {
        return format!("{id}  checking...");
    };
    let mut line = format!("{id}  {}  [{}]", status_tone(&status.status), status.status);
    if let Some(step) = current_step(status) {
        line.push_str(&format!("  step: {step}"));
    }
    line
}

fn print_details(snapshot: &TrackerSnapshot) {
    let Some(status) = &snapshot.status else {
        return;
    };
    if let Some(result) = &status.result {
        if let Some(doc_id) = &result.doc_id {
            println!("  document: {doc_id}");
        }
        if let Some(chunks) = result.chunks_count {
            println!("  chunks:   {chunks}");
        }
        if let Some(claims) = result.claims_count {
            println!("  claims:   {claims}");
        }
    }
    if let Some(ocr) = status.ocr_details() {
        println!("  OCR mode:  {}", format_ocr_mode(ocr.ocr_mode));
        println!("  OCR:       {}", ocr_status_text(ocr));
        println!("  ingestion: {}", format_ingestion_mode(ocr.ingestion_mode));
    }
}

fn print_recent(client: &DocragClient) {
    let tasks = client.recent_tasks();
    if tasks.is_empty() {
        println!("No recent tasks.");
        return;
    }
    for task in tasks {
        let when = task.timestamp.with_timezone(&chrono::Local);
        println!(
            "{:<16} {:<11} {}  {}",
            truncate_id(&task.task_id),
            task.status.to_lowercase(),
            when.format("%Y-%m-%d %H:%M"),
            task.filename
        );
    }
}

async fn run_chat(client: &DocragClient, request: &ChatRequest) -> anyhow::Result<()> {
    let response = client.chat(request).await?;
    println!("{}", response.answer);
    if !response.citations.is_empty() {
        println!();
        for (i, citation) in response.citations.iter().enumerate() {
            let source = citation.filename.as_deref().unwrap_or("unknown source");
            match citation.page {
                Some(page) => println!("[{}] {source}, p. {page}", i + 1),
                None => println!("[{}] {source}", i + 1),
            }
        }
    }
    Ok(())
}
