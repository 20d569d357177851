//! Tabella CLI — local-first notes with background AI enrichment.
//!
//! Usage:
//!   tabella add "pick up the dry cleaning" [--image photo.jpg] [--audio clip.m4a]
//!   tabella list [--wait]
//!   tabella show <id>
//!   tabella delete <id>
//!   tabella chat
//!   tabella settings [--name NAME] [--language LANG] [--persona PERSONA]

use clap::{Parser, Subcommand};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tabella::{
    format_note_timestamp, ChatSession, DraftItem, FetchState, FsStore, HttpClient, Language,
    NoteCache, NoteId, NoteItem, NoteStore, SessionContext,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(
    name = "tabella",
    version,
    about = "Local-first notes with background AI enrichment"
)]
struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,
    /// Enrichment service base URL
    #[arg(long, global = true, default_value_t = default_endpoint())]
    endpoint: String,
    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a new note
    Add {
        /// Text content of the note
        text: Option<String>,
        /// Attach an image file
        #[arg(long)]
        image: Vec<PathBuf>,
        /// Attach an audio recording
        #[arg(long)]
        audio: Vec<PathBuf>,
        /// Recording length in seconds, applied to the first audio attachment
        #[arg(long)]
        duration: Option<u32>,
    },
    /// List notes with their enrichment status
    List {
        /// Block until background fetches settle
        #[arg(long)]
        wait: bool,
    },
    /// Show one note in full
    Show {
        /// Note id, as printed by `list`
        id: String,
    },
    /// Delete a note and its media
    Delete {
        /// Note id, as printed by `list`
        id: String,
    },
    /// Chat with the assistant over your notes
    Chat,
    /// View or change settings
    Settings {
        /// How the assistant should address you
        #[arg(long)]
        name: Option<String>,
        /// Interface language (english or french)
        #[arg(long)]
        language: Option<String>,
        /// Persona the assistant speaks as
        #[arg(long)]
        persona: Option<String>,
    },
}

/// Default data directory (~/.local/share/tabella or platform equivalent)
fn default_data_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("tabella")
}

fn default_endpoint() -> String {
    std::env::var("TABELLA_ENDPOINT").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

fn parse_language(s: &str) -> Result<Language, String> {
    match s.to_ascii_lowercase().as_str() {
        "english" | "en" => Ok(Language::English),
        "french" | "fr" => Ok(Language::French),
        other => Err(format!("unknown language '{other}' (expected english or french)")),
    }
}

fn language_label(language: Language) -> &'static str {
    match language {
        Language::English => "english",
        Language::French => "french",
    }
}

/// Flatten to one line and cut at `max` characters for table cells
fn snippet(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    if flat.chars().count() <= max {
        flat.to_string()
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{cut}...")
    }
}

async fn cmd_add(
    store: &FsStore,
    session: &SessionContext,
    text: Option<String>,
    images: Vec<PathBuf>,
    audios: Vec<PathBuf>,
    mut duration: Option<u32>,
) -> i32 {
    let mut draft = Vec::new();
    if let Some(text) = text {
        draft.push(DraftItem::Text { text });
    }
    for source in images {
        draft.push(DraftItem::Image { source });
    }
    for source in audios {
        draft.push(DraftItem::Audio { source, duration: duration.take() });
    }

    match store.create_note(draft).await {
        Ok(id) => {
            session.mark_notes_changed();
            println!("Created note {} ({})", id, format_note_timestamp(id));
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_list(cache: &Arc<NoteCache>, wait: bool) -> i32 {
    let view = cache.load().await;
    let view = if wait {
        cache.settled().await;
        cache.snapshot()
    } else {
        view
    };

    if view.is_empty() {
        println!("No notes yet.");
        cache.shutdown();
        return 0;
    }

    println!(
        "{:<15}  {:<42}  {:<9}  {:<28}  SUMMARY",
        "ID", "CREATED", "STATUS", "TITLE"
    );
    println!("{}", "-".repeat(110));
    for record in &view {
        let status = match record.fetch {
            FetchState::Fetching => "fetching",
            FetchState::Error => "error",
            FetchState::Idle if record.enriched() => "enriched",
            FetchState::Idle => "idle",
        };
        let (title, summary) = match &record.enrichment {
            Some(e) => (snippet(&e.title, 26), snippet(&e.summary, 40)),
            None => (String::new(), String::new()),
        };
        println!(
            "{:<15}  {:<42}  {:<9}  {:<28}  {}",
            record.id,
            format_note_timestamp(record.id),
            status,
            title,
            summary
        );
    }
    cache.shutdown();
    0
}

async fn cmd_show(store: &FsStore, raw_id: &str) -> i32 {
    let id: NoteId = match raw_id.parse() {
        Ok(id) => id,
        Err(_) => {
            eprintln!("Error: '{}' is not a note id", raw_id);
            return 1;
        }
    };

    let body = match store.read_note_body(id).await {
        Ok(Some(body)) => body,
        Ok(None) => {
            eprintln!("Error: note {} not found", id);
            return 1;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    println!("Note {} ({})", id, format_note_timestamp(id));
    println!();
    for item in &body {
        match item {
            NoteItem::Text { text } => println!("{}", text),
            NoteItem::Image { file } => println!("[image: {}]", file),
            NoteItem::Audio { file, duration } => match duration {
                Some(secs) => println!("[audio: {}, {}s]", file, secs),
                None => println!("[audio: {}]", file),
            },
        }
    }

    match store.read_enrichment(id).await {
        Ok(Some(enrichment)) => {
            println!();
            println!("Title:   {}", enrichment.title);
            println!("Summary: {}", enrichment.summary);
            if let Some(raw_text) = enrichment.raw_text {
                println!();
                println!("Transcript:");
                println!("{}", raw_text);
            }
        }
        Ok(None) => {
            println!();
            println!("Not yet enriched.");
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    }
    0
}

async fn cmd_delete(store: &FsStore, session: &SessionContext, raw_id: &str) -> i32 {
    let id: NoteId = match raw_id.parse() {
        Ok(id) => id,
        Err(_) => {
            eprintln!("Error: '{}' is not a note id", raw_id);
            return 1;
        }
    };

    match store.delete_note(id).await {
        Ok(true) => {
            session.mark_notes_changed();
            println!("Deleted note {}", id);
            0
        }
        Ok(false) => {
            eprintln!("Error: note {} not found", id);
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_chat(
    store: Arc<FsStore>,
    client: Arc<HttpClient>,
    session: Arc<SessionContext>,
) -> i32 {
    if !session.is_configured() {
        eprintln!("No settings saved yet; run 'tabella settings --name <you>' to introduce yourself.");
    }
    let persona = session.settings().persona;

    let mut chat = ChatSession::new(store, client, session);
    chat.load_working_memory().await;
    println!("Chatting over your notes. Empty line or 'exit' to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        if std::io::stdout().flush().is_err() {
            return 1;
        }
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        };
        let text = line.trim();
        if text.is_empty() || text == "exit" || text == "quit" {
            break;
        }
        match chat.send_text(text).await {
            Ok(reply) => println!("{}> {}", persona, reply),
            Err(e) => eprintln!("Error fetching response: {}", e),
        }
    }
    0
}

async fn cmd_settings(
    store: &FsStore,
    session: &SessionContext,
    name: Option<String>,
    language: Option<String>,
    persona: Option<String>,
) -> i32 {
    if name.is_none() && language.is_none() && persona.is_none() {
        if !session.is_configured() {
            println!("No settings saved yet; showing defaults.");
        }
        let settings = session.settings();
        println!("Name:     {}", settings.name);
        println!("Language: {}", language_label(settings.language));
        println!("Persona:  {}", settings.persona);
        return 0;
    }

    let mut settings = session.settings();
    if let Some(name) = name {
        settings.name = name;
    }
    if let Some(language) = language {
        match parse_language(&language) {
            Ok(language) => settings.language = language,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    }
    if let Some(persona) = persona {
        settings.persona = persona;
    }

    match session.save_settings(store, settings).await {
        Ok(()) => {
            println!("Settings saved.");
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn run(cli: Cli) -> i32 {
    let root = cli.dir.clone().unwrap_or_else(default_data_dir);
    let store = match FsStore::open(&root) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: cannot open note store at {}: {}", root.display(), e);
            return 1;
        }
    };
    let session = SessionContext::load(&store).await;

    match cli.command {
        Commands::Add { text, image, audio, duration } => {
            cmd_add(&store, &session, text, image, audio, duration).await
        }
        Commands::List { wait } => {
            let store: Arc<dyn NoteStore> = Arc::new(store);
            let client = Arc::new(HttpClient::new(cli.endpoint));
            let cache = Arc::new(NoteCache::new(store, client, Arc::new(session)));
            cmd_list(&cache, wait).await
        }
        Commands::Show { id } => cmd_show(&store, &id).await,
        Commands::Delete { id } => cmd_delete(&store, &session, &id).await,
        Commands::Chat => {
            let client = Arc::new(HttpClient::new(cli.endpoint));
            cmd_chat(Arc::new(store), client, Arc::new(session)).await
        }
        Commands::Settings { name, language, persona } => {
            cmd_settings(&store, &session, name, language, persona).await
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };
    let code = rt.block_on(run(cli));
    std::process::exit(code);
}
