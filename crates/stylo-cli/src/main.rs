use std::fs;
use std::io::{self, ErrorKind, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use stylo_contracts::chat::{parse_intent, SESSION_HELP_COMMANDS};
use stylo_contracts::events::{new_session_id, EventWriter};
use stylo_contracts::history::{FileStorage, HistoryItem, HistoryStore};
use stylo_contracts::images::{extension_for_mime, ImagePayload};
use stylo_contracts::models::ModelRegistry;
use stylo_contracts::options::{
    canonical_choice, SceneOptions, ASPECT_RATIOS, CAMERA_PERSPECTIVES, LIGHTING_STYLES, MOODS,
};
use stylo_engine::codec;
use stylo_engine::config::parse_quota;
use stylo_engine::progress::{format_elapsed, progress_message};
use stylo_engine::{
    GenerationClient, GenerationOutcome, HttpTransport, OperationSlot, Session, StudioConfig,
};

#[derive(Debug, Parser)]
#[command(name = "stylo", version, about = "Product mockup studio backed by Gemini image editing")]
struct Cli {
    #[command(flatten)]
    studio: StudioArgs,
    #[command(subcommand)]
    command: Command,
}

/// Overrides for values otherwise read from the environment.
#[derive(Debug, Clone, Default, Args)]
struct StudioArgs {
    #[arg(long, global = true)]
    home: Option<PathBuf>,
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    #[arg(long, global = true)]
    image_model: Option<String>,
    #[arg(long, global = true)]
    text_model: Option<String>,
    /// Request timeout in seconds; 0 waits forever.
    #[arg(long, global = true)]
    timeout: Option<u64>,
    /// Storage quota in bytes, or `unlimited`.
    #[arg(long, global = true)]
    storage_quota: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    Generate(GenerateArgs),
    Describe(DescribeArgs),
    Magic(MagicArgs),
    Suggest(SuggestArgs),
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },
    Options,
    Session,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long)]
    product: PathBuf,
    #[arg(long)]
    reference: Option<PathBuf>,
    #[arg(long)]
    prompt: String,
    #[arg(long, default_value = "1:1")]
    aspect_ratio: String,
    #[arg(long, default_value = "Soft Studio")]
    lighting: String,
    #[arg(long, default_value = "Eye-level")]
    camera: String,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct DescribeArgs {
    #[arg(long)]
    reference: PathBuf,
}

#[derive(Debug, Parser)]
struct MagicArgs {
    #[arg(long)]
    product: PathBuf,
    #[arg(long)]
    mood: String,
}

#[derive(Debug, Parser)]
struct SuggestArgs {
    #[arg(long)]
    product: PathBuf,
}

#[derive(Debug, Subcommand)]
enum HistoryCommand {
    List,
    Show { id: String },
    Delete { id: String },
    Clear {
        #[arg(long)]
        yes: bool,
    },
    Export {
        id: String,
        #[arg(long)]
        out: PathBuf,
    },
}

const PROMPT_PREVIEW_CHARS: usize = 60;
const TICK_INTERVAL: Duration = Duration::from_millis(250);

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("stylo error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = studio_config(StudioConfig::from_env(), &cli.studio)?;
    match cli.command {
        Command::Generate(args) => run_generate(&config, args),
        Command::Describe(args) => run_describe(&config, args),
        Command::Magic(args) => run_magic(&config, args),
        Command::Suggest(args) => run_suggest(&config, args),
        Command::History { action } => run_history(&config, action),
        Command::Options => {
            print_options();
            Ok(0)
        }
        Command::Session => {
            run_session(&config)?;
            Ok(0)
        }
    }
}

fn studio_config(mut config: StudioConfig, args: &StudioArgs) -> Result<StudioConfig> {
    if let Some(home) = &args.home {
        config.home = home.clone();
    }
    if let Some(events) = &args.events {
        config.events_path = Some(events.clone());
    }
    if let Some(model) = &args.image_model {
        config.image_model = Some(model.clone());
    }
    if let Some(model) = &args.text_model {
        config.text_model = Some(model.clone());
    }
    if let Some(seconds) = args.timeout {
        config.request_timeout = (seconds > 0).then(|| Duration::from_secs(seconds));
    }
    if let Some(raw) = &args.storage_quota {
        let Some(quota) = parse_quota(raw) else {
            bail!("invalid --storage-quota value: {raw}");
        };
        config.storage_quota = quota;
    }
    Ok(config)
}

fn open_history(config: &StudioConfig) -> HistoryStore {
    HistoryStore::load(FileStorage::new(config.history_dir()).with_quota(config.storage_quota))
}

fn open_session(config: &StudioConfig) -> Result<Session> {
    let transport = HttpTransport::from_config(config)?;
    let (client, warnings) = GenerationClient::from_config(config, transport)?;
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
    let events = EventWriter::new(config.events_path(), new_session_id());
    Ok(Session::new(client, open_history(config), events))
}

fn run_generate(config: &StudioConfig, args: GenerateArgs) -> Result<i32> {
    let mut session = open_session(config)?;
    session.set_product_image(Some(codec::load_uploaded_image(&args.product)?));
    if let Some(reference) = &args.reference {
        session.set_reference_image(Some(codec::load_uploaded_image(reference)?));
    }
    session.set_prompt(args.prompt);
    session.set_scene(resolve_scene(&args.aspect_ratio, &args.lighting, &args.camera));

    let outcome = with_progress(session.generation_slot(), || session.generate())?;
    let out = args
        .out
        .unwrap_or_else(|| default_output_path(&outcome.item_id, &outcome.image.mime_type));
    write_image(&out, &outcome.image)?;
    report_generation(&outcome, &out);
    Ok(0)
}

fn run_describe(config: &StudioConfig, args: DescribeArgs) -> Result<i32> {
    let mut session = open_session(config)?;
    session.set_reference_image(Some(codec::load_uploaded_image(&args.reference)?));
    let prompt = with_progress(session.processing_slot(), || session.use_reference_as_prompt())?;
    println!("{prompt}");
    Ok(0)
}

fn run_magic(config: &StudioConfig, args: MagicArgs) -> Result<i32> {
    let mut session = open_session(config)?;
    session.set_product_image(Some(codec::load_uploaded_image(&args.product)?));
    let mood = canonical_choice(&args.mood, MOODS);
    let prompt = with_progress(session.processing_slot(), || session.magic_prompt(&mood))?;
    println!("{prompt}");
    Ok(0)
}

fn run_suggest(config: &StudioConfig, args: SuggestArgs) -> Result<i32> {
    let mut session = open_session(config)?;
    session.set_product_image(Some(codec::load_uploaded_image(&args.product)?));
    let prompt = with_progress(session.processing_slot(), || session.auto_prompt())?;
    println!("{prompt}");
    Ok(0)
}

fn run_history(config: &StudioConfig, action: HistoryCommand) -> Result<i32> {
    let mut store = open_history(config);
    if let Some(error) = store.load_error() {
        eprintln!("warning: {error}");
    }
    match action {
        HistoryCommand::List => {
            if store.is_empty() {
                println!("History is empty.");
            }
            for item in store.items() {
                println!("{}", history_line(item));
            }
        }
        HistoryCommand::Show { id } => {
            let item = lookup_history(&store, &id)?;
            println!("{}", serde_json::to_string_pretty(&history_summary(item))?);
        }
        HistoryCommand::Delete { id } => {
            if store.remove(&id)? {
                println!("Deleted {id}");
            } else {
                println!("No history item {id}");
                return Ok(1);
            }
        }
        HistoryCommand::Clear { yes } => {
            if store.clear(|count| yes || confirm_clear(count))? {
                println!("History cleared.");
            } else {
                println!("History left unchanged.");
            }
        }
        HistoryCommand::Export { id, out } => {
            let item = lookup_history(&store, &id)?;
            export_preview(item, &out)?;
            println!("Exported {id} to {}", out.display());
        }
    }
    Ok(0)
}

fn run_session(config: &StudioConfig) -> Result<()> {
    let mut session = open_session(config)?;
    let stdin = io::stdin();
    let mut line = String::new();

    println!(
        "Stylo session started ({} items in history). Type /help for commands.",
        session.history().len()
    );

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let intent = parse_intent(line.trim_end_matches(['\n', '\r']));
        let arg = intent.arg("path").or_else(|| intent.arg("value")).unwrap_or_default();
        match intent.action.as_str() {
            "noop" => {}
            "quit" => break,
            "help" => println!("Commands: {}", SESSION_HELP_COMMANDS.join(" ")),
            "options" => print_options(),
            "status" => print_status(&session),
            "set_prompt" => {
                session.set_prompt(intent.arg("text").unwrap_or_default());
                println!("Prompt set.");
            }
            "set_product" | "set_reference" => {
                if arg.is_empty() {
                    println!("/{} requires a path", intent.action.trim_start_matches("set_"));
                    continue;
                }
                match codec::load_uploaded_image(Path::new(arg)) {
                    Ok(image) => {
                        let label = image.source_label();
                        if intent.action == "set_product" {
                            session.set_product_image(Some(image));
                            println!("Product image set to {label}");
                        } else {
                            session.set_reference_image(Some(image));
                            println!("Reference image set to {label}");
                        }
                    }
                    Err(err) => println!("Upload failed: {err:#}"),
                }
            }
            "remove_reference" => {
                session.set_reference_image(None);
                println!("Reference image removed.");
            }
            "set_aspect_ratio" => match scene_choice("aspect", arg, ASPECT_RATIOS) {
                Ok(value) => {
                    println!("Aspect ratio: {value}");
                    session.set_aspect_ratio(value);
                }
                Err(message) => println!("{message}"),
            },
            "set_lighting" => match scene_choice("lighting", arg, LIGHTING_STYLES) {
                Ok(value) => {
                    println!("Lighting: {value}");
                    session.set_lighting_style(value);
                }
                Err(message) => println!("{message}"),
            },
            "set_camera" => match scene_choice("camera", arg, CAMERA_PERSPECTIVES) {
                Ok(value) => {
                    println!("Camera: {value}");
                    session.set_camera_perspective(value);
                }
                Err(message) => println!("{message}"),
            },
            "generate" => {
                match with_progress(session.generation_slot(), || session.generate()) {
                    Ok(outcome) => {
                        let out = default_output_path(&outcome.item_id, &outcome.image.mime_type);
                        match write_image(&out, &outcome.image) {
                            Ok(()) => report_generation(&outcome, &out),
                            Err(err) => println!("Generated {} but saving failed: {err:#}", outcome.item_id),
                        }
                    }
                    Err(err) => println!("Generate failed: {err}"),
                }
            }
            "describe" => {
                let result =
                    with_progress(session.processing_slot(), || session.use_reference_as_prompt());
                print_prompt_result(result);
            }
            "magic_prompt" => {
                let raw = intent.arg("mood").unwrap_or_default();
                if raw.trim().is_empty() {
                    println!("Moods: {}", MOODS.join(", "));
                    continue;
                }
                let mood = canonical_choice(raw, MOODS);
                let result = with_progress(session.processing_slot(), || session.magic_prompt(&mood));
                print_prompt_result(result);
            }
            "suggest" => {
                let result = with_progress(session.processing_slot(), || session.auto_prompt());
                print_prompt_result(result);
            }
            "history" => {
                if session.history().is_empty() {
                    println!("History is empty.");
                }
                let selected = session.history().selected_id().map(str::to_string);
                for item in session.history().items() {
                    let marker = if selected.as_deref() == Some(item.id.as_str()) { "*" } else { " " };
                    println!("{marker} {}", history_line(item));
                }
            }
            "select_history" => {
                let id = intent.arg("id").unwrap_or_default().trim().to_string();
                match session.select_history(&id) {
                    Ok(item) => println!("Restored {} ({})", item.id, item.prompt),
                    Err(err) => println!("{err}"),
                }
            }
            "delete_history" => {
                let id = intent.arg("id").unwrap_or_default().trim().to_string();
                match session.delete_history(&id) {
                    Ok(true) => println!("Deleted {id}"),
                    Ok(false) => println!("No history item {id}"),
                    Err(err) => println!("{err}"),
                }
            }
            "clear" => match session.clear_history(confirm_clear) {
                Ok(true) => println!("History cleared."),
                Ok(false) => println!("History left unchanged."),
                Err(err) => println!("{err}"),
            },
            "reset" => {
                session.reset();
                println!("Session reset.");
            }
            "save_image" => {
                let Some(image) = session.state().generated_image.clone() else {
                    println!("Nothing generated yet.");
                    continue;
                };
                if arg.is_empty() {
                    println!("/save requires a path");
                    continue;
                }
                match write_image(Path::new(arg), &image) {
                    Ok(()) => println!("Saved to {arg}"),
                    Err(err) => println!("Save failed: {err:#}"),
                }
            }
            _ => {
                let command = intent.arg("command").unwrap_or_default();
                println!("Unknown command /{command}. Type /help for commands.");
            }
        }
    }

    Ok(())
}

/// Runs `work` while a helper thread prints the elapsed time and a status
/// line for whoever holds `slot`.
fn with_progress<T>(slot: Arc<OperationSlot>, work: impl FnOnce() -> T) -> T {
    if !io::stderr().is_terminal() {
        return work();
    }
    let stop = Arc::new(AtomicBool::new(false));
    let ticker = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut stderr = io::stderr();
            while !stop.load(Ordering::Acquire) {
                if let Some(elapsed) = slot.elapsed() {
                    let _ = write!(
                        stderr,
                        "\r\x1b[2K[{}] {}",
                        format_elapsed(elapsed),
                        progress_message(elapsed)
                    );
                    let _ = stderr.flush();
                }
                thread::sleep(TICK_INTERVAL);
            }
            let _ = write!(stderr, "\r\x1b[2K");
            let _ = stderr.flush();
        })
    };
    let result = work();
    stop.store(true, Ordering::Release);
    let _ = ticker.join();
    result
}

/// Catalogue spelling of `arg`; blank input is refused with the usage line.
fn scene_choice(command: &str, arg: &str, catalogue: &[&str]) -> Result<String, String> {
    if arg.trim().is_empty() {
        return Err(format!(
            "/{command} requires a value ({})",
            catalogue.join(", ")
        ));
    }
    Ok(canonical_choice(arg, catalogue))
}

fn resolve_scene(aspect_ratio: &str, lighting: &str, camera: &str) -> SceneOptions {
    SceneOptions {
        aspect_ratio: canonical_choice(aspect_ratio, ASPECT_RATIOS),
        lighting_style: canonical_choice(lighting, LIGHTING_STYLES),
        camera_perspective: canonical_choice(camera, CAMERA_PERSPECTIVES),
    }
}

fn default_output_path(item_id: &str, mime_type: &str) -> PathBuf {
    let stem: String = item_id
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' { ch } else { '-' })
        .collect();
    PathBuf::from(format!("mockup-{stem}.{}", extension_for_mime(mime_type)))
}

fn write_image(path: &Path, image: &ImagePayload) -> Result<()> {
    let bytes = codec::decode_payload_bytes(&image.base64)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("failed writing {}", path.display()))
}

fn export_preview(item: &HistoryItem, out: &Path) -> Result<()> {
    write_image(
        out,
        &ImagePayload {
            base64: item.preview_image.clone(),
            mime_type: "image/jpeg".to_string(),
        },
    )
}

fn report_generation(outcome: &GenerationOutcome, out: &Path) {
    println!(
        "Saved mockup {}x{} to {} (history item {})",
        outcome.width,
        outcome.height,
        out.display(),
        outcome.item_id
    );
    if let Some(message) = &outcome.storage_error {
        eprintln!("warning: {message}");
    }
}

fn print_prompt_result(result: Result<String, stylo_contracts::StudioError>) {
    match result {
        Ok(prompt) => println!("Prompt: {prompt}"),
        Err(err) => println!("{err}"),
    }
}

fn print_status(session: &Session) {
    let state = session.state();
    let label = |image: &Option<stylo_contracts::images::UploadedImage>| {
        image
            .as_ref()
            .map(|image| image.source_label())
            .unwrap_or_else(|| "none".to_string())
    };
    println!("Product:   {}", label(&state.product_image));
    println!("Reference: {}", label(&state.reference_image));
    println!("Prompt:    {}", state.prompt);
    println!(
        "Scene:     {} | {} | {}",
        state.scene.aspect_ratio, state.scene.lighting_style, state.scene.camera_perspective
    );
    println!(
        "Models:    {} / {}",
        session.client().image_model(),
        session.client().text_model()
    );
    if let Some(id) = session.history().selected_id() {
        println!("Selected:  {id}");
    }
    if let Some(error) = &state.error {
        println!("Error:     {error}");
    }
}

fn print_options() {
    println!("Aspect ratios: {}", ASPECT_RATIOS.join(", "));
    println!("Lighting:      {}", LIGHTING_STYLES.join(", "));
    println!("Camera:        {}", CAMERA_PERSPECTIVES.join(", "));
    println!("Moods:         {}", MOODS.join(", "));
    println!("Models:");
    for model in ModelRegistry::default().list() {
        println!("  {} ({}) [{}]", model.name, model.label, model.capabilities.join(", "));
    }
}

fn confirm_clear(count: usize) -> bool {
    print!("Delete all {count} history items? [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn lookup_history<'a>(store: &'a HistoryStore, id: &str) -> Result<&'a HistoryItem> {
    store
        .get(id)
        .ok_or_else(|| stylo_contracts::StudioError::UnknownHistoryItem(id.to_string()).into())
}

fn history_line(item: &HistoryItem) -> String {
    format!(
        "{}  {} | {} | {}  {}",
        item.id,
        item.aspect_ratio,
        item.lighting_style,
        item.camera_perspective,
        clamp_text(&item.prompt, PROMPT_PREVIEW_CHARS)
    )
}

/// Item metadata without the image payloads.
fn history_summary(item: &HistoryItem) -> serde_json::Value {
    json!({
        "id": item.id,
        "createdAt": item.created_at,
        "prompt": item.prompt,
        "aspectRatio": item.aspect_ratio,
        "lightingStyle": item.lighting_style,
        "cameraPerspective": item.camera_perspective,
        "productImage": item.product_image.mime_type,
        "referenceImage": item.reference_image.as_ref().map(|image| image.mime_type.clone()),
        "storedBytes": item.stored_size(),
    })
}

fn clamp_text(text: &str, max_chars: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let clipped: String = single_line.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", clipped.trim_end())
}
