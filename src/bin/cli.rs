//! mail-assist command line
//!
//! `attach` drives the assistant in a browser tab until interrupted.
//! `draft` runs the assistant form once against the reply backend.

use clap::{Args, Parser, Subcommand};
use mail_assist::assistant::{AssistantForm, HttpReplyGenerator, ToneKind, draft_reply};
use mail_assist::browser::{BrowserSession, ConnectionOptions, LaunchOptions, TabDriver};
use mail_assist::config::AssistConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "mail-assist")]
#[command(version)]
#[command(about = "Smart email reply assistant for webmail pages", long_about = None)]
struct Cli {
    /// Assistant configuration file (JSON)
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inject the assistant into a browser tab and keep it running
    Attach(AttachArgs),
    /// Draft a reply to an email read from a file or stdin
    Draft(DraftArgs),
}

#[derive(Args)]
struct AttachArgs {
    /// Webmail URL to open
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// WebSocket endpoint URL of an already running browser
    #[arg(long, value_name = "URL")]
    ws_endpoint: Option<String>,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    executable_path: Option<PathBuf>,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR")]
    user_data_dir: Option<PathBuf>,
}

#[derive(Args)]
struct DraftArgs {
    /// Tone of the reply
    #[arg(long, short = 't', value_enum, default_value_t = ToneKind::Professional)]
    tone: ToneKind,

    /// Free-text tone, used with --tone custom
    #[arg(long, value_name = "TEXT")]
    custom_tone: Option<String>,

    /// File holding the email text (default: stdin)
    #[arg(long, short = 'f', value_name = "PATH")]
    file: Option<PathBuf>,
}

async fn attach(config: AssistConfig, args: AttachArgs) -> Result<(), Box<dyn std::error::Error>> {
    let session = match args.ws_endpoint {
        Some(endpoint) => BrowserSession::connect(ConnectionOptions::new(endpoint))?,
        None => {
            let mut options = LaunchOptions::new().headless(!args.headed);
            if let Some(path) = args.executable_path {
                options = options.chrome_path(path);
            }
            if let Some(dir) = args.user_data_dir {
                options = options.user_data_dir(dir);
            }
            BrowserSession::launch(options)?
        }
    };

    let mut driver = TabDriver::attach(session, config.into_shared())?;
    if let Some(url) = args.url {
        driver.navigate(&url)?;
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted; shutting down");
        }
        on_signal.cancel();
    });

    driver.run(cancel).await?;
    driver.session().close()?;
    Ok(())
}

async fn draft(config: AssistConfig, args: DraftArgs) -> Result<bool, Box<dyn std::error::Error>> {
    let content = match args.file {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };

    let generator = HttpReplyGenerator::new(&config.backend)?;
    let mut form = AssistantForm::new();
    form.set_email_content(content);
    form.select_tone(args.tone);
    form.set_custom_tone(args.custom_tone.unwrap_or_default());

    match draft_reply(&mut form, &generator).await {
        Some(reply) => {
            println!("{}", reply);
            Ok(true)
        }
        None => {
            if let Some(message) = form.error_message() {
                eprintln!("{}", message);
                return Ok(false);
            }
            log::warn!("Backend returned an empty reply");
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match AssistConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => AssistConfig::default(),
    };

    let outcome = match cli.command {
        Command::Attach(args) => attach(config, args).await.map(|()| true),
        Command::Draft(args) => draft(config, args).await,
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
