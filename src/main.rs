//! `parliament` binary: seat the personas, run one moderated session, save the script.
//!
//! ```bash
//! export AZURE_API_KEY=... AZURE_API_VERSION=... AZURE_API_ENDPOINT=... AZURE_DEPLOYMENT_NAME=...
//! cargo run -- --config src/config.toml
//! ```

use clap::Parser;
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use parliament::config::{ParliamentConfig, ProviderCredentials};
use parliament::factory::ClientFactory;
use parliament::persona::PersonaCatalog;
use parliament::session::{resolve_topic, ParliamentSession, RandomProviderSelector};
use parliament::transcript;

#[derive(Parser)]
#[command(
    name = "parliament",
    about = "Run a moderated multi-agent parliament session and save its script"
)]
struct Cli {
    /// Persona TOML file
    #[arg(short, long, default_value = "src/config.toml")]
    config: PathBuf,

    /// Where the script is written (overwritten on every run)
    #[arg(short, long, default_value = "pub_script.txt")]
    output: PathBuf,

    /// Discussion topic; prompted for on stdin when omitted
    #[arg(short, long)]
    topic: Option<String>,

    /// Dotenv file loaded before credentials are read; its values win over the environment
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Print which provider variables are set (values masked) and exit
    #[arg(long)]
    check_env: bool,

    /// Seed for the per-member provider draw
    #[arg(long)]
    seed: Option<u64>,
}

fn print_credential_report(credentials: &ProviderCredentials) {
    println!("\n--- Environment Variable Check ---");
    for status in credentials.report() {
        match status.masked_value {
            Some(masked) => println!("  [ok]      {}: Found (Value: {})", status.variable, masked),
            None => println!("  [missing] {}: MISSING", status.variable),
        }
    }
    if credentials.azure.is_complete() {
        println!("\nAll required Azure environment variables are set.");
    } else {
        println!("\nSome Azure variables are missing. Please check your .env file.");
    }
}

fn print_personas(catalog: &PersonaCatalog) {
    println!("--- Parliament Members ---");
    for (key, persona) in catalog.list_members() {
        println!("  - {}: {}", key, persona.description);
    }

    if let Some(scripter) = catalog.get_moderator() {
        println!("\n--- Scripter ---");
        println!("  - Name: {}", scripter.name);
        println!("  - Role: {}", scripter.role.as_deref().unwrap_or("-"));
    }
    if let Some(translator) = catalog.get_translator() {
        println!("\n--- Translator ---");
        println!("  - Name: {}", translator.name);
        println!("  - Role: {}", translator.role.as_deref().unwrap_or("-"));
    }
    println!("{}", "-".repeat(20));
}

fn prompt_topic() -> io::Result<String> {
    println!("And what topic would you like to discuss today? (Press Enter for default topic 'weather')");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match dotenvy::from_path_override(&cli.env_file) {
        Ok(()) => {}
        Err(err) if err.not_found() => {}
        Err(err) => eprintln!("Could not load {}: {}", cli.env_file.display(), err),
    }
    parliament::init_logger();

    let config = ParliamentConfig::from_env()
        .with_persona_path(&cli.config)
        .with_output_path(&cli.output);

    if cli.check_env {
        print_credential_report(&config.credentials);
        return Ok(());
    }

    let catalog = PersonaCatalog::load(&config.persona_path);
    print_personas(&catalog);

    let topic = match &cli.topic {
        Some(topic) => resolve_topic(topic),
        None => resolve_topic(&prompt_topic()?),
    };
    println!("Topic selected: {}", topic);

    let factory = ClientFactory::new(&config.credentials);
    let mut selector = match cli.seed {
        Some(seed) => RandomProviderSelector::seeded(seed),
        None => RandomProviderSelector::new(),
    };
    let mut session = ParliamentSession::assemble(
        &catalog,
        &factory,
        &mut selector,
        config.moderator_provider,
        &topic,
        config.max_messages,
    )?;

    let cancellation = CancellationToken::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling the session");
            on_interrupt.cancel();
        }
    });

    let result = session.run(cancellation).await?;

    println!("\nSaving Script...");
    println!("Script Content:");
    println!("{}", transcript::render(&result.messages));
    let considered = transcript::write(&result.messages, &config.output_path)?;
    println!("Script saved ({} messages).", considered);

    Ok(())
}
