//! GentlyOS CLI
//!
//! Pin management against a local or remote IPFS daemon.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gently_ipfs::{
    ApiConfig, CancellationToken, ContentPath, IpfsClient, PinAddOptions, PinLsOptions,
    PinUpdateOptions, VerifyOutcome,
};

#[derive(Parser)]
#[command(name = "gently")]
#[command(about = "GentlyOS - they spend, we gather")]
#[command(version)]
struct Cli {
    /// Daemon API address (http://host:port or multiaddr). Defaults to the local node.
    #[arg(long, global = true)]
    api: Option<String>,

    /// YAML file with API settings
    #[arg(long, global = true, conflicts_with = "api")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pin management
    Pin {
        #[command(subcommand)]
        command: PinCommands,
    },
}

#[derive(Subcommand)]
enum PinCommands {
    /// Pin content
    Add {
        /// CID or /ipfs/... path
        path: String,

        /// Pin only this node, not its children
        #[arg(long)]
        direct: bool,
    },

    /// List pinned content
    Ls {
        /// direct, indirect, recursive or all
        #[arg(short, long, default_value = "all")]
        r#type: String,
    },

    /// Remove a pin
    Rm {
        /// CID or /ipfs/... path
        path: String,
    },

    /// Move a pin to new content
    Update {
        /// Currently pinned path
        from: String,

        /// Path to pin instead
        to: String,

        /// Keep the old pin
        #[arg(long)]
        keep_old: bool,
    },

    /// Check that everything pinned is present and intact
    Verify {
        /// Only print pins that failed
        #[arg(long)]
        only_bad: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match (&cli.api, &cli.config) {
        (Some(api), _) => ApiConfig::with_address(api)?,
        (None, Some(file)) => ApiConfig::load(file)?,
        (None, None) => ApiConfig::discover()?,
    };
    let client = IpfsClient::new(config)?;

    match cli.command {
        Commands::Pin { command } => cmd_pin(&client, command).await,
    }
}

// ============================================================================
// PIN COMMANDS
// ============================================================================

async fn cmd_pin(client: &IpfsClient, command: PinCommands) -> Result<()> {
    match command {
        PinCommands::Add { path, direct } => {
            let path = ContentPath::parse(&path)?;
            client
                .pin()
                .add(&path, PinAddOptions::new().recursive(!direct))
                .await?;
            println!("pinned {}", path);
            Ok(())
        }

        PinCommands::Ls { r#type } => {
            let pins = client.pin().ls(PinLsOptions::new().type_filter(&r#type)).await?;

            println!("\n  PINNED CONTENT");
            println!("  ==============\n");
            if pins.is_empty() {
                println!("  (nothing pinned)");
            }
            for pin in &pins {
                println!("  {} {}", pin.path().cid(), pin.pin_type());
            }
            println!();
            Ok(())
        }

        PinCommands::Rm { path } => {
            let path = ContentPath::parse(&path)?;
            client.pin().rm(&path).await?;
            println!("unpinned {}", path);
            Ok(())
        }

        PinCommands::Update { from, to, keep_old } => {
            let from = ContentPath::parse(&from)?;
            let to = ContentPath::parse(&to)?;
            client
                .pin()
                .update(&from, &to, PinUpdateOptions::new().unpin(!keep_old))
                .await?;
            println!("updated {} -> {}", from, to);
            Ok(())
        }

        PinCommands::Verify { only_bad } => cmd_verify(client, only_bad).await,
    }
}

async fn cmd_verify(client: &IpfsClient, only_bad: bool) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping verify");
            on_interrupt.cancel();
        }
    });

    let mut stream = client.pin().verify(cancel).await?;
    let (mut checked, mut failed) = (0usize, 0usize);

    while let Some(status) = stream.next().await {
        checked += 1;
        if !status.ok() {
            failed += 1;
        }
        if only_bad && status.ok() {
            continue;
        }

        println!("{} {}", status.cid(), if status.ok() { "ok" } else { "BROKEN" });
        for node in status.bad_nodes() {
            match node.err() {
                Some(err) => println!("  {} {}", node.cid(), err),
                None => println!("  {}", node.cid()),
            }
        }
    }

    let outcome = stream.finish().await;
    if matches!(outcome, VerifyOutcome::Cancelled) {
        println!("\n  verify cancelled after {} pins", checked);
    } else {
        println!("\n  {} pins checked, {} broken", checked, failed);
    }
    outcome.into_result()?;

    if failed > 0 {
        anyhow::bail!("{} pins failed verification", failed);
    }
    Ok(())
}
