use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use payresume::application::PaymentFlowClient;
use payresume::config::SdkConfig;
use payresume::domain::flow::FlowType;
use payresume::domain::outcome::{ReturnEvent, TokenizeResult};
use payresume::domain::pending::PendingOutcome;
use payresume::domain::ports::{ExternalAgentBox, PendingRequestStoreRef, TokenizeClientBox};
use payresume::domain::request::{AuthParams, PaymentAuthRequest};
use payresume::error::FlowError;
use payresume::infrastructure::configuration::StaticConfiguration;
use payresume::infrastructure::file::FilePendingStore;
use payresume::infrastructure::gateway::{HttpTokenizeClient, UnconfiguredGateway};
use payresume::interfaces::agent::{CommandAgent, InstalledApps, PrintingAgent};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory of the durable pending request store (overrides the configuration).
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Program used to open launch URLs (e.g. `xdg-open`). Without it URLs are printed to stderr.
    #[arg(long, global = true)]
    open_with: Option<String>,

    /// Companion app package the host can switch to. Repeatable.
    #[arg(long = "installed-app", global = true)]
    installed_apps: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build an authorization request and hand it to the external agent.
    Launch {
        /// Flow parameters as JSON, tagged by `flow`.
        #[arg(long)]
        params: String,
    },
    /// Resume a pending flow with the agent's return, then tokenize.
    Resume {
        #[arg(long)]
        flow: FlowType,
        /// Deep link the agent returned through. Omit along with `--extra` for a dismissal.
        #[arg(long)]
        return_url: Option<Url>,
        /// Structured return value as `key=value`. Repeatable.
        #[arg(long = "extra", value_parser = parse_extra)]
        extras: Vec<(String, String)>,
    },
    /// Show whether a flow has a pending request.
    Status {
        #[arg(long)]
        flow: FlowType,
    },
}

fn parse_extra(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = SdkConfig::load().into_diagnostic()?;
    if let Some(store_dir) = &cli.store_dir {
        config.store_dir = store_dir.clone();
    }

    let client = PaymentFlowClient::new(
        Box::new(StaticConfiguration::new(config.merchant.clone())),
        open_store(&cli, &config)?,
        agent(&cli),
        tokenizer(&config)?,
        config.return_scheme.clone(),
    );

    match cli.command {
        Command::Launch { params } => {
            let params: AuthParams = serde_json::from_str(&params).into_diagnostic()?;
            launch(&client, params).await
        }
        Command::Resume {
            flow,
            return_url,
            extras,
        } => {
            let mut event = match return_url {
                Some(uri) => ReturnEvent::from_uri(uri),
                None => ReturnEvent::dismissed(),
            };
            for (key, value) in extras {
                event = event.with_extra(key, value);
            }
            resume(&client, flow, event).await
        }
        Command::Status { flow } => {
            let pending = client.status(flow).await.into_diagnostic()?;
            print_line(json!({
                "flow": flow,
                "pending": pending.is_some(),
                "created_at": pending.map(|p| p.created_at),
            }));
            Ok(())
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(cli: &Cli, config: &SdkConfig) -> Result<PendingRequestStoreRef> {
    use payresume::infrastructure::rocksdb::RocksDBPendingStore;

    match &cli.db_path {
        Some(db_path) => {
            let store = RocksDBPendingStore::open(db_path).into_diagnostic()?;
            Ok(Arc::new(store))
        }
        None => file_store(config),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(cli: &Cli, config: &SdkConfig) -> Result<PendingRequestStoreRef> {
    if cli.db_path.is_some() {
        tracing::warn!(
            store_dir = %config.store_dir.display(),
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to the file store."
        );
    }
    file_store(config)
}

fn file_store(config: &SdkConfig) -> Result<PendingRequestStoreRef> {
    let store = FilePendingStore::open(&config.store_dir).into_diagnostic()?;
    Ok(Arc::new(store))
}

fn agent(cli: &Cli) -> ExternalAgentBox {
    let installed = InstalledApps::new(cli.installed_apps.iter().cloned());
    match &cli.open_with {
        Some(program) => Box::new(CommandAgent::new(program.clone(), installed)),
        None => Box::new(PrintingAgent::stderr(installed)),
    }
}

fn tokenizer(config: &SdkConfig) -> Result<TokenizeClientBox> {
    let Some(gateway_url) = &config.gateway_url else {
        return Ok(Box::new(UnconfiguredGateway));
    };
    let mut client = HttpTokenizeClient::try_from(gateway_url.as_str())
        .into_diagnostic()?
        .with_timeout(Duration::from_secs(config.gateway_timeout_secs));
    if let Some(token) = &config.gateway_token {
        client = client.with_bearer_token(token.clone());
    }
    Ok(Box::new(client))
}

async fn launch(client: &PaymentFlowClient, params: AuthParams) -> Result<()> {
    let flow = params.flow_type();
    match client.create_auth_request(flow, &params).await {
        PaymentAuthRequest::ReadyToLaunch(request) => match client.launch(&request).await {
            PendingOutcome::Started(pending) => {
                print_line(json!({
                    "status": "started",
                    "flow": flow,
                    "launch_url": request.target.url().as_str(),
                    "created_at": pending.created_at,
                }));
                Ok(())
            }
            PendingOutcome::Failure(err) => fail(flow, &err),
        },
        PaymentAuthRequest::LaunchNotRequired(nonce) => {
            print_line(json!({ "status": "success", "flow": flow, "nonce": nonce }));
            Ok(())
        }
        PaymentAuthRequest::Failure(err) => fail(flow, &err),
    }
}

async fn resume(client: &PaymentFlowClient, flow: FlowType, event: ReturnEvent) -> Result<()> {
    let mut delivered = None;
    let pending = client
        .complete_if_pending(flow, &event, |result| delivered = Some(result))
        .await;
    if !pending {
        print_line(json!({ "status": "none", "flow": flow }));
        return Ok(());
    }

    match delivered {
        Some(TokenizeResult::Success(nonce)) => {
            print_line(json!({ "status": "success", "flow": flow, "nonce": nonce }));
            Ok(())
        }
        Some(TokenizeResult::Cancel) => {
            print_line(json!({ "status": "cancel", "flow": flow }));
            Ok(())
        }
        Some(TokenizeResult::Failure(err)) => fail(flow, &err),
        None => Err(miette!("{flow} completed without delivering a result")),
    }
}

fn fail(flow: FlowType, err: &FlowError) -> Result<()> {
    print_line(json!({
        "status": "failure",
        "flow": flow,
        "code": err.code(),
        "message": err.to_string(),
    }));
    Err(miette!("{flow} failed: {err}"))
}

fn print_line(value: serde_json::Value) {
    println!("{value}");
}
