use appointment_confirm::application::assistant::ConversationalAssistant;
use appointment_confirm::application::orchestrator::ConfirmationOrchestrator;
use appointment_confirm::config::{
    AppConfig, ChatConfig, EmailConfig, StripeConfig, SupabaseConfig, TimeoutsBuilder,
};
use appointment_confirm::domain::ports::{
    AppointmentRepositoryRef, ChatModelRef, EmailProviderRef,
};
use appointment_confirm::error::ConfigError;
use appointment_confirm::infrastructure::http_client::build_client;
use appointment_confirm::infrastructure::in_memory::{
    InMemoryAppointmentRepository, OutboxEmailProvider,
};
use appointment_confirm::infrastructure::openai::{self, OpenAiChatModel};
use appointment_confirm::infrastructure::resend::{self, ResendEmailProvider};
use appointment_confirm::infrastructure::stripe::{self, StripePaymentProvider};
use appointment_confirm::infrastructure::supabase::{
    SupabaseAppointmentRepository, SupabaseIdentityProvider,
};
use appointment_confirm::interfaces::http::{AppState, router};
use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    providers: ProviderArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
        listen: SocketAddr,
    },
    /// Confirm a single paid checkout session and print the result
    Confirm {
        #[arg(long)]
        session_id: String,

        /// Bearer token of the patient who paid
        #[arg(long, env = "CONFIRM_TOKEN")]
        token: String,
    },
}

#[derive(Args)]
struct ProviderArgs {
    #[arg(long, env = "STRIPE_SECRET_KEY", hide_env_values = true)]
    stripe_secret_key: String,

    #[arg(long, env = "STRIPE_API_BASE", default_value = stripe::DEFAULT_API_BASE)]
    stripe_api_base: String,

    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: String,

    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    supabase_anon_key: String,

    /// Store appointments in Supabase (requires the appointments migration)
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    supabase_service_role_key: Option<String>,

    /// Path to a local RocksDB database. Takes precedence over Supabase storage.
    #[arg(long, env = "APPOINTMENTS_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Without a key, confirmation emails are kept in an in-process outbox.
    #[arg(long, env = "RESEND_API_KEY", hide_env_values = true)]
    resend_api_key: Option<String>,

    #[arg(long, env = "RESEND_API_BASE", default_value = resend::DEFAULT_API_BASE)]
    resend_api_base: String,

    #[arg(long, env = "EMAIL_FROM", default_value = "Appointments <appointments@example.com>")]
    email_from: String,

    #[arg(long, env = "CHAT_API_KEY", hide_env_values = true)]
    chat_api_key: Option<String>,

    #[arg(long, env = "CHAT_API_BASE", default_value = openai::DEFAULT_API_BASE)]
    chat_api_base: String,

    #[arg(long, env = "CHAT_MODEL", default_value = openai::DEFAULT_MODEL)]
    chat_model: String,

    /// Timeout in seconds for payment, storage and email calls
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value_t = 10)]
    provider_timeout_secs: u64,
}

impl ProviderArgs {
    fn to_config(&self) -> std::result::Result<AppConfig, ConfigError> {
        if self.provider_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "PROVIDER_TIMEOUT_SECS",
                reason: "must be at least 1 second".to_string(),
            });
        }
        let provider_timeout = Duration::from_secs(self.provider_timeout_secs);
        Ok(AppConfig {
            stripe: StripeConfig {
                secret_key: self.stripe_secret_key.clone(),
                api_base: self.stripe_api_base.clone(),
            },
            supabase: SupabaseConfig {
                url: self.supabase_url.clone(),
                anon_key: self.supabase_anon_key.clone(),
                service_role_key: self.supabase_service_role_key.clone(),
            },
            email: EmailConfig {
                resend_api_key: self.resend_api_key.clone(),
                api_base: self.resend_api_base.clone(),
                from: self.email_from.clone(),
            },
            chat: ChatConfig {
                api_key: self.chat_api_key.clone(),
                api_base: self.chat_api_base.clone(),
                model: self.chat_model.clone(),
            },
            timeouts: TimeoutsBuilder::new()
                .payment(provider_timeout)
                .store(provider_timeout)
                .email(provider_timeout)
                .build(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.providers.to_config().into_diagnostic()?;
    let client = build_client(config.timeouts.chat)
        .map_err(ConfigError::from)
        .into_diagnostic()?;

    let repository = build_repository(&cli.providers, &config, &client)?;
    let email = build_email_provider(&config, &client);

    let orchestrator = Arc::new(ConfirmationOrchestrator::new(
        Arc::new(SupabaseIdentityProvider::new(&config.supabase, client.clone())),
        Arc::new(StripePaymentProvider::new(&config.stripe, client.clone())),
        repository,
        email,
        config.timeouts,
    ));

    match cli.command {
        Command::Serve { listen } => {
            let chat_model = build_chat_model(&config, &client).into_diagnostic()?;
            let assistant = Arc::new(ConversationalAssistant::new(chat_model, config.timeouts.chat));
            let app = router(AppState {
                orchestrator,
                assistant,
            });

            let listener = tokio::net::TcpListener::bind(listen).await.into_diagnostic()?;
            info!("Listening on {}", listen);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .into_diagnostic()?;
        }
        Command::Confirm { session_id, token } => {
            let result = orchestrator
                .confirm(Some(&token), &session_id)
                .await
                .map_err(|e| miette!("{} [{}]", e, e.kind()))?;
            println!("{}", serde_json::to_string(&result).into_diagnostic()?);
        }
    }

    Ok(())
}

fn build_repository(
    args: &ProviderArgs,
    config: &AppConfig,
    client: &reqwest::Client,
) -> Result<AppointmentRepositoryRef> {
    if let Some(db_path) = &args.db_path {
        #[cfg(feature = "storage-rocksdb")]
        {
            use appointment_confirm::infrastructure::rocksdb::RocksDbAppointmentRepository;
            info!("Storing appointments in RocksDB at {}", db_path.display());
            let repository = RocksDbAppointmentRepository::open(db_path).into_diagnostic()?;
            return Ok(Arc::new(repository));
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        {
            warn!(
                "Persistent storage requested at {}, but the 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage.",
                db_path.display()
            );
            return Ok(Arc::new(InMemoryAppointmentRepository::new()));
        }
    }

    if let Some(service_role_key) = &config.supabase.service_role_key {
        info!("Storing appointments in Supabase");
        return Ok(Arc::new(SupabaseAppointmentRepository::new(
            &config.supabase.url,
            service_role_key,
            client.clone(),
        )));
    }

    warn!("No persistent storage configured; appointments are kept in memory only");
    Ok(Arc::new(InMemoryAppointmentRepository::new()))
}

fn build_email_provider(config: &AppConfig, client: &reqwest::Client) -> EmailProviderRef {
    match &config.email.resend_api_key {
        Some(api_key) => Arc::new(ResendEmailProvider::new(api_key, &config.email, client.clone())),
        None => {
            warn!("RESEND_API_KEY not set; confirmation emails are captured in memory, not delivered");
            Arc::new(OutboxEmailProvider::new())
        }
    }
}

fn build_chat_model(
    config: &AppConfig,
    client: &reqwest::Client,
) -> std::result::Result<ChatModelRef, ConfigError> {
    let api_key = config
        .chat
        .api_key
        .as_deref()
        .ok_or(ConfigError::Missing("CHAT_API_KEY"))?;
    Ok(Arc::new(OpenAiChatModel::new(api_key, &config.chat, client.clone())))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
