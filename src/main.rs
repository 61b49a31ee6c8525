use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use horizon_link::config::{ConfigError, ProviderConfig};
use horizon_link::providers::appwrite::AppwriteIdentity;
use horizon_link::providers::plaid::PlaidBankLink;
use horizon_link::providers::{LinkToken, ProviderError, PublicToken};
use horizon_link::services::credentials::{AuthStage, CredentialController, SubmissionFailure, SubmissionState};
use horizon_link::services::handshake::{HandshakeController, LinkingState};
use horizon_link::services::link_token::LinkTokenSession;
use horizon_link::services::link_ui::{LinkLauncher, LinkSession, link_channel};
use horizon_link::services::schema::{CredentialForm, WorkflowMode};
use horizon_link::state::navigation_channel;
use tracing::info;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("provider setup failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("stdin read failed: {0}")]
    Stdin(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "horizon", about = "Horizon account sign-in, sign-up and bank linking")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in to an existing account.
    SignIn(CredentialArgs),
    /// Create an account, then link a bank.
    SignUp(SignUpArgs),
}

#[derive(Args, Debug)]
struct CredentialArgs {
    #[arg(long, env = "HORIZON_EMAIL")]
    email: String,

    #[arg(long, env = "HORIZON_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct SignUpArgs {
    #[command(flatten)]
    credentials: CredentialArgs,

    #[arg(long, default_value = "")]
    first_name: String,

    #[arg(long, default_value = "")]
    last_name: String,

    #[arg(long, default_value = "")]
    address: String,

    #[arg(long, default_value = "")]
    city: String,

    #[arg(long, default_value = "", help = "Two-letter state, e.g. NY")]
    state: String,

    #[arg(long, default_value = "")]
    postal_code: String,

    #[arg(long, default_value = "", help = "mm-dd-yyyy")]
    date_of_birth: String,

    #[arg(long, alias = "ssn", default_value = "")]
    tax_id: String,
}

impl Command {
    fn into_form(self) -> (WorkflowMode, CredentialForm) {
        match self {
            Self::SignIn(args) => (WorkflowMode::SignIn, CredentialForm::sign_in(args.email, args.password)),
            Self::SignUp(args) => (
                WorkflowMode::SignUp,
                CredentialForm {
                    first_name: args.first_name,
                    last_name: args.last_name,
                    address: args.address,
                    city: args.city,
                    state: args.state,
                    postal_code: args.postal_code,
                    date_of_birth: args.date_of_birth,
                    tax_id: args.tax_id,
                    email: args.credentials.email,
                    password: args.credentials.password,
                },
            ),
        }
    }
}

/// Stands in for the hosted linking UI: prints the link token and reads the
/// resulting public token from stdin. An empty line cancels.
struct StdinLauncher;

impl LinkLauncher for StdinLauncher {
    fn open(&self, token: &LinkToken) -> LinkSession {
        let (completion, session) = link_channel();
        println!("link token: {}", token.as_str());
        println!("finish bank selection, then paste the public token (empty line cancels):");
        tokio::task::spawn_blocking(move || {
            let mut line = String::new();
            match io::stdin().read_line(&mut line) {
                Ok(_) if line.trim().is_empty() => completion.cancel(),
                Ok(_) => completion.succeed(PublicToken::new(line.trim())),
                Err(e) => completion.fail(e.to_string()),
            }
        });
        session
    }
}

async fn confirm(prompt: &str) -> Result<bool, CliError> {
    println!("{prompt} [y/N]");
    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        io::stdin().read_line(&mut line).map(|_| line)
    })
    .await
    .map_err(io::Error::other)??;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

#[tokio::main]
async fn main() -> Result<ExitCode, CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ProviderConfig::from_env()?;
    let (navigator, mut navigation) = navigation_channel();

    let identity = Arc::new(AppwriteIdentity::new(&config.appwrite, config.timeouts)?);
    let (mode, form) = cli.command.into_form();
    let credentials = CredentialController::new(mode, identity, navigator.clone());

    println!("{}", credentials.stage().heading());
    match credentials.submit(form).await {
        SubmissionState::Succeeded(user) => info!(user_id = %user.id, %mode, "signed in"),
        SubmissionState::Failed(SubmissionFailure::Validation(errors)) => {
            for (field, message) in errors.iter() {
                eprintln!("{}: {message}", field.label());
            }
            return Ok(ExitCode::FAILURE);
        }
        SubmissionState::Failed(failure) => {
            eprintln!("{failure}");
            return Ok(ExitCode::FAILURE);
        }
        SubmissionState::Idle | SubmissionState::Submitting => return Ok(ExitCode::FAILURE),
    }

    let stage = credentials.stage();
    if let AuthStage::LinkAccount(user) = &stage {
        println!("{}: {}", stage.heading(), stage.subtitle());

        let bank = Arc::new(PlaidBankLink::new(&config.plaid, config.timeouts)?);
        let handshake = HandshakeController::new(LinkTokenSession::new(), bank, Arc::new(StdinLauncher), navigator);

        if !handshake.mount(user.clone()).await.is_enabled() {
            eprintln!("bank linking is unavailable right now, try again later");
            return Ok(ExitCode::FAILURE);
        }

        loop {
            println!("{}", handshake.button_label());
            match handshake.activate().await {
                LinkingState::Linked => break,
                LinkingState::Ready => {
                    println!("bank linking cancelled");
                    break;
                }
                LinkingState::Failed(failure) => {
                    eprintln!("{failure}");
                    if !confirm("retry linking?").await? {
                        return Ok(ExitCode::FAILURE);
                    }
                }
                LinkingState::Idle | LinkingState::AwaitingToken | LinkingState::Linking => {
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    while let Ok(to) = navigation.try_recv() {
        println!("navigate: {}", to.path());
    }
    Ok(ExitCode::SUCCESS)
}
