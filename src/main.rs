use anyhow::Result as AnyResult;
use clap::Parser;
use openfaas_functions_provide_rs::{
    cli::{ClientCommands, Cli, Commands, RunCommands},
    config::{ProbeConfig, ProviderConfig},
    consts::{DISPLAY_NAME, PKG_NAME, PKG_VERSION},
    faas_client::FaasClient,
    main_actions,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var(
            "RUST_LOG",
            "openfaas_functions_provide_rs=info,tower_http=off,hyper=off",
        );
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_level(true)
        .with_ansi(true)
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { command } => match command {
            RunCommands::Provider {
                functions_namespace,
                address,
                annotation_policy,
                security_context,
                http_probe,
                runtime_http_port,
            } => {
                tracing::info!(
                    name = DISPLAY_NAME,
                    package = PKG_NAME,
                    version = PKG_VERSION,
                    "Starting."
                );

                let config = ProviderConfig {
                    functions_namespace,
                    annotation_policy,
                    security_context,
                    probes: ProbeConfig {
                        http_probe,
                        ..Default::default()
                    },
                    runtime_http_port,
                    ..Default::default()
                };

                main_actions::run_provider(config, address).await?;
            }
        },
        Commands::Client {
            provider_url,
            username,
            password,
            username_file,
            password_file,
            command,
        } => {
            let basic_auth =
                main_actions::read_basic_auth(username, password, username_file, password_file)
                    .await?;
            let client = FaasClient::new(provider_url, basic_auth);

            match command {
                ClientCommands::Update { file, namespace } => {
                    main_actions::update_function(&client, file, namespace).await?;
                }
                ClientCommands::List { namespace } => {
                    main_actions::list_functions(&client, namespace).await?;
                }
                ClientCommands::Get { name, namespace } => {
                    main_actions::get_function(&client, name, namespace).await?;
                }
            }
        }
    }

    Ok(())
}
