use crate::{
    config::{AnnotationPolicy, SecurityContextMode},
    consts::{
        ANNOTATION_POLICY_ENV_VAR, DEFAULT_RUNTIME_HTTP_PORT, FUNCTIONS_DEFAULT_NAMESPACE,
        FUNCTIONS_NAMESPACE_ENV_VAR, HTTP_PROBE_ENV_VAR, PROVIDER_ADDRESS_ENV_VAR,
        PROVIDER_DEFAULT_ADDRESS, PROVIDER_DEFAULT_URL, PROVIDER_URL_ENV_VAR,
        RUNTIME_HTTP_PORT_ENV_VAR, SECURITY_CONTEXT_ENV_VAR,
    },
};
use clap::{ArgAction, Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf};
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs the OpenFaaS functions provider
    #[clap(visible_alias = "r")]
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// Talks to a running provider
    #[clap(visible_alias = "cl")]
    Client {
        /// The URL of the provider
        #[clap(short = 'u', long, env = PROVIDER_URL_ENV_VAR, default_value = PROVIDER_DEFAULT_URL)]
        provider_url: Url,
        /// The username for the provider
        #[clap(long)]
        username: Option<String>,
        /// The password for the provider
        #[clap(long)]
        password: Option<String>,
        /// The path to a file containing the username for the provider
        /// If this is set, the username argument is ignored
        #[clap(long)]
        username_file: Option<PathBuf>,
        /// The path to a file containing the password for the provider
        /// If this is set, the password argument is ignored
        #[clap(long)]
        password_file: Option<PathBuf>,

        #[command(subcommand)]
        command: ClientCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum RunCommands {
    /// Serves the function endpoints backed by the cluster
    #[clap(visible_alias = "p")]
    Provider {
        /// The default namespace for OpenFaaS functions
        #[clap(short = 'n', long, env = FUNCTIONS_NAMESPACE_ENV_VAR, default_value = FUNCTIONS_DEFAULT_NAMESPACE)]
        functions_namespace: String,
        /// The address to listen on
        #[clap(short, long, env = PROVIDER_ADDRESS_ENV_VAR, default_value = PROVIDER_DEFAULT_ADDRESS)]
        address: SocketAddr,
        /// How existing annotations are reconciled with the requested ones
        #[clap(long, env = ANNOTATION_POLICY_ENV_VAR, value_enum, default_value_t = AnnotationPolicy::default())]
        annotation_policy: AnnotationPolicy,
        /// Security context applied to function containers
        #[clap(long, env = SECURITY_CONTEXT_ENV_VAR, value_enum, default_value_t = SecurityContextMode::default())]
        security_context: SecurityContextMode,
        /// Use HTTP probes instead of exec probes
        #[clap(long, env = HTTP_PROBE_ENV_VAR, action = ArgAction::Set, default_value_t = true)]
        http_probe: bool,
        /// Port probed when the function container declares none
        #[clap(long, env = RUNTIME_HTTP_PORT_ENV_VAR, default_value_t = DEFAULT_RUNTIME_HTTP_PORT)]
        runtime_http_port: i32,
    },
}

#[derive(Subcommand, Debug)]
pub enum ClientCommands {
    /// Updates a deployed function from a yaml or json file
    #[clap(visible_alias = "up")]
    Update {
        /// The path to the file to read the function deployment from
        #[clap(short = 'f', long)]
        file: PathBuf,
        /// The namespace of the function
        #[clap(short, long)]
        namespace: Option<String>,
    },
    /// Lists deployed functions
    #[clap(visible_alias = "ls")]
    List {
        /// The namespace to list
        #[clap(short, long)]
        namespace: Option<String>,
    },
    /// Prints the status of a single function
    #[clap(visible_alias = "g")]
    Get {
        name: String,
        /// The namespace of the function
        #[clap(short, long)]
        namespace: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_provider_flags() {
        let cli = Cli::try_parse_from([
            "provide-rs",
            "run",
            "provider",
            "--annotation-policy",
            "merge",
            "--security-context",
            "non-root",
            "--http-probe",
            "false",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                command:
                    RunCommands::Provider {
                        annotation_policy,
                        security_context,
                        http_probe,
                        ..
                    },
            } => {
                assert_eq!(annotation_policy, AnnotationPolicy::Merge);
                assert_eq!(security_context, SecurityContextMode::NonRoot);
                assert!(!http_probe);
            }
            command => panic!("unexpected command: {command:?}"),
        }
    }
}
