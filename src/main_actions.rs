use crate::{
    config::ProviderConfig,
    faas_client::{BasicAuth, FaasClient},
    function::{secrets::KubeSecretResolver, store::KubeFunctionStore},
    provider::Provider,
    types::FunctionDeployment,
};
use anyhow::{Context, Result as AnyResult};
use kube::Client as KubeClient;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing::{trace_span, Instrument};

pub async fn run_provider(config: ProviderConfig, address: SocketAddr) -> AnyResult<()> {
    tracing::info!(
        functions_namespace = %config.functions_namespace,
        annotation_policy = %config.annotation_policy,
        security_context = %config.security_context,
        http_probe = config.probes.http_probe,
        runtime_http_port = config.runtime_http_port,
        "Running with current config."
    );

    let client = KubeClient::try_default()
        .instrument(trace_span!("CreateClient"))
        .await
        .context("Failed to create kubernetes client")?;

    let store = Arc::new(KubeFunctionStore::new(client.clone()));
    let secret_resolver = Arc::new(KubeSecretResolver::new(client));

    Provider::new(config, store, secret_resolver)
        .serve(address)
        .await
        .context("Provider failed")?;

    Ok(())
}

pub async fn read_basic_auth(
    username: Option<String>,
    password: Option<String>,
    username_file: Option<PathBuf>,
    password_file: Option<PathBuf>,
) -> AnyResult<Option<BasicAuth>> {
    let username = match username_file {
        Some(path) => Some(read_secret_file(path).await?),
        None => username,
    };

    let password = match password_file {
        Some(path) => Some(read_secret_file(path).await?),
        None => password,
    };

    match (username, password) {
        (Some(username), Some(password)) => Ok(Some(BasicAuth::new(username, password))),
        (None, None) => Ok(None),
        _ => {
            tracing::warn!("Only one of username and password is set. Ignoring both.");
            Ok(None)
        }
    }
}

async fn read_secret_file(path: PathBuf) -> AnyResult<String> {
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    Ok(content.trim().to_string())
}

pub async fn read_function_deployment_from_file(path: PathBuf) -> AnyResult<FunctionDeployment> {
    let content = tokio::fs::read_to_string(path)
        .await
        .context("Failed to read function deployment from file")?;

    // yaml is a superset of json, both are accepted
    let function_deployment =
        serde_yaml::from_str(&content).context("Failed to parse function deployment")?;

    Ok(function_deployment)
}

pub async fn update_function(
    client: &FaasClient,
    file: PathBuf,
    namespace: Option<String>,
) -> AnyResult<()> {
    let function_deployment = read_function_deployment_from_file(file).await?;

    client
        .update_function(&function_deployment, namespace.as_deref())
        .await
        .with_context(|| format!("Failed to update function {}", function_deployment.service))?;

    tracing::info!(service = %function_deployment.service, "Update accepted.");

    Ok(())
}

pub async fn list_functions(client: &FaasClient, namespace: Option<String>) -> AnyResult<()> {
    let functions = client
        .list_functions(namespace.as_deref())
        .await
        .context("Failed to list functions")?;

    print_yaml(&functions)
}

pub async fn get_function(
    client: &FaasClient,
    name: String,
    namespace: Option<String>,
) -> AnyResult<()> {
    let function = client
        .get_function(&name, namespace.as_deref())
        .await
        .with_context(|| format!("Failed to get function {name}"))?;

    print_yaml(&function)
}

fn print_yaml<T: serde::Serialize + ?Sized>(value: &T) -> AnyResult<()> {
    println!(
        "{}",
        serde_yaml::to_string(value).context("Failed to serialize to yaml")?
    );
    Ok(())
}
