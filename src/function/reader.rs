use super::{
    errors::{ReadError, StoreError},
    store::FunctionStore,
};
use crate::{config::ProviderConfig, types::FunctionStatus};
use k8s_openapi::api::apps::v1::Deployment;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{trace_span, Instrument};

/// Projects a deployment into a [`FunctionStatus`].
///
/// Returns `None` for a deployment without containers.
pub fn project_one(deployment: &Deployment) -> Option<FunctionStatus> {
    let spec = deployment.spec.as_ref()?;
    let container = spec.template.spec.as_ref()?.containers.first()?;
    let template_metadata = spec.template.metadata.clone().unwrap_or_default();

    let available_replicas = deployment
        .status
        .as_ref()
        .and_then(|status| status.available_replicas)
        .unwrap_or_default();

    Some(FunctionStatus {
        name: deployment.name_any(),
        image: container.image.clone().unwrap_or_default(),
        invocation_count: 0,
        replicas: non_negative(spec.replicas.unwrap_or_default()),
        available_replicas: non_negative(available_replicas),
        labels: template_metadata.labels.unwrap_or_default(),
        annotations: template_metadata.annotations.unwrap_or_default(),
        namespace: deployment.namespace().unwrap_or_default(),
    })
}

fn non_negative(replicas: i32) -> u64 {
    u64::try_from(replicas).unwrap_or_default()
}

pub struct FunctionReader {
    store: Arc<dyn FunctionStore>,
    selector: String,
}

impl FunctionReader {
    pub fn new(config: &ProviderConfig, store: Arc<dyn FunctionStore>) -> Self {
        Self {
            store,
            selector: config.owned_labels.function_key.clone(),
        }
    }

    /// Every function in `namespace`. Deployments that cannot be projected are skipped.
    pub async fn list_functions(&self, namespace: &str) -> Result<Vec<FunctionStatus>, ReadError> {
        let selector = &self.selector;

        async move {
            let deployments = self
                .store
                .list_workloads(namespace, selector)
                .await
                .map_err(ReadError::List)?;

            let functions: Vec<FunctionStatus> = deployments
                .iter()
                .filter_map(|deployment| {
                    let function = project_one(deployment);
                    if function.is_none() {
                        tracing::warn!(name = %deployment.name_any(), "Deployment has no containers. Skipping.");
                    }
                    function
                })
                .collect();

            tracing::debug!(functions = functions.len(), "Functions listed.");

            Ok(functions)
        }
        .instrument(trace_span!("ListFunctions", %namespace, %selector))
        .await
    }

    /// `Ok(None)` when the function does not exist or cannot be projected.
    pub async fn get_function(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<FunctionStatus>, ReadError> {
        match self.store.get_workload(namespace, name).await {
            Ok(deployment) => Ok(project_one(&deployment)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(error) => Err(ReadError::Get(error)),
        }
    }
}
