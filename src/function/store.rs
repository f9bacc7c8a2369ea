use super::errors::StoreError;
use async_trait::async_trait;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service};
use kube::{
    api::{ListParams, PostParams},
    Api, Client as KubeClient, Error as KubeError, ResourceExt,
};

#[cfg(test)]
use mockall::automock;

const DEPLOYMENT_KIND: &str = "Deployment";
const SERVICE_KIND: &str = "Service";

/// Single-attempt access to the objects backing a function.
///
/// Updates carry the `resourceVersion` of the fetched object, so a write that
/// raced with another writer fails with [`StoreError::Conflict`] instead of
/// silently overwriting it.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FunctionStore: Send + Sync {
    async fn get_workload(&self, namespace: &str, name: &str) -> Result<Deployment, StoreError>;

    async fn update_workload(
        &self,
        namespace: &str,
        workload: &Deployment,
    ) -> Result<(), StoreError>;

    async fn get_endpoint(&self, namespace: &str, name: &str) -> Result<Service, StoreError>;

    async fn update_endpoint(&self, namespace: &str, endpoint: &Service)
        -> Result<(), StoreError>;

    async fn list_workloads(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<Deployment>, StoreError>;
}

pub struct KubeFunctionStore {
    kubernetes_client: KubeClient,
}

impl KubeFunctionStore {
    pub fn new(kubernetes_client: KubeClient) -> Self {
        Self { kubernetes_client }
    }

    fn deployment_api(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.kubernetes_client.clone(), namespace)
    }

    fn service_api(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.kubernetes_client.clone(), namespace)
    }
}

fn map_kube_error(kind: &'static str, name: &str, namespace: &str, error: KubeError) -> StoreError {
    match error {
        KubeError::Api(ref response) if response.code == 404 => StoreError::NotFound {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
        },
        KubeError::Api(ref response) if response.code == 409 => StoreError::Conflict {
            kind,
            name: name.to_string(),
        },
        error => StoreError::Unavailable(error),
    }
}

#[async_trait]
impl FunctionStore for KubeFunctionStore {
    async fn get_workload(&self, namespace: &str, name: &str) -> Result<Deployment, StoreError> {
        self.deployment_api(namespace)
            .get(name)
            .await
            .map_err(|error| map_kube_error(DEPLOYMENT_KIND, name, namespace, error))
    }

    async fn update_workload(
        &self,
        namespace: &str,
        workload: &Deployment,
    ) -> Result<(), StoreError> {
        let name = workload.name_any();

        self.deployment_api(namespace)
            .replace(&name, &PostParams::default(), workload)
            .await
            .map_err(|error| map_kube_error(DEPLOYMENT_KIND, &name, namespace, error))?;

        Ok(())
    }

    async fn get_endpoint(&self, namespace: &str, name: &str) -> Result<Service, StoreError> {
        self.service_api(namespace)
            .get(name)
            .await
            .map_err(|error| map_kube_error(SERVICE_KIND, name, namespace, error))
    }

    async fn update_endpoint(
        &self,
        namespace: &str,
        endpoint: &Service,
    ) -> Result<(), StoreError> {
        let name = endpoint.name_any();

        self.service_api(namespace)
            .replace(&name, &PostParams::default(), endpoint)
            .await
            .map_err(|error| map_kube_error(SERVICE_KIND, &name, namespace, error))?;

        Ok(())
    }

    async fn list_workloads(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<Deployment>, StoreError> {
        let deployments = self
            .deployment_api(namespace)
            .list(&ListParams::default().labels(selector))
            .await
            .map_err(StoreError::Unavailable)?;

        Ok(deployments.items)
    }
}
