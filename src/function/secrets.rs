use super::errors::SecretError;
use crate::consts::{SECRETS_MOUNT_PATH, SECRETS_VOLUME_SUFFIX};
use async_trait::async_trait;
use futures::future::try_join_all;
use k8s_openapi::api::core::v1::{
    KeyToPath, PodSpec, ProjectedVolumeSource, Secret, SecretProjection, Volume, VolumeMount,
    VolumeProjection,
};
use kube::{Api, Client as KubeClient};

#[cfg(test)]
use mockall::automock;

/// A secret that exists in the function's namespace, with its data keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretHandle {
    pub name: String,
    /// Sorted.
    pub keys: Vec<String>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Resolves every name or fails on the first missing one. The result keeps the input order.
    async fn resolve_secrets(
        &self,
        namespace: &str,
        names: &[String],
    ) -> Result<Vec<SecretHandle>, SecretError>;
}

pub struct KubeSecretResolver {
    kubernetes_client: KubeClient,
}

impl KubeSecretResolver {
    pub fn new(kubernetes_client: KubeClient) -> Self {
        Self { kubernetes_client }
    }
}

#[async_trait]
impl SecretResolver for KubeSecretResolver {
    async fn resolve_secrets(
        &self,
        namespace: &str,
        names: &[String],
    ) -> Result<Vec<SecretHandle>, SecretError> {
        let secrets_api: Api<Secret> = Api::namespaced(self.kubernetes_client.clone(), namespace);

        try_join_all(names.iter().map(|name| {
            let secrets_api = secrets_api.clone();
            async move {
                let secret = secrets_api
                    .get_opt(name)
                    .await
                    .map_err(|error| SecretError::Get {
                        name: name.clone(),
                        error,
                    })?
                    .ok_or_else(|| SecretError::NotFound(name.clone()))?;

                Ok::<_, SecretError>(SecretHandle::from_secret(name, &secret))
            }
        }))
        .await
    }
}

impl SecretHandle {
    pub fn from_secret(name: &str, secret: &Secret) -> Self {
        let mut keys: Vec<String> = secret
            .data
            .iter()
            .flat_map(|data| data.keys())
            .chain(secret.string_data.iter().flat_map(|data| data.keys()))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();

        Self {
            name: name.to_string(),
            keys,
        }
    }

    fn to_volume_projection(&self) -> VolumeProjection {
        let items = self
            .keys
            .iter()
            .map(|key| KeyToPath {
                key: key.clone(),
                path: key.clone(),
                ..Default::default()
            })
            .collect();

        VolumeProjection {
            secret: Some(SecretProjection {
                name: Some(self.name.clone()),
                items: Some(items),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

pub fn to_secrets_volume_name(service: &str) -> String {
    format!("{service}{SECRETS_VOLUME_SUFFIX}")
}

/// Replaces the function's projected secrets volume and its mount with `secrets`.
/// Other volumes and mounts are left untouched.
pub fn apply_secrets(pod_spec: &mut PodSpec, service: &str, secrets: &[SecretHandle]) {
    let volume_name = to_secrets_volume_name(service);

    let volumes = pod_spec.volumes.get_or_insert_with(Vec::new);
    volumes.retain(|volume| volume.name != volume_name);
    if !secrets.is_empty() {
        volumes.push(Volume {
            name: volume_name.clone(),
            projected: Some(ProjectedVolumeSource {
                sources: Some(secrets.iter().map(SecretHandle::to_volume_projection).collect()),
                ..Default::default()
            }),
            ..Default::default()
        });
    }
    if volumes.is_empty() {
        pod_spec.volumes = None;
    }

    for container in pod_spec.containers.iter_mut() {
        let mounts = container.volume_mounts.get_or_insert_with(Vec::new);
        mounts.retain(|mount| mount.name != volume_name);
        if !secrets.is_empty() {
            mounts.push(VolumeMount {
                name: volume_name.clone(),
                mount_path: String::from(SECRETS_MOUNT_PATH),
                read_only: Some(true),
                ..Default::default()
            });
        }
        if mounts.is_empty() {
            container.volume_mounts = None;
        }
    }
}
