use crate::consts::{ENV_PROCESS_NAME, MIN_REPLICAS_LABEL, SERVICE_ACCOUNT_ANNOTATION};
use itertools::Itertools;
use k8s_openapi::api::core::v1::EnvVar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDeployment {
    /// service is the name of the function deployment
    pub service: String,

    /// image is a fully-qualified container image
    pub image: String,

    /// namespace for the function, if supported by the faas-provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// envProcess overrides the fprocess environment variable and can be used
    /// with the watchdog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_process: Option<String>,

    /// envVars can be provided to set environment variables for the function runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_vars: Option<BTreeMap<String, String>>,

    /// constraints are specific to the faas-provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Vec<String>>,

    /// secrets list of secrets to be made available to function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets: Option<Vec<String>>,

    /// labels are metadata for functions which may be used by the
    /// faas-provider or the gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    /// annotations are metadata for functions which may be used by the
    /// faas-provider or the gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,

    /// limits for function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<FunctionResources>,

    /// requests of resources requested by function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<FunctionResources>,

    /// readOnlyRootFilesystem removes write-access from the root filesystem
    /// mount-point.
    #[serde(default)]
    pub read_only_root_filesystem: bool,
}

/// FunctionResources Memory and CPU
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct FunctionResources {
    /// memory is the memory quantity for the function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    /// cpu is the cpu quantity for the function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
}

/// Read-only view of a deployed function.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct FunctionStatus {
    pub name: String,
    pub image: String,
    /// Owned by the metrics collaborator, always zero here.
    pub invocation_count: u64,
    pub replicas: u64,
    pub available_replicas: u64,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub namespace: String,
}

impl FunctionDeployment {
    pub fn to_name(&self) -> String {
        self.service.clone()
    }

    /// `fprocess` (if any) followed by the env vars, sorted by name.
    pub fn to_env_vars(&self) -> Vec<EnvVar> {
        let process = self.env_process.iter().map(|env_process| EnvVar {
            name: String::from(ENV_PROCESS_NAME),
            value: Some(env_process.clone()),
            ..Default::default()
        });

        let vars = self.env_vars.iter().flatten().map(|(name, value)| EnvVar {
            name: name.clone(),
            value: Some(value.clone()),
            ..Default::default()
        });

        process
            .chain(vars)
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .collect()
    }

    pub fn to_annotations(&self) -> BTreeMap<String, String> {
        self.annotations.clone().unwrap_or_default()
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations
            .as_ref()
            .and_then(|annotations| annotations.get(key))
            .map(String::as_str)
    }

    /// Replica count hint from the `com.openfaas.scale.min` label. Only positive values count.
    pub fn min_replicas(&self) -> Option<i32> {
        self.labels
            .as_ref()?
            .get(MIN_REPLICAS_LABEL)?
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|replicas| *replicas > 0)
    }

    pub fn service_account(&self) -> Option<String> {
        self.annotation(SERVICE_ACCOUNT_ANNOTATION)
            .filter(|account| !account.is_empty())
            .map(String::from)
    }

    /// Secret names in request order without duplicates.
    pub fn get_secrets_unique_vec(&self) -> Vec<String> {
        self.secrets
            .iter()
            .flatten()
            .filter(|secret| !secret.is_empty())
            .unique()
            .cloned()
            .collect()
    }
}
