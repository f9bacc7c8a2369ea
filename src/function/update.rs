use super::{
    errors::{ReconcileError, StoreError, ValidationError},
    parse::{parse_constraints, parse_resources},
    probes::{FunctionProbes, ProbeBuilder},
    secrets::{apply_secrets, SecretHandle, SecretResolver},
    security::{security_context_configurator, SecurityContextConfigurator},
    store::FunctionStore,
};
use crate::{
    config::{AnnotationPolicy, OwnedLabels, ProviderConfig},
    types::FunctionDeployment,
};
use k8s_openapi::api::{
    apps::v1::{Deployment, DeploymentSpec},
    core::v1::{Container, PodSpec, ResourceRequirements},
};
use std::{
    collections::BTreeMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{trace_span, Instrument};

/// Everything derived from the request before the deployment is touched.
struct ReconcilePlan {
    node_selector: BTreeMap<String, String>,
    resources: ResourceRequirements,
    probes: FunctionProbes,
    secrets: Vec<SecretHandle>,
}

/// Merges a [`FunctionDeployment`] into an existing deployment and service.
///
/// One reconcile is one fetch and one commit per object. Nothing is retried
/// and nothing is cached between calls.
pub struct Reconciler {
    store: Arc<dyn FunctionStore>,
    secret_resolver: Arc<dyn SecretResolver>,
    security: Box<dyn SecurityContextConfigurator>,
    probe_builder: ProbeBuilder,
    owned_labels: OwnedLabels,
    annotation_policy: AnnotationPolicy,
    runtime_http_port: i32,
}

impl Reconciler {
    pub fn new(
        config: &ProviderConfig,
        store: Arc<dyn FunctionStore>,
        secret_resolver: Arc<dyn SecretResolver>,
    ) -> Self {
        Self {
            store,
            secret_resolver,
            security: security_context_configurator(config.security_context),
            probe_builder: ProbeBuilder::new(config.probes.clone()),
            owned_labels: config.owned_labels.clone(),
            annotation_policy: config.annotation_policy,
            runtime_http_port: config.runtime_http_port,
        }
    }

    pub async fn reconcile(
        &self,
        namespace: &str,
        request: &FunctionDeployment,
    ) -> Result<(), ReconcileError> {
        let service = request.to_name();

        async move {
            self.update_deployment(namespace, request)
                .instrument(trace_span!("UpdateDeployment"))
                .await?;

            self.update_service(namespace, request)
                .instrument(trace_span!("UpdateService"))
                .await
                .map_err(|error| {
                    tracing::error!(%error, "Deployment updated but service update failed.");
                    ReconcileError::PartialReconcile(error)
                })?;

            tracing::info!("Function reconciled.");

            Ok(())
        }
        .instrument(trace_span!("ReconcileFunction", %namespace, %service))
        .await
    }

    async fn update_deployment(
        &self,
        namespace: &str,
        request: &FunctionDeployment,
    ) -> Result<(), ReconcileError> {
        if request.service.trim().is_empty() {
            return Err(ReconcileError::Validation(ValidationError::MissingService));
        }

        tracing::info!("Fetching deployment.");

        let mut deployment = self
            .store
            .get_workload(namespace, &request.service)
            .await?;

        let containers = container_count(&deployment);
        if containers != 1 {
            tracing::error!(containers, "Deployment does not have exactly one container.");
            return Err(ReconcileError::InconsistentWorkload {
                name: request.to_name(),
                containers,
            });
        }

        let plan = self
            .plan(namespace, request, &deployment)
            .instrument(trace_span!("PlanDeployment"))
            .await?;

        self.apply(&mut deployment, request, plan)?;

        tracing::info!("Updating deployment.");

        self.store.update_workload(namespace, &deployment).await?;

        tracing::info!("Deployment updated.");

        Ok(())
    }

    /// Validates the request and resolves secrets. Fails before any mutation.
    async fn plan(
        &self,
        namespace: &str,
        request: &FunctionDeployment,
        deployment: &Deployment,
    ) -> Result<ReconcilePlan, ReconcileError> {
        let node_selector = parse_constraints(request.constraints.as_deref().unwrap_or_default())?;

        let resources = parse_resources(request.limits.as_ref(), request.requests.as_ref())?;

        let port = container_port(deployment).unwrap_or(self.runtime_http_port);
        let probes = self.probe_builder.make_probes(request, port)?;

        let secret_names = request.get_secrets_unique_vec();
        let secrets = if secret_names.is_empty() {
            Vec::new()
        } else {
            tracing::info!(secrets = secret_names.len(), "Resolving secrets.");

            self.secret_resolver
                .resolve_secrets(namespace, &secret_names)
                .await
                .map_err(|error| {
                    tracing::error!(%error, "Failed to resolve secrets.");
                    ReconcileError::Secrets(error)
                })?
        };

        Ok(ReconcilePlan {
            node_selector,
            resources,
            probes,
            secrets,
        })
    }

    fn apply(
        &self,
        deployment: &mut Deployment,
        request: &FunctionDeployment,
        plan: ReconcilePlan,
    ) -> Result<(), ReconcileError> {
        let service = request.to_name();

        let container = function_container(deployment, &service)?;
        container.image = Some(request.image.clone());

        let env = request.to_env_vars();
        container.env = if env.is_empty() { None } else { Some(env) };

        self.security
            .configure_security_context(request, pod_spec(deployment, &service)?);

        pod_spec(deployment, &service)?.node_selector = if plan.node_selector.is_empty() {
            None
        } else {
            Some(plan.node_selector)
        };

        let labels = self.to_labels(request);
        let spec = deployment_spec(deployment, &service)?;
        if let Some(replicas) = request.min_replicas() {
            spec.replicas = Some(replicas);
        }
        spec.template.metadata.get_or_insert_with(Default::default).labels = Some(labels);

        let annotations = request.to_annotations();
        deployment.metadata.annotations = reconcile_annotations(
            self.annotation_policy,
            deployment.metadata.annotations.take(),
            &annotations,
        );
        let template_metadata = deployment_spec(deployment, &service)?
            .template
            .metadata
            .get_or_insert_with(Default::default);
        template_metadata.annotations = reconcile_annotations(
            self.annotation_policy,
            template_metadata.annotations.take(),
            &annotations,
        );

        function_container(deployment, &service)?.resources = Some(plan.resources);

        pod_spec(deployment, &service)?.service_account_name = request.service_account();

        apply_secrets(pod_spec(deployment, &service)?, &service, &plan.secrets);

        let container = function_container(deployment, &service)?;
        container.liveness_probe = Some(plan.probes.liveness);
        container.readiness_probe = Some(plan.probes.readiness);

        Ok(())
    }

    async fn update_service(
        &self,
        namespace: &str,
        request: &FunctionDeployment,
    ) -> Result<(), StoreError> {
        tracing::info!("Fetching service.");

        let mut service = self.store.get_endpoint(namespace, &request.service).await?;

        service.metadata.annotations = reconcile_annotations(
            self.annotation_policy,
            service.metadata.annotations.take(),
            &request.to_annotations(),
        );

        tracing::info!("Updating service.");

        self.store.update_endpoint(namespace, &service).await?;

        tracing::info!("Service updated.");

        Ok(())
    }

    /// Caller labels with the owned keys written last, so they can never be overridden.
    fn to_labels(&self, request: &FunctionDeployment) -> BTreeMap<String, String> {
        let mut labels = request.labels.clone().unwrap_or_default();

        labels.insert(self.owned_labels.function_key.clone(), request.to_name());
        labels.insert(self.owned_labels.version_key.clone(), version_stamp());

        labels
    }
}

fn version_stamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default()
        .to_string()
}

fn reconcile_annotations(
    policy: AnnotationPolicy,
    existing: Option<BTreeMap<String, String>>,
    desired: &BTreeMap<String, String>,
) -> Option<BTreeMap<String, String>> {
    let annotations = match policy {
        AnnotationPolicy::Replace => desired.clone(),
        AnnotationPolicy::Merge => {
            let mut annotations = existing.unwrap_or_default();
            annotations.extend(desired.clone());
            annotations
        }
    };

    if annotations.is_empty() {
        None
    } else {
        Some(annotations)
    }
}

fn container_count(deployment: &Deployment) -> usize {
    deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .map(|pod_spec| pod_spec.containers.len())
        .unwrap_or_default()
}

/// The port the function container listens on, preferring one named `http`.
fn container_port(deployment: &Deployment) -> Option<i32> {
    let ports = deployment
        .spec
        .as_ref()?
        .template
        .spec
        .as_ref()?
        .containers
        .first()?
        .ports
        .as_ref()?;

    ports
        .iter()
        .find(|port| port.name.as_deref() == Some("http"))
        .or_else(|| ports.first())
        .map(|port| port.container_port)
}

fn inconsistent(service: &str) -> ReconcileError {
    ReconcileError::InconsistentWorkload {
        name: service.to_string(),
        containers: 0,
    }
}

fn deployment_spec<'a>(
    deployment: &'a mut Deployment,
    service: &str,
) -> Result<&'a mut DeploymentSpec, ReconcileError> {
    deployment.spec.as_mut().ok_or_else(|| inconsistent(service))
}

fn pod_spec<'a>(
    deployment: &'a mut Deployment,
    service: &str,
) -> Result<&'a mut PodSpec, ReconcileError> {
    deployment_spec(deployment, service)?
        .template
        .spec
        .as_mut()
        .ok_or_else(|| inconsistent(service))
}

fn function_container<'a>(
    deployment: &'a mut Deployment,
    service: &str,
) -> Result<&'a mut Container, ReconcileError> {
    pod_spec(deployment, service)?
        .containers
        .first_mut()
        .ok_or_else(|| inconsistent(service))
}
