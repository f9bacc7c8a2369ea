use super::Provider;
use crate::types::FunctionDeployment;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{trace_span, Instrument};

#[derive(Debug, Default, Deserialize)]
pub struct NamespaceQuery {
    namespace: Option<String>,
}

impl Provider {
    /// The namespace to operate in, or a `401` when it is the reserved namespace.
    fn lookup_namespace(&self, requested: Option<&str>) -> Result<String, Response> {
        let namespace = self.config.lookup_namespace(requested);

        if self.config.is_reserved_namespace(&namespace) {
            tracing::warn!(%namespace, "Refusing to operate in reserved namespace.");

            return Err((
                StatusCode::UNAUTHORIZED,
                format!("unable to operate within the {namespace} namespace"),
            )
                .into_response());
        }

        Ok(namespace)
    }
}

pub async fn list_functions(
    State(provider): State<Arc<Provider>>,
    Query(query): Query<NamespaceQuery>,
) -> Response {
    let namespace = match provider.lookup_namespace(query.namespace.as_deref()) {
        Ok(namespace) => namespace,
        Err(response) => return response,
    };

    match provider.reader.list_functions(&namespace).await {
        Ok(functions) => (StatusCode::OK, Json(functions)).into_response(),
        Err(error) => {
            tracing::error!(%error, %namespace, "Failed to list functions.");
            (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
        }
    }
}

pub async fn get_function(
    State(provider): State<Arc<Provider>>,
    Path(name): Path<String>,
    Query(query): Query<NamespaceQuery>,
) -> Response {
    let namespace = match provider.lookup_namespace(query.namespace.as_deref()) {
        Ok(namespace) => namespace,
        Err(response) => return response,
    };

    match provider.reader.get_function(&namespace, &name).await {
        Ok(Some(function)) => (StatusCode::OK, Json(function)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            format!("function: {name} not found"),
        )
            .into_response(),
        Err(error) => {
            tracing::error!(%error, %namespace, %name, "Failed to get function.");
            (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
        }
    }
}

/// `202` once the deployment and service are updated. The rollout itself is not awaited.
///
/// The namespace comes from the `namespace` query parameter, then the body, then the configured default.
pub async fn update_function(
    State(provider): State<Arc<Provider>>,
    Query(query): Query<NamespaceQuery>,
    body: Bytes,
) -> Response {
    let request: FunctionDeployment = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(error) => {
            tracing::warn!(%error, "Failed to decode function deployment.");
            return (StatusCode::BAD_REQUEST, error.to_string()).into_response();
        }
    };

    // the query parameter wins over the body
    let requested = query
        .namespace
        .as_deref()
        .filter(|namespace| !namespace.is_empty())
        .or(request.namespace.as_deref());

    let namespace = match provider.lookup_namespace(requested) {
        Ok(namespace) => namespace,
        Err(response) => return response,
    };

    let service = request.to_name();

    match provider
        .reconciler
        .reconcile(&namespace, &request)
        .instrument(trace_span!("UpdateFunction"))
        .await
    {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(error) => {
            let status = error.status_code();
            if status.is_server_error() {
                tracing::error!(%error, %namespace, %service, "Failed to update function.");
            } else {
                tracing::info!(%error, %namespace, %service, "Function update rejected.");
            }
            (status, error.to_string()).into_response()
        }
    }
}

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use crate::{
        config::ProviderConfig,
        function::{errors::StoreError, secrets::MockSecretResolver, store::MockFunctionStore},
        provider::Provider,
        types::FunctionStatus,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use k8s_openapi::api::{
        apps::v1::{Deployment, DeploymentSpec},
        core::v1::{Container, PodSpec, PodTemplateSpec, Service},
    };
    use kube::core::ObjectMeta;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn deployment(name: &str) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(String::from("openfaas-fn")),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                template: PodTemplateSpec {
                    metadata: None,
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: name.to_string(),
                            image: Some(format!("{name}:1.0")),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            status: None,
        }
    }

    fn not_found(namespace: &str, name: &str) -> StoreError {
        StoreError::NotFound {
            kind: "Deployment",
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    fn router(store: MockFunctionStore) -> Router {
        let mut resolver = MockSecretResolver::new();
        resolver.expect_resolve_secrets().never();

        Provider::new(ProviderConfig::default(), Arc::new(store), Arc::new(resolver)).router()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, body.to_vec())
    }

    fn put_function(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn listing_reserved_namespace_is_rejected() {
        let mut store = MockFunctionStore::new();
        store.expect_list_workloads().never();

        let (status, _) = send(
            router(store),
            get("/system/functions?namespace=kube-system"),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn updating_in_reserved_namespace_is_rejected() {
        let mut store = MockFunctionStore::new();
        store.expect_get_workload().never();

        let (status, _) = send(
            router(store),
            put_function(
                "/system/functions?namespace=kube-system",
                r#"{"service":"echo","image":"echo:1.0"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn listing_defaults_to_functions_namespace() {
        let mut store = MockFunctionStore::new();
        store
            .expect_list_workloads()
            .times(1)
            .returning(|namespace, _| {
                assert_eq!(namespace, "openfaas-fn");
                Ok(vec![deployment("echo")])
            });

        let (status, body) = send(router(store), get("/system/functions")).await;

        assert_eq!(status, StatusCode::OK);
        let functions: Vec<FunctionStatus> = serde_json::from_slice(&body).unwrap();
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].image, "echo:1.0");
    }

    #[tokio::test]
    async fn empty_listing_is_ok() {
        let mut store = MockFunctionStore::new();
        store.expect_list_workloads().returning(|_, _| Ok(vec![]));

        let (status, body) = send(router(store), get("/system/functions?namespace=dev")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"[]");
    }

    #[tokio::test]
    async fn missing_function_is_not_found() {
        let mut store = MockFunctionStore::new();
        store
            .expect_get_workload()
            .returning(|namespace, name| Err(not_found(namespace, name)));

        let (status, body) = send(router(store), get("/system/function/echo")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, b"function: echo not found");
    }

    #[tokio::test]
    async fn existing_function_is_returned() {
        let mut store = MockFunctionStore::new();
        store
            .expect_get_workload()
            .returning(|_, name| Ok(deployment(name)));

        let (status, body) = send(router(store), get("/system/function/echo")).await;

        assert_eq!(status, StatusCode::OK);
        let function: FunctionStatus = serde_json::from_slice(&body).unwrap();
        assert_eq!(function.name, "echo");
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let mut store = MockFunctionStore::new();
        store.expect_get_workload().never();

        let (status, _) = send(router(store), put_function("/system/functions", "{")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn updating_unknown_function_is_not_found() {
        let mut store = MockFunctionStore::new();
        store
            .expect_get_workload()
            .returning(|namespace, name| Err(not_found(namespace, name)));
        store.expect_update_workload().never();

        let (status, body) = send(
            router(store),
            put_function("/system/functions", r#"{"service":"echo","image":"echo:1.0"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(String::from_utf8(body).unwrap().contains("echo"));
    }

    #[tokio::test]
    async fn update_is_accepted() {
        let mut store = MockFunctionStore::new();
        store
            .expect_get_workload()
            .returning(|_, name| Ok(deployment(name)));
        store.expect_update_workload().times(1).returning(|_, _| Ok(()));
        store.expect_get_endpoint().returning(|_, name| {
            Ok(Service {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    ..Default::default()
                },
                ..Default::default()
            })
        });
        store.expect_update_endpoint().times(1).returning(|_, _| Ok(()));

        let (status, _) = send(
            router(store),
            put_function(
                "/system/functions?namespace=openfaas-fn",
                r#"{"service":"echo","image":"echo:1.1","constraints":["zone=east"]}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn invalid_resources_are_a_bad_request() {
        let mut store = MockFunctionStore::new();
        store
            .expect_get_workload()
            .returning(|_, name| Ok(deployment(name)));
        store.expect_update_workload().never();

        let (status, _) = send(
            router(store),
            put_function(
                "/system/functions",
                r#"{"service":"echo","image":"echo:1.1","requests":{"cpu":"lots"}}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn blank_service_is_a_bad_request() {
        let mut store = MockFunctionStore::new();
        store.expect_get_workload().never();

        let (status, _) = send(
            router(store),
            put_function("/system/functions", r#"{"service":"","image":"x"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn body_namespace_is_used_without_query() {
        let mut store = MockFunctionStore::new();
        store.expect_get_workload().times(1).returning(|namespace, name| {
            assert_eq!(namespace, "staging");
            Err(not_found(namespace, name))
        });

        let (status, _) = send(
            router(store),
            put_function(
                "/system/functions",
                r#"{"service":"echo","image":"echo:1.1","namespace":"staging"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn query_namespace_wins_over_body() {
        let mut store = MockFunctionStore::new();
        store.expect_get_workload().times(1).returning(|namespace, name| {
            assert_eq!(namespace, "dev");
            Err(not_found(namespace, name))
        });

        let (status, _) = send(
            router(store),
            put_function(
                "/system/functions?namespace=dev",
                r#"{"service":"echo","image":"echo:1.1","namespace":"staging"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reserved_body_namespace_is_rejected() {
        let mut store = MockFunctionStore::new();
        store.expect_get_workload().never();

        let (status, _) = send(
            router(store),
            put_function(
                "/system/functions",
                r#"{"service":"echo","image":"echo:1.1","namespace":"kube-system"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let (status, _) = send(router(MockFunctionStore::new()), get("/healthz")).await;

        assert_eq!(status, StatusCode::OK);
    }
}
