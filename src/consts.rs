use const_format::concatcp;

pub const FUNCTIONS_NAMESPACE_ENV_VAR: &str = "OPENFAAS_FUNCTIONS_NAMESPACE";
pub const FUNCTIONS_DEFAULT_NAMESPACE: &str = "openfaas-fn";

/// Listing or managing functions in this namespace is always refused.
pub const RESERVED_NAMESPACE: &str = "kube-system";

pub const PROVIDER_ADDRESS_ENV_VAR: &str = "OPENFAAS_PROVIDER_ADDRESS";
pub const PROVIDER_DEFAULT_ADDRESS: &str = "0.0.0.0:8081";

pub const PROVIDER_URL_ENV_VAR: &str = "OPENFAAS_PROVIDER_URL";
pub const PROVIDER_DEFAULT_URL: &str = "http://127.0.0.1:8081";

pub const ANNOTATION_POLICY_ENV_VAR: &str = "OPF_FP_ANNOTATION_POLICY";
pub const SECURITY_CONTEXT_ENV_VAR: &str = "OPF_FP_SECURITY_CONTEXT";
pub const HTTP_PROBE_ENV_VAR: &str = "OPF_FP_HTTP_PROBE";
pub const RUNTIME_HTTP_PORT_ENV_VAR: &str = "OPF_FP_RUNTIME_HTTP_PORT";

pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

pub const DISPLAY_NAME: &str = "ProvideRS";

pub const FUNCTIONS_ENDPOINT: &str = "/system/functions";
pub const FUNCTION_ENDPOINT: &str = "/system/function";
pub const HEALTHZ_ENDPOINT: &str = "/healthz";

pub const FUNCTION_LABEL: &str = "faas_function";
pub const UID_LABEL: &str = "uid";

const OPENFAAS_PREFIX: &str = "com.openfaas.";

pub const MIN_REPLICAS_LABEL: &str = concatcp!(OPENFAAS_PREFIX, "scale.min");
pub const SERVICE_ACCOUNT_ANNOTATION: &str = concatcp!(OPENFAAS_PREFIX, "serviceaccount");

const HEALTH_PREFIX: &str = concatcp!(OPENFAAS_PREFIX, "health.http.");

pub const PROBE_PATH_ANNOTATION: &str = concatcp!(HEALTH_PREFIX, "path");
pub const PROBE_INITIAL_DELAY_ANNOTATION: &str = concatcp!(HEALTH_PREFIX, "initialDelay");
pub const PROBE_PERIOD_ANNOTATION: &str = concatcp!(HEALTH_PREFIX, "periodSeconds");

pub const DEFAULT_PROBE_PATH: &str = "/_/health";
pub const DEFAULT_RUNTIME_HTTP_PORT: i32 = 8080;

pub const ENV_PROCESS_NAME: &str = "fprocess";

pub const SECRETS_MOUNT_PATH: &str = "/var/openfaas/secrets";
pub const SECRETS_VOLUME_SUFFIX: &str = "-projected-secrets";

pub const TMP_VOLUME_NAME: &str = "tmp";
pub const TMP_MOUNT_PATH: &str = "/tmp";

pub const NON_ROOT_USER_ID: i64 = 12000;
