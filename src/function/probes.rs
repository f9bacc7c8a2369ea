use super::errors::ProbeError;
use crate::{
    config::ProbeConfig,
    consts::{PROBE_INITIAL_DELAY_ANNOTATION, PROBE_PATH_ANNOTATION, PROBE_PERIOD_ANNOTATION},
    types::FunctionDeployment,
};
use k8s_openapi::{
    api::core::v1::{ExecAction, HTTPGetAction, Probe},
    apimachinery::pkg::util::intstr::IntOrString,
};

const WATCHDOG_LOCK_FILE: &str = "/tmp/.lock";

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionProbes {
    pub liveness: Probe,
    pub readiness: Probe,
}

pub struct ProbeBuilder {
    config: ProbeConfig,
}

impl ProbeBuilder {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Probes are rebuilt from scratch on every call; existing probes are never consulted.
    pub fn make_probes(
        &self,
        request: &FunctionDeployment,
        port: i32,
    ) -> Result<FunctionProbes, ProbeError> {
        let path = match request.annotation(PROBE_PATH_ANNOTATION) {
            Some(path) => validate_path(path)?,
            None => self.config.path.clone(),
        };

        let initial_delay_seconds = match request.annotation(PROBE_INITIAL_DELAY_ANNOTATION) {
            Some(value) => parse_seconds(PROBE_INITIAL_DELAY_ANNOTATION, value, 0)?,
            None => self.config.initial_delay_seconds,
        };

        let period_seconds = match request.annotation(PROBE_PERIOD_ANNOTATION) {
            Some(value) => parse_seconds(PROBE_PERIOD_ANNOTATION, value, 1)?,
            None => self.config.period_seconds,
        };

        let mut probe = Probe {
            initial_delay_seconds: Some(initial_delay_seconds),
            period_seconds: Some(period_seconds),
            timeout_seconds: Some(self.config.timeout_seconds),
            success_threshold: Some(1),
            failure_threshold: Some(self.config.failure_threshold),
            ..Default::default()
        };

        if self.config.http_probe {
            probe.http_get = Some(HTTPGetAction {
                path: Some(path),
                port: IntOrString::Int(port),
                scheme: Some(String::from("HTTP")),
                ..Default::default()
            });
        } else {
            probe.exec = Some(ExecAction {
                command: Some(vec![
                    String::from("cat"),
                    String::from(WATCHDOG_LOCK_FILE),
                ]),
            });
        }

        Ok(FunctionProbes {
            liveness: probe.clone(),
            readiness: probe,
        })
    }
}

fn validate_path(path: &str) -> Result<String, ProbeError> {
    if path.starts_with('/') {
        Ok(path.to_string())
    } else {
        Err(ProbeError::InvalidProbeConfig {
            annotation: PROBE_PATH_ANNOTATION,
            value: path.to_string(),
            reason: "path must start with '/'",
        })
    }
}

/// Accepts whole seconds (`5`) or a single unit suffix: `500ms`, `5s`, `1m`, `1h`.
/// Sub-second values are truncated towards zero, then checked against `minimum`.
fn parse_seconds(
    annotation: &'static str,
    value: &str,
    minimum: i32,
) -> Result<i32, ProbeError> {
    let invalid = |reason| ProbeError::InvalidProbeConfig {
        annotation,
        value: value.to_string(),
        reason,
    };

    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let number: i64 = number.parse().map_err(|_| invalid("expected a duration"))?;

    let seconds = match unit {
        "" | "s" => Some(number),
        "ms" => Some(number / 1000),
        "m" => number.checked_mul(60),
        "h" => number.checked_mul(3600),
        _ => return Err(invalid("unknown duration unit")),
    };

    let seconds = seconds
        .and_then(|seconds| i32::try_from(seconds).ok())
        .ok_or_else(|| invalid("duration too large"))?;

    if seconds < minimum {
        return Err(invalid("duration too small"));
    }

    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(annotations: &[(&str, &str)]) -> FunctionDeployment {
        FunctionDeployment {
            service: String::from("echo"),
            annotations: Some(
                annotations
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_to_http_health_probe() {
        let builder = ProbeBuilder::new(ProbeConfig::default());

        let probes = builder
            .make_probes(&FunctionDeployment::default(), 8080)
            .unwrap();

        let http_get = probes.liveness.http_get.clone().unwrap();
        assert_eq!(http_get.path.as_deref(), Some("/_/health"));
        assert_eq!(http_get.port, IntOrString::Int(8080));
        assert_eq!(probes.liveness.initial_delay_seconds, Some(2));
        assert_eq!(probes.liveness.period_seconds, Some(2));
        assert_eq!(probes.liveness.failure_threshold, Some(3));
        assert_eq!(probes.liveness, probes.readiness);
    }

    #[test]
    fn annotations_override_defaults() {
        let builder = ProbeBuilder::new(ProbeConfig::default());
        let request = request_with(&[
            (PROBE_PATH_ANNOTATION, "/ready"),
            (PROBE_INITIAL_DELAY_ANNOTATION, "1m"),
            (PROBE_PERIOD_ANNOTATION, "5"),
        ]);

        let probes = builder.make_probes(&request, 9090).unwrap();

        let http_get = probes.readiness.http_get.unwrap();
        assert_eq!(http_get.path.as_deref(), Some("/ready"));
        assert_eq!(http_get.port, IntOrString::Int(9090));
        assert_eq!(probes.readiness.initial_delay_seconds, Some(60));
        assert_eq!(probes.readiness.period_seconds, Some(5));
    }

    #[test]
    fn exec_probe_when_http_is_disabled() {
        let builder = ProbeBuilder::new(ProbeConfig {
            http_probe: false,
            ..Default::default()
        });

        let probes = builder
            .make_probes(&FunctionDeployment::default(), 8080)
            .unwrap();

        assert!(probes.liveness.http_get.is_none());
        assert_eq!(
            probes.liveness.exec.unwrap().command.unwrap(),
            vec!["cat", "/tmp/.lock"]
        );
    }

    #[test]
    fn malformed_overrides_are_rejected() {
        let builder = ProbeBuilder::new(ProbeConfig::default());

        for annotations in [
            [(PROBE_PATH_ANNOTATION, "health")],
            [(PROBE_INITIAL_DELAY_ANNOTATION, "soon")],
            [(PROBE_PERIOD_ANNOTATION, "2d")],
        ] {
            let error = builder
                .make_probes(&request_with(&annotations), 8080)
                .unwrap_err();

            assert!(matches!(error, ProbeError::InvalidProbeConfig { .. }));
        }
    }

    #[test]
    fn durations_in_seconds() {
        assert_eq!(parse_seconds(PROBE_PERIOD_ANNOTATION, "10s", 1), Ok(10));
        assert_eq!(parse_seconds(PROBE_PERIOD_ANNOTATION, "1500ms", 1), Ok(1));
        assert_eq!(parse_seconds(PROBE_PERIOD_ANNOTATION, "2h", 1), Ok(7200));
        assert!(parse_seconds(PROBE_PERIOD_ANNOTATION, "", 1).is_err());
    }

    #[test]
    fn period_below_one_second_is_rejected() {
        assert!(parse_seconds(PROBE_PERIOD_ANNOTATION, "500ms", 1).is_err());
        assert!(parse_seconds(PROBE_PERIOD_ANNOTATION, "0", 1).is_err());
    }

    #[test]
    fn zero_initial_delay_is_allowed() {
        let builder = ProbeBuilder::new(ProbeConfig::default());
        let request = request_with(&[(PROBE_INITIAL_DELAY_ANNOTATION, "0")]);

        let probes = builder.make_probes(&request, 8080).unwrap();

        assert_eq!(probes.liveness.initial_delay_seconds, Some(0));
    }
}
