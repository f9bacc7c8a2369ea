//! Scheduling constraints and resource quantities as sent by the gateway.

use super::errors::ParseError;
use crate::types::FunctionResources;
use k8s_openapi::{
    api::core::v1::ResourceRequirements, apimachinery::pkg::api::resource::Quantity,
};
use kube_quantity::{ParseQuantityError, ParsedQuantity};
use std::collections::BTreeMap;

/// Builds a node selector from `key=value` constraints. Later duplicates win.
pub fn parse_constraints(constraints: &[String]) -> Result<BTreeMap<String, String>, ParseError> {
    let mut selector = BTreeMap::new();

    for constraint in constraints {
        let (key, value) = constraint
            .split_once('=')
            .map(|(key, value)| (key.trim(), value.trim()))
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| ParseError::InvalidConstraintSyntax(constraint.clone()))?;

        selector.insert(key.to_string(), value.to_string());
    }

    Ok(selector)
}

/// A quantity starts with an optional `+` and a number. Bare suffixes and negative values are refused.
fn starts_with_number(value: &str) -> bool {
    let unsigned = value.strip_prefix('+').unwrap_or(value);
    let digits = unsigned.strip_prefix('.').unwrap_or(unsigned);

    digits.starts_with(|c: char| c.is_ascii_digit())
}

fn parse_quantity(resource: String, value: &str) -> Result<Quantity, ParseError> {
    let trimmed = value.trim();

    if !starts_with_number(trimmed) {
        return Err(ParseError::InvalidResourceQuantity {
            resource,
            value: value.to_string(),
            reason: String::from("expected a non-negative number"),
        });
    }

    let quantity = Quantity(trimmed.to_string());

    let parsed: Result<ParsedQuantity, ParseQuantityError> = quantity.clone().try_into();

    parsed
        .map(|_| quantity)
        .map_err(|error| ParseError::InvalidResourceQuantity {
            resource,
            value: value.to_string(),
            reason: error.to_string(),
        })
}

fn parse_function_resources(
    kind: &str,
    resources: Option<&FunctionResources>,
) -> Result<Option<BTreeMap<String, Quantity>>, ParseError> {
    let Some(resources) = resources else {
        return Ok(None);
    };

    let mut quantities = BTreeMap::new();

    for (name, value) in [("cpu", &resources.cpu), ("memory", &resources.memory)] {
        let Some(value) = value.as_deref().filter(|value| !value.trim().is_empty()) else {
            continue;
        };

        let quantity = parse_quantity(format!("{kind}.{name}"), value)?;
        quantities.insert(name.to_string(), quantity);
    }

    if quantities.is_empty() {
        Ok(None)
    } else {
        Ok(Some(quantities))
    }
}

/// Validates every quantity before anything is returned, so a single bad value rejects the whole set.
pub fn parse_resources(
    limits: Option<&FunctionResources>,
    requests: Option<&FunctionResources>,
) -> Result<ResourceRequirements, ParseError> {
    Ok(ResourceRequirements {
        limits: parse_function_resources("limits", limits)?,
        requests: parse_function_resources("requests", requests)?,
        ..Default::default()
    })
}
