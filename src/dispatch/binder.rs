//! Reads bound action parameters out of a request.

use crate::controller::{ParamBinding, ParamSource};
use crate::exception::HttpException;
use axum::{
    body::Body,
    extract::{FromRequestParts, Path, Query},
    http::{header, request::Parts},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Highest argument position an action may bind.
pub const MAX_POSITION: usize = 64;

/// Positional arguments of one action call.
///
/// Position 0 belongs to the call context, so the first bound value lives at
/// position 1. Unbound positions and keys missing from the request are `None`.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Vec<Option<Value>>,
}

impl Args {
    pub fn get(&self, position: usize) -> Option<&Value> {
        self.values.get(position).and_then(Option::as_ref)
    }

    /// The value at `position` if it is a string.
    pub fn str(&self, position: usize) -> Option<&str> {
        self.get(position).and_then(Value::as_str)
    }

    /// Deserialize the value at `position`. A present value of the wrong shape
    /// is a binding error.
    pub fn parse<T: DeserializeOwned>(&self, position: usize) -> Result<Option<T>, HttpException> {
        self.get(position)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|err| {
                    HttpException::Binding(format!("argument {position}: {err}"))
                })
            })
            .transpose()
    }

    /// Number of positions, including the context slot.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

/// Request containers, each read at most once and only when a binding needs it.
#[derive(Default)]
struct Containers {
    body: Option<Value>,
    query: Option<HashMap<String, String>>,
    path: Option<HashMap<String, String>>,
    cookies: Option<HashMap<String, String>>,
}

pub(crate) async fn bind(
    bindings: &BTreeMap<usize, ParamBinding>,
    parts: &mut Parts,
    body: Body,
) -> Result<Args, HttpException> {
    let Some(&last) = bindings.keys().next_back() else {
        return Ok(Args::default());
    };

    let mut containers = Containers::default();
    if bindings.values().any(|b| b.source == ParamSource::Body) {
        containers.body = Some(read_json(body).await?);
    }

    let mut values = vec![None; last + 1];
    for (&position, binding) in bindings {
        values[position] = match binding.source {
            ParamSource::Body => containers
                .body
                .as_ref()
                .and_then(|body| body.get(&binding.key))
                .cloned(),
            ParamSource::Query => {
                if containers.query.is_none() {
                    containers.query = Some(query_map(parts)?);
                }
                lookup(&containers.query, &binding.key)
            }
            ParamSource::Path => {
                if containers.path.is_none() {
                    containers.path = Some(path_map(parts).await);
                }
                lookup(&containers.path, &binding.key)
            }
            ParamSource::Header => parts
                .headers
                .get(binding.key.as_str())
                .and_then(|value| value.to_str().ok())
                .map(|value| Value::String(value.to_string())),
            ParamSource::Cookie => {
                if containers.cookies.is_none() {
                    containers.cookies = Some(cookie_map(parts));
                }
                lookup(&containers.cookies, &binding.key)
            }
        };
    }

    Ok(Args { values })
}

fn lookup(container: &Option<HashMap<String, String>>, key: &str) -> Option<Value> {
    container
        .as_ref()
        .and_then(|map| map.get(key))
        .map(|value| Value::String(value.clone()))
}

async fn read_json(body: Body) -> Result<Value, HttpException> {
    let bytes = axum::body::to_bytes(body, BODY_LIMIT)
        .await
        .map_err(|err| HttpException::Binding(format!("cannot read body: {err}")))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes)
        .map_err(|err| HttpException::Binding(format!("malformed JSON body: {err}")))
}

fn query_map(parts: &Parts) -> Result<HashMap<String, String>, HttpException> {
    Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map(|Query(map)| map)
        .map_err(|err| HttpException::Binding(format!("malformed query string: {err}")))
}

async fn path_map(parts: &mut Parts) -> HashMap<String, String> {
    Path::<HashMap<String, String>>::from_request_parts(parts, &())
        .await
        .map(|Path(map)| map)
        .unwrap_or_default()
}

fn cookie_map(parts: &Parts) -> HashMap<String, String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let value = value.trim().trim_matches('"');
            Some((name.trim().to_string(), value.to_string()))
        })
        .collect()
}
