// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! One OpenAPI operation per HTTP binding of an RPC method.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, warn};
use url::Url;

use crate::annotations::parse_yaml_scalar;
use crate::descriptor::{HttpRule, MethodDesc, ServiceDesc};
use crate::model::{
    HttpMethod, MediaType, Operation, ParameterLocation, ParameterOrReference, Response, Schema,
    SchemaOrReference, Server,
};
use crate::paths::{build_path_parameters, build_query_parameters, build_request_body};
use crate::reflector::{Reflector, SchemaWorklist};
use crate::wellknown::{self, EMPTY, HTTP_BODY, STATUS};

const JSON_MEDIA_TYPE: &str = "application/json";

/// An operation ready to be placed at `path` under `method`.
#[derive(Debug)]
pub struct BoundOperation {
    pub method: HttpMethod,
    pub path: String,
    pub operation: Operation,
}

/// Builds the operation for one binding of `method`, with the service and
/// method annotations merged in. Returns `None` for bindings that have no
/// OpenAPI counterpart.
pub fn build_operation(
    reflector: &Reflector<'_>,
    service: &ServiceDesc,
    method: &MethodDesc,
    rule: &HttpRule,
    worklist: &mut SchemaWorklist,
) -> Option<BoundOperation> {
    let Some((verb, template)) = rule.binding() else {
        warn!(
            "skipping unsupported http rule {:?} on {}.{}",
            rule.pattern, service.full_name, method.name
        );
        return None;
    };
    let Some(input) = reflector.descriptors().message(&method.input_type) else {
        warn!(
            "request type {} of {}.{} not found",
            method.input_type, service.full_name, method.name
        );
        return None;
    };

    let mut path = build_path_parameters(reflector, template, input, worklist);
    let body = rule.body.as_str();
    if !body.is_empty() && body != "*" {
        path.covered.push(body.to_string());
    }

    let mut parameters: Vec<ParameterOrReference> =
        path.parameters.into_iter().map(Into::into).collect();
    if body != "*" && input.full_name != HTTP_BODY {
        for field in &input.fields {
            let covered = path
                .covered
                .iter()
                .any(|name| *name == field.name || *name == field.json_name);
            if covered {
                continue;
            }
            let mut depths = HashMap::new();
            parameters.extend(
                build_query_parameters(reflector, field, &mut depths, worklist)
                    .into_iter()
                    .map(ParameterOrReference::from),
            );
        }
    }

    let mut operation = Operation {
        tags: vec![service.name.clone()],
        description: Some(method.description.clone()).filter(|d| !d.is_empty()),
        operation_id: Some(format!("{}_{}", service.name, method.name)),
        parameters,
        request_body: build_request_body(reflector, body, input, worklist),
        responses: build_responses(reflector, &method.output_type, worklist),
        servers: service
            .default_host
            .as_deref()
            .and_then(server_for_host)
            .into_iter()
            .collect(),
        ..Default::default()
    };

    if let Some(annotation) = &service.annotation {
        annotation.merge_into(&mut operation);
    }
    if let Some(annotation) = &method.annotation {
        annotation.merge_into(&mut operation);
    }
    backfill_header_schemas(&mut operation);
    extract_tag_extensions(&mut operation);

    Some(BoundOperation {
        method: verb,
        path: path.path,
        operation,
    })
}

fn build_responses(
    reflector: &Reflector<'_>,
    output_type: &str,
    worklist: &mut SchemaWorklist,
) -> IndexMap<String, Response> {
    let content = match output_type {
        EMPTY => IndexMap::new(),
        HTTP_BODY => wellknown::http_body_content(),
        _ => match reflector.schema_for_message_type(output_type, worklist) {
            Some(schema) => json_content(schema),
            None => IndexMap::new(),
        },
    };

    let mut responses = IndexMap::new();
    responses.insert(
        "200".to_string(),
        Response {
            description: "OK".into(),
            content,
            ..Default::default()
        },
    );
    if reflector.settings().default_response {
        let status = reflector.message_name_for(STATUS);
        responses.insert(
            "default".to_string(),
            Response {
                description: "Default error response".into(),
                content: json_content(SchemaOrReference::component(&status)),
                ..Default::default()
            },
        );
    }
    responses
}

fn json_content(schema: SchemaOrReference) -> IndexMap<String, MediaType> {
    let mut content = IndexMap::new();
    content.insert(JSON_MEDIA_TYPE.to_string(), MediaType::with_schema(schema));
    content
}

/// `https://` server for a `google.api.default_host` value; any scheme on
/// the host is replaced.
pub fn server_for_host(host: &str) -> Option<Server> {
    let host = host.trim();
    let rest = host.split_once("://").map_or(host, |(_, rest)| rest);
    if rest.is_empty() {
        return None;
    }
    let url = format!("https://{rest}");
    match Url::parse(&url) {
        Ok(parsed) if parsed.host_str().is_some_and(|h| !h.is_empty()) => Some(Server::new(url)),
        Ok(_) | Err(_) => {
            warn!("ignoring invalid default host {host:?}");
            None
        }
    }
}

fn backfill_header_schemas(operation: &mut Operation) {
    for parameter in &mut operation.parameters {
        if let ParameterOrReference::Parameter(parameter) = parameter {
            if parameter.location == ParameterLocation::Header && parameter.schema.is_none() {
                parameter.schema = Some(Schema::string().into());
            }
        }
    }
}

/// Moves `key=value` tags into specification extensions. A repeated key
/// keeps its first position and its last value.
fn extract_tag_extensions(operation: &mut Operation) {
    let tags = std::mem::take(&mut operation.tags);
    for tag in tags {
        match tag.split_once('=') {
            Some((key, value)) => {
                let key = key.trim();
                debug!("tag {tag:?} becomes extension {key}");
                operation
                    .extensions
                    .insert(key.to_string(), parse_yaml_scalar(value.trim()));
            }
            None => operation.tags.push(tag),
        }
    }
}
