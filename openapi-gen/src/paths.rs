// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Parameters and request bodies derived from an HTTP rule and the request
//! message.

use std::collections::HashMap;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::descriptor::{FieldDesc, FieldKind, MessageDesc};
use crate::model::{MediaType, Parameter, ParameterLocation, RequestBody, Schema};
use crate::naming::{find_and_format_field_name, format_field_name, singular};
use crate::reflector::{Reflector, SchemaWorklist};
use crate::wellknown;

static SIMPLE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^=}]+)\}").expect("valid path segment regex"));
static NAMED_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^=}]+)=([^}]+)\}").expect("valid path segment regex"));

const DEFAULT_MARKER: &str = "Default:";
const DEFAULT_EXTENSION: &str = "x-default";

#[derive(Debug, Default)]
pub struct PathParameters {
    pub parameters: Vec<Parameter>,
    /// Request fields bound by the template; they never become query
    /// parameters.
    pub covered: Vec<String>,
    /// The template with variables renamed to their parameter names.
    pub path: String,
}

pub fn build_path_parameters(
    reflector: &Reflector<'_>,
    template: &str,
    input: &MessageDesc,
    worklist: &mut SchemaWorklist,
) -> PathParameters {
    let settings = reflector.settings();
    let mut out = PathParameters {
        path: template.to_string(),
        ..Default::default()
    };

    for captures in SIMPLE_SEGMENT.captures_iter(template) {
        let name = &captures[1];
        out.covered.push(name.to_string());
        let formatted = find_and_format_field_name(settings, name, input);
        out.path = out
            .path
            .replace(&format!("{{{name}}}"), &format!("{{{formatted}}}"));

        let mut parameter = Parameter::new(formatted, ParameterLocation::Path);
        parameter.required = true;
        match input.find_field(name) {
            Some(field) => {
                parameter.schema = reflector.schema_for_field(field, worklist);
                if !field.description.is_empty() {
                    parameter.description = Some(field.description.clone());
                }
            }
            None => {
                debug!("path variable {name} is not a field of {}", input.full_name);
                parameter.schema = Some(Schema::string().into());
            }
        }
        out.parameters.push(parameter);
    }

    if let Some(captures) = NAMED_SEGMENT.captures(template) {
        out.covered.push(captures[1].to_string());
        let mut parts: Vec<String> = captures[2].split('/').map(str::to_string).collect();
        let mut i = 0;
        while i + 1 < parts.len() {
            let name = singular(&find_and_format_field_name(settings, &parts[i], input));
            parts[i + 1] = format!("{{{name}}}");
            let mut parameter = Parameter::new(name.clone(), ParameterLocation::Path);
            parameter.required = true;
            parameter.description = Some(format!("The {name} id."));
            parameter.schema = Some(Schema::string().into());
            out.parameters.push(parameter);
            i += 2;
        }
        out.path = out.path.replace(&captures[0], &parts.join("/"));
    }

    out
}

/// Query parameters contributed by one request field. `depths` counts how
/// many times each message type is being expanded on the current branch.
pub fn build_query_parameters(
    reflector: &Reflector<'_>,
    field: &FieldDesc,
    depths: &mut HashMap<String, usize>,
    worklist: &mut SchemaWorklist,
) -> Vec<Parameter> {
    let mut out = Vec::new();
    collect_query_parameters(reflector, field, "", "", depths, worklist, &mut out);
    out
}

fn collect_query_parameters(
    reflector: &Reflector<'_>,
    field: &FieldDesc,
    prefix: &str,
    inherited_description: &str,
    depths: &mut HashMap<String, usize>,
    worklist: &mut SchemaWorklist,
    out: &mut Vec<Parameter>,
) {
    let settings = reflector.settings();
    if reflector.descriptors().is_map(field) {
        return;
    }
    let comment = if field.description.is_empty() {
        inherited_description
    } else {
        field.description.as_str()
    };
    let name = format!("{prefix}{}", format_field_name(settings, field));

    if let FieldKind::Message(type_name) = &field.kind {
        if field.repeated {
            debug!("skipping repeated message field {name} in query");
            return;
        }
        if !wellknown::is_query_leaf(type_name) {
            let Some(message) = reflector.descriptors().message(type_name) else {
                warn!("message {type_name} not found in descriptors");
                return;
            };
            let depth = depths.get(type_name).copied().unwrap_or(0);
            if depth >= settings.circular_depth {
                return;
            }
            depths.insert(type_name.clone(), depth + 1);
            let prefix = format!("{name}.");
            for sub_field in &message.fields {
                collect_query_parameters(
                    reflector, sub_field, &prefix, comment, depths, worklist, out,
                );
            }
            depths.insert(type_name.clone(), depth);
            return;
        }
    }

    let (description, default) = description_and_default(comment);
    let mut parameter = Parameter::new(name, ParameterLocation::Query);
    parameter.schema = reflector.schema_for_field(field, worklist);
    if !description.is_empty() {
        parameter.description = Some(description);
    }
    if let Some(default) = default {
        parameter
            .extensions
            .insert(DEFAULT_EXTENSION.to_string(), Value::String(default));
    }
    out.push(parameter);
}

/// First comment line as the description, plus whatever follows the first
/// `Default:` marker.
fn description_and_default(comment: &str) -> (String, Option<String>) {
    let description = comment.lines().next().unwrap_or_default().trim().to_string();
    let default = comment
        .lines()
        .find_map(|line| line.split_once(DEFAULT_MARKER))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty());
    (description, default)
}

pub fn build_request_body(
    reflector: &Reflector<'_>,
    body: &str,
    input: &MessageDesc,
    worklist: &mut SchemaWorklist,
) -> Option<RequestBody> {
    let schema = match body {
        "" => return None,
        "*" => Some(reflector.schema_for_message(input, worklist)),
        name => match input.find_field(name) {
            Some(field) => match &field.kind {
                FieldKind::Message(type_name) => {
                    reflector.schema_for_message_type(type_name, worklist)
                }
                FieldKind::String => Some(Schema::string().into()),
                kind => {
                    warn!(
                        "unsupported body field {name} of kind {} in {}",
                        kind.as_str(),
                        input.full_name
                    );
                    None
                }
            },
            None => {
                warn!("body field {name} not found in {}", input.full_name);
                None
            }
        },
    };

    let mut content = IndexMap::new();
    content.insert(
        "application/json".to_string(),
        MediaType {
            schema,
            example: None,
        },
    );
    Some(RequestBody {
        description: None,
        content,
        required: true,
    })
}
