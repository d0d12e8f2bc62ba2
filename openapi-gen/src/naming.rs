// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! External names for messages and fields.

use crate::config::{Naming, Settings};
use crate::descriptor::{FieldDesc, MessageDesc};
use crate::wellknown::{ANY, VALUE};

/// Component schema name of a message.
pub fn format_message_name(settings: &Settings, message: &MessageDesc) -> String {
    if !settings.fq_schema_naming {
        match message.full_name.as_str() {
            VALUE => return "GoogleProtobufValue".into(),
            ANY => return "GoogleProtobufAny".into(),
            _ => {}
        }
    }

    let mut name = match &message.parent {
        Some(parent) => format!("{parent}_{}", message.name),
        None => message.name.clone(),
    };
    if settings.naming == Naming::Json {
        name = capitalize(&name);
    }
    if settings.fq_schema_naming && !message.package.is_empty() {
        name = format!("{}.{name}", message.package);
    }
    name
}

/// Property or parameter name of a field.
pub fn format_field_name(settings: &Settings, field: &FieldDesc) -> String {
    match settings.naming {
        Naming::Proto => field.name.clone(),
        Naming::Json => field.json_name.clone(),
    }
}

/// Resolves `name` against the fields of `message` and formats the match;
/// names that are not fields come back unchanged.
pub fn find_and_format_field_name(settings: &Settings, name: &str, message: &MessageDesc) -> String {
    match message.find_field(name) {
        Some(field) => format_field_name(settings, field),
        None => name.to_string(),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (None, _) => String::new(),
        (Some(first), None) => first.to_lowercase().collect(),
        (Some(first), Some(_)) => first.to_uppercase().chain(name.chars().skip(1)).collect(),
    }
}

/// Collection name to resource name: `shelves` becomes `shelf`, `libraries`
/// becomes `library`, `books` becomes `book`.
///
/// This is a suffix heuristic, so words like `status` come out as `statu`.
pub fn singular(plural: &str) -> String {
    if let Some(stem) = plural.strip_suffix("ves") {
        return format!("{stem}f");
    }
    if let Some(stem) = plural.strip_suffix("ies") {
        return format!("{stem}y");
    }
    if let Some(stem) = plural.strip_suffix('s') {
        return stem.to_string();
    }
    plural.to_string()
}
