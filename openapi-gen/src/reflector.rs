// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Field and message descriptors to OpenAPI schemas.
//!
//! Ordinary messages are never inlined: they become `$ref`s to a component
//! schema and their name is queued on a [`SchemaWorklist`], which the
//! document assembler drains afterwards. The worklist is passed explicitly
//! through every call so all state lives with the caller.

use std::collections::HashSet;
use std::fmt::Write as _;

use indexmap::IndexSet;
use serde_json::Value;
use tracing::warn;

use crate::config::{EnumType, Settings};
use crate::descriptor::{DescriptorSet, FieldBehavior, FieldDesc, FieldKind, MessageDesc};
use crate::model::{Schema, SchemaOrReference};
use crate::naming::{format_field_name, format_message_name};
use crate::wellknown::{self, WellKnown};

/// Component schemas that are referenced but not yet written, plus the set
/// of names already written.
#[derive(Debug, Default)]
pub struct SchemaWorklist {
    required: IndexSet<String>,
    emitted: HashSet<String>,
    cursor: usize,
}

impl SchemaWorklist {
    /// Queues `name`; returns false when it was already queued.
    pub fn require(&mut self, name: &str) -> bool {
        self.required.insert(name.to_string())
    }

    pub fn is_emitted(&self, name: &str) -> bool {
        self.emitted.contains(name)
    }

    /// Records `name` as written; returns false when it already was.
    pub fn mark_emitted(&mut self, name: &str) -> bool {
        self.emitted.insert(name.to_string())
    }

    /// Names queued since the previous round. Each name is handed out once.
    pub fn next_round(&mut self) -> Vec<String> {
        let round: Vec<String> = self
            .required
            .iter()
            .skip(self.cursor)
            .cloned()
            .collect();
        self.cursor = self.required.len();
        round
    }

    /// Queued names that never got a schema.
    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.required
            .iter()
            .filter(|name| !self.emitted.contains(*name))
            .map(String::as_str)
    }
}

pub struct Reflector<'a> {
    settings: &'a Settings,
    descriptors: &'a DescriptorSet,
}

impl<'a> Reflector<'a> {
    pub fn new(settings: &'a Settings, descriptors: &'a DescriptorSet) -> Self {
        Self {
            settings,
            descriptors,
        }
    }

    pub fn settings(&self) -> &'a Settings {
        self.settings
    }

    pub fn descriptors(&self) -> &'a DescriptorSet {
        self.descriptors
    }

    pub fn message_name(&self, message: &MessageDesc) -> String {
        format_message_name(self.settings, message)
    }

    /// Component name for a message type, whether or not its file was part
    /// of the request.
    pub fn message_name_for(&self, full_name: &str) -> String {
        match self.descriptors.message(full_name) {
            Some(message) => self.message_name(message),
            None => {
                let (package, name) = full_name.rsplit_once('.').unwrap_or(("", full_name));
                self.message_name(&MessageDesc::new(package, name))
            }
        }
    }

    /// Schema for a whole message used as a body: the inline schema of a
    /// by-value well-known type, otherwise a component reference.
    pub fn schema_for_message(
        &self,
        message: &MessageDesc,
        worklist: &mut SchemaWorklist,
    ) -> SchemaOrReference {
        if let Some(WellKnown::Inline(schema)) =
            wellknown::schema_for_well_known_type(&message.full_name)
        {
            return schema.into();
        }
        let name = self.message_name(message);
        worklist.require(&name);
        SchemaOrReference::component(&name)
    }

    /// Like [`Self::schema_for_message`], by full name.
    pub fn schema_for_message_type(
        &self,
        full_name: &str,
        worklist: &mut SchemaWorklist,
    ) -> Option<SchemaOrReference> {
        match self.descriptors.message(full_name) {
            Some(message) => Some(self.schema_for_message(message, worklist)),
            None => match wellknown::schema_for_well_known_type(full_name) {
                Some(WellKnown::Inline(schema)) => Some(schema.into()),
                _ => {
                    warn!("message {full_name} not found in descriptors");
                    None
                }
            },
        }
    }

    pub fn schema_for_field(
        &self,
        field: &FieldDesc,
        worklist: &mut SchemaWorklist,
    ) -> Option<SchemaOrReference> {
        if let Some(entry) = self.descriptors.map_entry(field) {
            let value = entry
                .fields
                .iter()
                .find(|f| f.number == 2)
                .and_then(|value| self.schema_for_field(value, worklist));
            return Some(wellknown::map_schema(value).into());
        }

        let element = match &field.kind {
            FieldKind::Message(type_name) => {
                match wellknown::schema_for_well_known_type(type_name) {
                    Some(WellKnown::Inline(schema)) => schema.into(),
                    Some(WellKnown::Omit) => return None,
                    None => self.schema_for_message_type(type_name, worklist)?,
                }
            }
            FieldKind::Enum(type_name) => self.enum_schema(type_name)?.into(),
            FieldKind::Group(type_name) => {
                warn!(
                    "unsupported group field {} of type {type_name}",
                    field.name
                );
                return None;
            }
            kind => scalar_schema(kind)?.into(),
        };

        if field.repeated {
            Some(Schema::array(element).into())
        } else {
            Some(element)
        }
    }

    fn enum_schema(&self, full_name: &str) -> Option<Schema> {
        let Some(enumeration) = self.descriptors.enumeration(full_name) else {
            warn!("enum {full_name} not found in descriptors");
            return None;
        };

        let mut description = String::new();
        let mut schema = match self.settings.enum_type {
            EnumType::String => Schema::string(),
            EnumType::Integer => Schema::typed("integer"),
        };
        for value in &enumeration.values {
            let rendered = match self.settings.enum_type {
                EnumType::String => Value::String(value.name.clone()),
                EnumType::Integer => Value::from(value.number),
            };
            let comment = value.description.trim();
            if !comment.is_empty() {
                let label = match self.settings.enum_type {
                    EnumType::String => value.name.clone(),
                    EnumType::Integer => value.number.to_string(),
                };
                let _ = writeln!(description, "- {comment}: {label}");
            }
            if schema.default.is_none() {
                schema.default = Some(rendered.clone());
            }
            schema.enum_values.push(rendered);
        }
        if !description.is_empty() {
            schema.description = Some(description);
        }
        Some(schema)
    }

    /// Component schema of an ordinary message.
    pub fn message_schema(&self, message: &MessageDesc, worklist: &mut SchemaWorklist) -> Schema {
        let mut schema = Schema::typed("object");
        if !message.description.is_empty() {
            schema.description = Some(message.description.clone());
        }

        for field in &message.fields {
            let Some(mut property) = self.schema_for_field(field, worklist) else {
                continue;
            };
            let name = format_field_name(self.settings, field);
            let read_only = field.has_behavior(FieldBehavior::OutputOnly);
            let write_only = field.has_behavior(FieldBehavior::InputOnly);
            if field.has_behavior(FieldBehavior::Required) {
                schema.required.push(name.clone());
            }

            let has_siblings = read_only
                || write_only
                || field.deprecated
                || !field.description.is_empty()
                || field.annotation.is_some();
            if has_siblings && property.is_reference() {
                property = Schema {
                    all_of: vec![property],
                    ..Default::default()
                }
                .into();
            }
            if let Some(inline) = property.as_schema_mut() {
                inline.read_only |= read_only;
                inline.write_only |= write_only;
                inline.deprecated |= field.deprecated;
                if inline.description.is_none() && !field.description.is_empty() {
                    inline.description = Some(field.description.clone());
                }
                if let Some(annotation) = &field.annotation {
                    annotation.merge_into(inline);
                }
            }
            schema.properties.insert(name, property);
        }

        if let Some(annotation) = &message.annotation {
            annotation.merge_into(&mut schema);
        }
        schema
    }
}

fn scalar_schema(kind: &FieldKind) -> Option<Schema> {
    Some(match kind {
        FieldKind::String => Schema::string(),
        FieldKind::Int32
        | FieldKind::Sint32
        | FieldKind::Uint32
        | FieldKind::Fixed32
        | FieldKind::Sfixed32 => Schema::typed("integer").with_format(kind.as_str()),
        // 64-bit integers are quoted in the JSON mapping.
        FieldKind::Int64
        | FieldKind::Sint64
        | FieldKind::Uint64
        | FieldKind::Fixed64
        | FieldKind::Sfixed64 => Schema::string(),
        FieldKind::Bool => Schema::typed("boolean"),
        FieldKind::Float | FieldKind::Double => Schema::typed("number").with_format(kind.as_str()),
        FieldKind::Bytes => Schema::string().with_format("bytes"),
        FieldKind::Enum(_) | FieldKind::Message(_) | FieldKind::Group(_) => return None,
    })
}
