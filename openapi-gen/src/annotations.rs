// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! `openapi.v3.*` option payloads and how they are folded into the output.
//!
//! The payloads arrive as the protobuf JSON rendering of the gnostic OpenAPI
//! messages, so the shapes here follow that encoding: named maps are lists of
//! `{name, value}` pairs, free-form values are `{yaml: "..."}` snippets and
//! 64-bit integers may be quoted. Every `merge_into` lets the annotation win:
//! scalars that are set replace the generated value, lists are appended and
//! nested objects are merged recursively.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::model::{
    AdditionalProperties, Contact, Document, ExternalDocs, Extensions, License, Operation,
    Parameter, ParameterLocation, ParameterOrReference, Reference, Schema, SchemaOrReference,
    SecurityRequirement, Server, Tag,
};

/// Free-form value carried as a YAML snippet.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AnyValue {
    #[serde(default)]
    pub yaml: String,
}

impl AnyValue {
    pub fn to_value(&self) -> Value {
        parse_yaml_scalar(&self.yaml)
    }
}

/// Parses a YAML snippet, keeping the raw text when it does not parse.
pub fn parse_yaml_scalar(raw: &str) -> Value {
    serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct NamedAny {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<AnyValue>,
}

fn extend_extensions(target: &mut Extensions, source: &[NamedAny]) {
    for named in source {
        if named.name.is_empty() {
            continue;
        }
        let value = named.value.as_ref().map(AnyValue::to_value).unwrap_or(Value::Null);
        target.insert(named.name.clone(), value);
    }
}

fn set_if_present(target: &mut Option<String>, value: &str) {
    if !value.is_empty() {
        *target = Some(value.to_string());
    }
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    Ok(match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(NumberOrString::Number(n)) => Some(n),
        Some(NumberOrString::String(s)) => Some(s.parse().map_err(serde::de::Error::custom)?),
        None => None,
    })
}

/// A `{name, value}` pair inside a gnostic named map.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Named<T> {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<T>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedList<T> {
    #[serde(default)]
    pub additional_properties: Vec<Named<T>>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ReferenceAnnotation {
    #[serde(rename = "$ref", alias = "_ref", alias = "Ref", default)]
    pub reference: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ExternalDocsAnnotation {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
}

impl ExternalDocsAnnotation {
    pub fn merge_into(&self, target: &mut Option<ExternalDocs>) {
        let docs = target.get_or_insert_with(ExternalDocs::default);
        set_if_present(&mut docs.description, &self.description);
        if !self.url.is_empty() {
            docs.url = self.url.clone();
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ServerAnnotation {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
}

impl ServerAnnotation {
    pub fn to_server(&self) -> Server {
        Server {
            url: self.url.clone(),
            description: (!self.description.is_empty()).then(|| self.description.clone()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct StringArray {
    #[serde(default)]
    pub value: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRequirementAnnotation {
    #[serde(default)]
    pub additional_properties: Vec<Named<StringArray>>,
}

impl SecurityRequirementAnnotation {
    pub fn to_requirement(&self) -> SecurityRequirement {
        self.additional_properties
            .iter()
            .map(|named| {
                let scopes = named
                    .value
                    .as_ref()
                    .map(|v| v.value.clone())
                    .unwrap_or_default();
                (named.name.clone(), scopes)
            })
            .collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct DefaultValue {
    #[serde(default)]
    pub number: Option<f64>,
    #[serde(default)]
    pub boolean: Option<bool>,
    #[serde(default)]
    pub string: Option<String>,
}

impl DefaultValue {
    pub fn to_value(&self) -> Option<Value> {
        if let Some(number) = self.number {
            return serde_json::Number::from_f64(number).map(Value::Number);
        }
        if let Some(boolean) = self.boolean {
            return Some(Value::Bool(boolean));
        }
        self.string.clone().map(Value::String)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaOrReferenceAnnotation {
    #[serde(default)]
    pub schema: Option<Box<SchemaAnnotation>>,
    #[serde(default)]
    pub reference: Option<ReferenceAnnotation>,
}

impl SchemaOrReferenceAnnotation {
    pub fn to_schema_or_reference(&self) -> Option<SchemaOrReference> {
        if let Some(reference) = &self.reference {
            return Some(SchemaOrReference::Reference(Reference {
                reference: reference.reference.clone(),
            }));
        }
        self.schema.as_ref().map(|schema| schema.to_schema().into())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsAnnotation {
    #[serde(default)]
    pub schema_or_reference: Vec<SchemaOrReferenceAnnotation>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalPropertiesAnnotation {
    #[serde(default)]
    pub schema_or_reference: Option<SchemaOrReferenceAnnotation>,
    #[serde(default)]
    pub boolean: Option<bool>,
}

/// `openapi.v3.schema` on messages and `openapi.v3.property` on fields.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaAnnotation {
    pub nullable: bool,
    pub read_only: bool,
    pub write_only: bool,
    pub deprecated: bool,
    pub title: String,
    pub description: String,
    pub format: String,
    pub pattern: String,
    #[serde(rename = "type")]
    pub schema_type: String,
    pub multiple_of: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_maximum: bool,
    pub minimum: Option<f64>,
    pub exclusive_minimum: bool,
    #[serde(deserialize_with = "lenient_u64")]
    pub max_length: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub min_length: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub max_items: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub min_items: Option<u64>,
    pub unique_items: bool,
    #[serde(deserialize_with = "lenient_u64")]
    pub max_properties: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub min_properties: Option<u64>,
    pub required: Vec<String>,
    #[serde(rename = "enum")]
    pub enum_values: Vec<AnyValue>,
    pub example: Option<AnyValue>,
    pub default: Option<DefaultValue>,
    pub items: Option<ItemsAnnotation>,
    pub properties: Option<NamedList<SchemaOrReferenceAnnotation>>,
    pub additional_properties: Option<AdditionalPropertiesAnnotation>,
    pub all_of: Vec<SchemaOrReferenceAnnotation>,
    pub one_of: Vec<SchemaOrReferenceAnnotation>,
    pub any_of: Vec<SchemaOrReferenceAnnotation>,
    pub specification_extension: Vec<NamedAny>,
}

impl SchemaAnnotation {
    pub fn to_schema(&self) -> Schema {
        let mut schema = Schema::default();
        self.merge_into(&mut schema);
        schema
    }

    pub fn merge_into(&self, schema: &mut Schema) {
        schema.nullable |= self.nullable;
        schema.read_only |= self.read_only;
        schema.write_only |= self.write_only;
        schema.deprecated |= self.deprecated;
        schema.exclusive_maximum |= self.exclusive_maximum;
        schema.exclusive_minimum |= self.exclusive_minimum;
        schema.unique_items |= self.unique_items;

        set_if_present(&mut schema.title, &self.title);
        set_if_present(&mut schema.description, &self.description);
        set_if_present(&mut schema.format, &self.format);
        set_if_present(&mut schema.pattern, &self.pattern);
        set_if_present(&mut schema.schema_type, &self.schema_type);

        schema.multiple_of = self.multiple_of.or(schema.multiple_of);
        schema.maximum = self.maximum.or(schema.maximum);
        schema.minimum = self.minimum.or(schema.minimum);
        schema.max_length = self.max_length.or(schema.max_length);
        schema.min_length = self.min_length.or(schema.min_length);
        schema.max_items = self.max_items.or(schema.max_items);
        schema.min_items = self.min_items.or(schema.min_items);
        schema.max_properties = self.max_properties.or(schema.max_properties);
        schema.min_properties = self.min_properties.or(schema.min_properties);

        for name in &self.required {
            if !schema.required.contains(name) {
                schema.required.push(name.clone());
            }
        }
        for value in self.enum_values.iter().map(AnyValue::to_value) {
            if !schema.enum_values.contains(&value) {
                schema.enum_values.push(value);
            }
        }
        if let Some(example) = &self.example {
            schema.example = Some(example.to_value());
        }
        if let Some(default) = self.default.as_ref().and_then(DefaultValue::to_value) {
            schema.default = Some(default);
        }

        if let Some(item) = self
            .items
            .as_ref()
            .and_then(|items| items.schema_or_reference.first())
        {
            match schema.items.as_deref_mut() {
                Some(existing) => merge_schema_or_reference(existing, item),
                None => schema.items = item.to_schema_or_reference().map(Box::new),
            }
        }
        if let Some(properties) = &self.properties {
            for named in &properties.additional_properties {
                let Some(value) = &named.value else { continue };
                match schema.properties.get_mut(&named.name) {
                    Some(existing) => merge_schema_or_reference(existing, value),
                    None => {
                        if let Some(property) = value.to_schema_or_reference() {
                            schema.properties.insert(named.name.clone(), property);
                        }
                    }
                }
            }
        }
        if let Some(additional) = &self.additional_properties {
            if let Some(inner) = additional
                .schema_or_reference
                .as_ref()
                .and_then(SchemaOrReferenceAnnotation::to_schema_or_reference)
            {
                schema.additional_properties = Some(AdditionalProperties::Schema(Box::new(inner)));
            } else if let Some(flag) = additional.boolean {
                schema.additional_properties = Some(AdditionalProperties::Bool(flag));
            }
        }
        schema.all_of.extend(
            self.all_of
                .iter()
                .filter_map(SchemaOrReferenceAnnotation::to_schema_or_reference),
        );
        schema.one_of.extend(
            self.one_of
                .iter()
                .filter_map(SchemaOrReferenceAnnotation::to_schema_or_reference),
        );
        schema.any_of.extend(
            self.any_of
                .iter()
                .filter_map(SchemaOrReferenceAnnotation::to_schema_or_reference),
        );
        extend_extensions(&mut schema.extensions, &self.specification_extension);
    }
}

fn merge_schema_or_reference(target: &mut SchemaOrReference, annotation: &SchemaOrReferenceAnnotation) {
    if annotation.reference.is_none() {
        if let (Some(schema), Some(existing)) = (&annotation.schema, target.as_schema_mut()) {
            schema.merge_into(existing);
            return;
        }
    }
    if let Some(replacement) = annotation.to_schema_or_reference() {
        *target = replacement;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParameterAnnotation {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub description: String,
    pub required: bool,
    pub deprecated: bool,
    pub style: String,
    pub explode: bool,
    pub schema: Option<SchemaOrReferenceAnnotation>,
    pub example: Option<AnyValue>,
    pub specification_extension: Vec<NamedAny>,
}

impl ParameterAnnotation {
    pub fn to_parameter(&self) -> Option<Parameter> {
        let location = match self.location.as_str() {
            "path" => ParameterLocation::Path,
            "query" => ParameterLocation::Query,
            "header" => ParameterLocation::Header,
            "cookie" => ParameterLocation::Cookie,
            other => {
                warn!(
                    "skipping parameter {}: unsupported location {other:?}",
                    self.name
                );
                return None;
            }
        };
        let mut parameter = Parameter::new(self.name.clone(), location);
        set_if_present(&mut parameter.description, &self.description);
        set_if_present(&mut parameter.style, &self.style);
        parameter.required = self.required || location == ParameterLocation::Path;
        parameter.deprecated = self.deprecated;
        parameter.explode = self.explode.then_some(true);
        parameter.schema = self
            .schema
            .as_ref()
            .and_then(SchemaOrReferenceAnnotation::to_schema_or_reference);
        parameter.example = self.example.as_ref().map(AnyValue::to_value);
        extend_extensions(&mut parameter.extensions, &self.specification_extension);
        Some(parameter)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ParameterOrReferenceAnnotation {
    #[serde(default)]
    pub parameter: Option<ParameterAnnotation>,
    #[serde(default)]
    pub reference: Option<ReferenceAnnotation>,
}

impl ParameterOrReferenceAnnotation {
    pub fn to_parameter_or_reference(&self) -> Option<ParameterOrReference> {
        if let Some(reference) = &self.reference {
            return Some(ParameterOrReference::Reference(Reference {
                reference: reference.reference.clone(),
            }));
        }
        self.parameter
            .as_ref()
            .and_then(ParameterAnnotation::to_parameter)
            .map(ParameterOrReference::Parameter)
    }
}

fn convert_parameters(annotations: &[ParameterOrReferenceAnnotation]) -> Vec<ParameterOrReference> {
    annotations
        .iter()
        .filter_map(ParameterOrReferenceAnnotation::to_parameter_or_reference)
        .collect()
}

/// `openapi.v3.service` on services; applied to every operation of the service.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceAnnotation {
    pub tags: Vec<String>,
    pub external_docs: Option<ExternalDocsAnnotation>,
    pub parameters: Vec<ParameterOrReferenceAnnotation>,
    pub security: Vec<SecurityRequirementAnnotation>,
    pub servers: Vec<ServerAnnotation>,
    pub specification_extension: Vec<NamedAny>,
}

impl ServiceAnnotation {
    pub fn merge_into(&self, operation: &mut Operation) {
        operation.parameters.extend(convert_parameters(&self.parameters));
        extend_extensions(&mut operation.extensions, &self.specification_extension);
        operation.tags.extend(self.tags.iter().cloned());
        operation
            .servers
            .extend(self.servers.iter().map(ServerAnnotation::to_server));
        operation.security.extend(
            self.security
                .iter()
                .map(SecurityRequirementAnnotation::to_requirement),
        );
        if let Some(docs) = &self.external_docs {
            docs.merge_into(&mut operation.external_docs);
        }
    }
}

/// `openapi.v3.operation` on methods.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperationAnnotation {
    pub tags: Vec<String>,
    pub summary: String,
    pub description: String,
    pub external_docs: Option<ExternalDocsAnnotation>,
    pub operation_id: String,
    pub parameters: Vec<ParameterOrReferenceAnnotation>,
    pub deprecated: bool,
    pub security: Vec<SecurityRequirementAnnotation>,
    pub servers: Vec<ServerAnnotation>,
    pub specification_extension: Vec<NamedAny>,
}

impl OperationAnnotation {
    pub fn merge_into(&self, operation: &mut Operation) {
        operation.tags.extend(self.tags.iter().cloned());
        set_if_present(&mut operation.summary, &self.summary);
        set_if_present(&mut operation.description, &self.description);
        set_if_present(&mut operation.operation_id, &self.operation_id);
        if let Some(docs) = &self.external_docs {
            docs.merge_into(&mut operation.external_docs);
        }
        operation.parameters.extend(convert_parameters(&self.parameters));
        operation.deprecated |= self.deprecated;
        operation.security.extend(
            self.security
                .iter()
                .map(SecurityRequirementAnnotation::to_requirement),
        );
        operation
            .servers
            .extend(self.servers.iter().map(ServerAnnotation::to_server));
        extend_extensions(&mut operation.extensions, &self.specification_extension);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ContactAnnotation {
    pub name: String,
    pub url: String,
    pub email: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LicenseAnnotation {
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfoAnnotation {
    pub title: String,
    pub description: String,
    pub terms_of_service: String,
    pub contact: Option<ContactAnnotation>,
    pub license: Option<LicenseAnnotation>,
    pub version: String,
    pub specification_extension: Vec<NamedAny>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TagAnnotation {
    pub name: String,
    pub description: String,
    pub external_docs: Option<ExternalDocsAnnotation>,
    pub specification_extension: Vec<NamedAny>,
}

impl TagAnnotation {
    pub fn to_tag(&self) -> Tag {
        let mut tag = Tag {
            name: self.name.clone(),
            ..Default::default()
        };
        set_if_present(&mut tag.description, &self.description);
        if let Some(docs) = &self.external_docs {
            docs.merge_into(&mut tag.external_docs);
        }
        extend_extensions(&mut tag.extensions, &self.specification_extension);
        tag
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComponentsAnnotation {
    pub schemas: Option<NamedList<SchemaOrReferenceAnnotation>>,
    pub security_schemes: Option<NamedList<Value>>,
}

/// `openapi.v3.document` on files.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentAnnotation {
    pub openapi: String,
    pub info: Option<InfoAnnotation>,
    pub servers: Vec<ServerAnnotation>,
    pub components: Option<ComponentsAnnotation>,
    pub security: Vec<SecurityRequirementAnnotation>,
    pub tags: Vec<TagAnnotation>,
    pub external_docs: Option<ExternalDocsAnnotation>,
    pub specification_extension: Vec<NamedAny>,
}

impl DocumentAnnotation {
    pub fn merge_into(&self, document: &mut Document) {
        if !self.openapi.is_empty() {
            document.openapi = self.openapi.clone();
        }
        if let Some(info) = &self.info {
            if !info.title.is_empty() {
                document.info.title = info.title.clone();
            }
            if !info.version.is_empty() {
                document.info.version = info.version.clone();
            }
            set_if_present(&mut document.info.description, &info.description);
            set_if_present(&mut document.info.terms_of_service, &info.terms_of_service);
            if let Some(contact) = &info.contact {
                let target = document.info.contact.get_or_insert_with(Contact::default);
                set_if_present(&mut target.name, &contact.name);
                set_if_present(&mut target.url, &contact.url);
                set_if_present(&mut target.email, &contact.email);
            }
            if let Some(license) = &info.license {
                let target = document.info.license.get_or_insert_with(License::default);
                if !license.name.is_empty() {
                    target.name = license.name.clone();
                }
                set_if_present(&mut target.url, &license.url);
            }
            extend_extensions(&mut document.info.extensions, &info.specification_extension);
        }
        document
            .servers
            .extend(self.servers.iter().map(ServerAnnotation::to_server));
        document.security.extend(
            self.security
                .iter()
                .map(SecurityRequirementAnnotation::to_requirement),
        );
        document
            .tags
            .extend(self.tags.iter().map(TagAnnotation::to_tag));
        if let Some(docs) = &self.external_docs {
            docs.merge_into(&mut document.external_docs);
        }
        if let Some(components) = &self.components {
            if let Some(schemas) = &components.schemas {
                for named in &schemas.additional_properties {
                    if let Some(schema) = named
                        .value
                        .as_ref()
                        .and_then(SchemaOrReferenceAnnotation::to_schema_or_reference)
                    {
                        document
                            .components
                            .schemas
                            .insert(named.name.clone(), schema);
                    }
                }
            }
            if let Some(schemes) = &components.security_schemes {
                for named in &schemes.additional_properties {
                    if let Some(value) = &named.value {
                        document
                            .components
                            .security_schemes
                            .insert(named.name.clone(), normalize_named_value(value));
                    }
                }
            }
        }
        extend_extensions(&mut document.extensions, &self.specification_extension);
    }
}

/// Converts a gnostic-encoded value into plain OpenAPI JSON: `{securityScheme: x}`
/// and similar one-of wrappers are unwrapped, named lists become objects and
/// specification extensions are inlined.
fn normalize_named_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(reference) = map.get("reference") {
                    return normalize_named_value(reference);
                }
                for key in ["securityScheme", "schema", "parameter", "response"] {
                    if let Some(inner) = map.get(key) {
                        return normalize_named_value(inner);
                    }
                }
            }
            let mut out = serde_json::Map::new();
            for (key, inner) in map {
                match (key.as_str(), inner) {
                    ("additionalProperties", Value::Array(entries)) => {
                        for entry in entries {
                            let name = entry.get("name").and_then(Value::as_str);
                            if let (Some(name), Some(value)) = (name, entry.get("value")) {
                                out.insert(name.to_string(), normalize_named_value(value));
                            }
                        }
                    }
                    ("specificationExtension", Value::Array(entries)) => {
                        for entry in entries {
                            let name = entry.get("name").and_then(Value::as_str);
                            let yaml = entry
                                .get("value")
                                .and_then(|v| v.get("yaml"))
                                .and_then(Value::as_str);
                            if let (Some(name), Some(yaml)) = (name, yaml) {
                                out.insert(name.to_string(), parse_yaml_scalar(yaml));
                            }
                        }
                    }
                    _ => {
                        out.insert(key.clone(), normalize_named_value(inner));
                    }
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize_named_value).collect()),
        other => other.clone(),
    }
}
