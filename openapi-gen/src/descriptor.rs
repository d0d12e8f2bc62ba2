// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Owned view of the protobuf descriptors the generator reads.
//!
//! The compiler hands us raw `FileDescriptorProto`s; [`crate::source`] turns
//! them into this model once, resolving comments and extension options up
//! front, so the rest of the crate never touches protobuf reflection. The
//! builder helpers make it easy to assemble small descriptor sets by hand.

use std::collections::HashMap;

use crate::annotations::{
    DocumentAnnotation, OperationAnnotation, SchemaAnnotation, ServiceAnnotation,
};
use crate::model::HttpMethod;

#[derive(Clone, Debug, Default)]
pub struct DescriptorSet {
    files: Vec<FileDesc>,
    messages: HashMap<String, MessageDesc>,
    enums: HashMap<String, EnumDesc>,
}

impl DescriptorSet {
    pub fn add_file(&mut self, file: FileDesc) {
        self.files.push(file);
    }

    pub fn add_message(&mut self, message: MessageDesc) {
        self.messages.insert(message.full_name.clone(), message);
    }

    pub fn add_enum(&mut self, enumeration: EnumDesc) {
        self.enums.insert(enumeration.full_name.clone(), enumeration);
    }

    pub fn files(&self) -> &[FileDesc] {
        &self.files
    }

    pub fn message(&self, full_name: &str) -> Option<&MessageDesc> {
        self.messages.get(full_name)
    }

    pub fn enumeration(&self, full_name: &str) -> Option<&EnumDesc> {
        self.enums.get(full_name)
    }

    /// The synthetic entry message when `field` is a map field.
    pub fn map_entry(&self, field: &FieldDesc) -> Option<&MessageDesc> {
        if !field.repeated {
            return None;
        }
        match &field.kind {
            FieldKind::Message(type_name) => self.message(type_name).filter(|m| m.map_entry),
            _ => None,
        }
    }

    pub fn is_map(&self, field: &FieldDesc) -> bool {
        self.map_entry(field).is_some()
    }

    /// Visits every message of `file`, nested messages before their parent.
    pub fn walk_messages<'a>(&'a self, file: &'a FileDesc, visit: &mut impl FnMut(&'a MessageDesc)) {
        for name in &file.messages {
            self.walk_message(name, visit);
        }
    }

    fn walk_message<'a>(&'a self, full_name: &str, visit: &mut impl FnMut(&'a MessageDesc)) {
        let Some(message) = self.message(full_name) else {
            return;
        };
        for nested in &message.nested {
            self.walk_message(nested, visit);
        }
        visit(message);
    }
}

#[derive(Clone, Debug, Default)]
pub struct FileDesc {
    pub name: String,
    pub package: String,
    /// Whether the compiler asked for output for this file.
    pub generate: bool,
    /// Full names of the top-level messages.
    pub messages: Vec<String>,
    pub services: Vec<ServiceDesc>,
    pub document: Option<DocumentAnnotation>,
}

impl FileDesc {
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            generate: true,
            ..Default::default()
        }
    }

    pub fn message(mut self, full_name: impl Into<String>) -> Self {
        self.messages.push(full_name.into());
        self
    }

    pub fn service(mut self, service: ServiceDesc) -> Self {
        self.services.push(service);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct MessageDesc {
    pub name: String,
    pub full_name: String,
    pub package: String,
    /// Name of the immediately enclosing message, if any.
    pub parent: Option<String>,
    pub description: String,
    pub fields: Vec<FieldDesc>,
    /// Full names of nested messages.
    pub nested: Vec<String>,
    pub map_entry: bool,
    pub annotation: Option<SchemaAnnotation>,
}

impl MessageDesc {
    pub fn new(package: &str, name: &str) -> Self {
        Self {
            name: name.into(),
            full_name: qualified_name(package, name),
            package: package.into(),
            ..Default::default()
        }
    }

    /// A message declared inside `parent`.
    pub fn nested_in(parent: &MessageDesc, name: &str) -> Self {
        Self {
            name: name.into(),
            full_name: format!("{}.{name}", parent.full_name),
            package: parent.package.clone(),
            parent: Some(parent.name.clone()),
            ..Default::default()
        }
    }

    pub fn field(mut self, field: FieldDesc) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Looks a field up by its declared or JSON name.
    pub fn find_field(&self, name: &str) -> Option<&FieldDesc> {
        self.fields
            .iter()
            .find(|f| f.name == name || f.json_name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Enum(String),
    Message(String),
    Group(String),
}

impl FieldKind {
    /// The protobuf name of the kind, used as the OpenAPI `format`.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Double => "double",
            FieldKind::Float => "float",
            FieldKind::Int32 => "int32",
            FieldKind::Int64 => "int64",
            FieldKind::Uint32 => "uint32",
            FieldKind::Uint64 => "uint64",
            FieldKind::Sint32 => "sint32",
            FieldKind::Sint64 => "sint64",
            FieldKind::Fixed32 => "fixed32",
            FieldKind::Fixed64 => "fixed64",
            FieldKind::Sfixed32 => "sfixed32",
            FieldKind::Sfixed64 => "sfixed64",
            FieldKind::Bool => "bool",
            FieldKind::String => "string",
            FieldKind::Bytes => "bytes",
            FieldKind::Enum(_) => "enum",
            FieldKind::Message(_) => "message",
            FieldKind::Group(_) => "group",
        }
    }

    pub fn message_type(&self) -> Option<&str> {
        match self {
            FieldKind::Message(name) => Some(name),
            _ => None,
        }
    }
}

/// Values of `google.api.field_behavior`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldBehavior {
    Optional,
    Required,
    OutputOnly,
    InputOnly,
    Immutable,
    UnorderedList,
    NonEmptyDefault,
    Identifier,
}

impl FieldBehavior {
    pub fn from_number(number: i32) -> Option<Self> {
        Some(match number {
            1 => FieldBehavior::Optional,
            2 => FieldBehavior::Required,
            3 => FieldBehavior::OutputOnly,
            4 => FieldBehavior::InputOnly,
            5 => FieldBehavior::Immutable,
            6 => FieldBehavior::UnorderedList,
            7 => FieldBehavior::NonEmptyDefault,
            8 => FieldBehavior::Identifier,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug)]
pub struct FieldDesc {
    pub name: String,
    pub json_name: String,
    pub number: i32,
    pub kind: FieldKind,
    pub repeated: bool,
    pub description: String,
    pub behaviors: Vec<FieldBehavior>,
    pub deprecated: bool,
    pub annotation: Option<SchemaAnnotation>,
}

impl FieldDesc {
    pub fn new(name: &str, number: i32, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            json_name: json_name(name),
            number,
            kind,
            repeated: false,
            description: String::new(),
            behaviors: Vec::new(),
            deprecated: false,
            annotation: None,
        }
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_behavior(mut self, behavior: FieldBehavior) -> Self {
        self.behaviors.push(behavior);
        self
    }

    pub fn has_behavior(&self, behavior: FieldBehavior) -> bool {
        self.behaviors.contains(&behavior)
    }
}

#[derive(Clone, Debug, Default)]
pub struct EnumDesc {
    pub name: String,
    pub full_name: String,
    pub values: Vec<EnumValueDesc>,
}

impl EnumDesc {
    pub fn new(package: &str, name: &str) -> Self {
        Self {
            name: name.into(),
            full_name: qualified_name(package, name),
            values: Vec::new(),
        }
    }

    pub fn value(mut self, name: &str, number: i32, description: &str) -> Self {
        self.values.push(EnumValueDesc {
            name: name.into(),
            number,
            description: description.into(),
        });
        self
    }
}

#[derive(Clone, Debug)]
pub struct EnumValueDesc {
    pub name: String,
    pub number: i32,
    pub description: String,
}

#[derive(Clone, Debug, Default)]
pub struct ServiceDesc {
    pub name: String,
    pub full_name: String,
    pub description: String,
    /// `google.api.default_host`.
    pub default_host: Option<String>,
    pub methods: Vec<MethodDesc>,
    pub annotation: Option<ServiceAnnotation>,
}

impl ServiceDesc {
    pub fn new(package: &str, name: &str) -> Self {
        Self {
            name: name.into(),
            full_name: qualified_name(package, name),
            ..Default::default()
        }
    }

    pub fn method(mut self, method: MethodDesc) -> Self {
        self.methods.push(method);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct MethodDesc {
    pub name: String,
    /// Full name of the request message.
    pub input_type: String,
    /// Full name of the response message.
    pub output_type: String,
    pub description: String,
    /// Primary HTTP binding followed by its additional bindings.
    pub http_rules: Vec<HttpRule>,
    pub annotation: Option<OperationAnnotation>,
}

impl MethodDesc {
    pub fn new(name: &str, input_type: &str, output_type: &str) -> Self {
        Self {
            name: name.into(),
            input_type: input_type.into(),
            output_type: output_type.into(),
            ..Default::default()
        }
    }

    pub fn rule(mut self, rule: HttpRule) -> Self {
        self.http_rules.push(rule);
        self
    }
}

/// Pattern of a `google.api.HttpRule`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HttpPattern {
    Get(String),
    Put(String),
    Post(String),
    Delete(String),
    Patch(String),
    /// Custom verbs are not representable as OpenAPI operations.
    Custom(String),
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRule {
    pub pattern: HttpPattern,
    /// Request body selector: empty, `*`, or a top-level field name.
    pub body: String,
}

impl HttpRule {
    pub fn new(pattern: HttpPattern) -> Self {
        Self {
            pattern,
            body: String::new(),
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(HttpPattern::Get(path.into()))
    }

    pub fn post(path: &str, body: &str) -> Self {
        Self {
            pattern: HttpPattern::Post(path.into()),
            body: body.into(),
        }
    }

    /// The verb and path template, for the patterns that map to OpenAPI.
    pub fn binding(&self) -> Option<(HttpMethod, &str)> {
        match &self.pattern {
            HttpPattern::Get(path) => Some((HttpMethod::Get, path)),
            HttpPattern::Put(path) => Some((HttpMethod::Put, path)),
            HttpPattern::Post(path) => Some((HttpMethod::Post, path)),
            HttpPattern::Delete(path) => Some((HttpMethod::Delete, path)),
            HttpPattern::Patch(path) => Some((HttpMethod::Patch, path)),
            HttpPattern::Custom(_) | HttpPattern::Unknown => None,
        }
    }
}

pub fn qualified_name(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{package}.{name}")
    }
}

/// Default JSON name protoc assigns to a field: underscores are dropped and
/// the following letter is upper-cased.
pub fn json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
