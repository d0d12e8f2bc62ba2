// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Reads a protobuf compiler request into a [`DescriptorSet`].
//!
//! The request is decoded twice: each file once as a plain
//! `FileDescriptorProto`, which gives structure and comments, and all files
//! together as a [`DescriptorPool`], which keeps the custom options and lets
//! us resolve the `google.api` and `openapi.v3` extensions.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use prost::Message as _;
use prost_reflect::{DescriptorPool, DynamicMessage, Value as ReflectValue};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    ServiceDescriptorProto, SourceCodeInfo,
};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::descriptor::{
    json_name, qualified_name, DescriptorSet, EnumDesc, EnumValueDesc, FieldBehavior, FieldDesc,
    FieldKind, FileDesc, HttpPattern, HttpRule, MessageDesc, MethodDesc, ServiceDesc,
};
use crate::error::Result;

const HTTP: &str = "google.api.http";
const DEFAULT_HOST: &str = "google.api.default_host";
const FIELD_BEHAVIOR: &str = "google.api.field_behavior";
const DOCUMENT: &str = "openapi.v3.document";
const SERVICE: &str = "openapi.v3.service";
const OPERATION: &str = "openapi.v3.operation";
const SCHEMA: &str = "openapi.v3.schema";
const PROPERTY: &str = "openapi.v3.property";

static LINTER_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(-- .* --\)").expect("valid linter rule regex"));

/// `CodeGeneratorRequest` with the files left encoded, so options the
/// generated `prost_types` structs do not know about survive.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RawCodeGeneratorRequest {
    #[prost(string, repeated, tag = "1")]
    pub file_to_generate: Vec<String>,
    #[prost(string, optional, tag = "2")]
    pub parameter: Option<String>,
    #[prost(bytes = "vec", repeated, tag = "15")]
    pub proto_file: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
struct RawFileDescriptorSet {
    #[prost(bytes = "vec", repeated, tag = "1")]
    file: Vec<Vec<u8>>,
}

/// A decoded plugin request.
#[derive(Debug)]
pub struct PluginRequest {
    /// The raw `--openapi_opt` parameter string.
    pub parameter: String,
    pub descriptors: DescriptorSet,
}

impl PluginRequest {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let raw = RawCodeGeneratorRequest::decode(bytes)?;
        let set = RawFileDescriptorSet {
            file: raw.proto_file.clone(),
        };
        let pool = DescriptorPool::decode(set.encode_to_vec().as_slice())?;
        let files = raw
            .proto_file
            .iter()
            .map(|bytes| FileDescriptorProto::decode(bytes.as_slice()))
            .collect::<Result<Vec<_>, _>>()?;
        let descriptors = load_descriptors(&pool, &files, &raw.file_to_generate);
        Ok(Self {
            parameter: raw.parameter.unwrap_or_default(),
            descriptors,
        })
    }
}

/// Builds the descriptor model for `files`, reading extension options from
/// `pool`. Files named in `to_generate` are marked for output.
pub fn load_descriptors(
    pool: &DescriptorPool,
    files: &[FileDescriptorProto],
    to_generate: &[String],
) -> DescriptorSet {
    let to_generate: HashSet<&str> = to_generate.iter().map(String::as_str).collect();
    let mut loader = Loader {
        options: OptionReader { pool },
        set: DescriptorSet::default(),
    };
    for file in files {
        loader.load_file(file, to_generate.contains(file.name()));
    }
    loader.set
}

#[derive(Default)]
struct SourceCodeComments {
    entries: HashMap<Vec<i32>, String>,
}

impl SourceCodeComments {
    fn from_source_info(info: Option<&SourceCodeInfo>) -> Self {
        let mut entries = HashMap::new();
        if let Some(info) = info {
            for location in &info.location {
                let comment = location.leading_comments.as_deref().and_then(normalize_comment);
                if let Some(comment) = comment {
                    entries.insert(location.path.clone(), comment);
                }
            }
        }
        Self { entries }
    }

    fn comment_for(&self, path: &[i32]) -> String {
        self.entries.get(path).cloned().unwrap_or_default()
    }
}

/// Drops linter directives and the space protoc leaves after `//`.
fn normalize_comment(raw: &str) -> Option<String> {
    let filtered = LINTER_RULE.replace_all(raw, "");
    let lines: Vec<&str> = filtered
        .lines()
        .map(|line| line.strip_prefix(' ').unwrap_or(line).trim_end())
        .collect();
    let joined = lines.join("\n");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn extend_path(base: &[i32], field_number: i32, index: i32) -> Vec<i32> {
    let mut path = base.to_vec();
    path.push(field_number);
    path.push(index);
    path
}

fn normalize_type_name(name: &str) -> String {
    name.trim_start_matches('.').to_string()
}

/// Reads extension options through the descriptor pool.
struct OptionReader<'a> {
    pool: &'a DescriptorPool,
}

impl OptionReader<'_> {
    fn extension(&self, options: &DynamicMessage, name: &str) -> Option<ReflectValue> {
        let extension = self.pool.get_extension_by_name(name)?;
        if !options.has_extension(&extension) {
            return None;
        }
        Some(options.get_extension(&extension).into_owned())
    }

    /// Decodes a message-typed extension through its JSON mapping.
    fn annotation<T: DeserializeOwned>(
        &self,
        options: Option<DynamicMessage>,
        name: &str,
    ) -> Option<T> {
        let value = self.extension(&options?, name)?;
        let ReflectValue::Message(message) = value else {
            warn!("extension {name} is not a message");
            return None;
        };
        let json = match serde_json::to_value(&message) {
            Ok(json) => json,
            Err(err) => {
                warn!("failed to read extension {name}: {err}");
                return None;
            }
        };
        match serde_json::from_value(json) {
            Ok(annotation) => Some(annotation),
            Err(err) => {
                warn!("ignoring malformed extension {name}: {err}");
                None
            }
        }
    }

    fn string(&self, options: Option<DynamicMessage>, name: &str) -> Option<String> {
        match self.extension(&options?, name)? {
            ReflectValue::String(value) => Some(value),
            _ => None,
        }
    }

    fn field_behaviors(&self, options: Option<DynamicMessage>) -> Vec<FieldBehavior> {
        options
            .and_then(|options| self.extension(&options, FIELD_BEHAVIOR))
            .map(|value| field_behaviors(&value))
            .unwrap_or_default()
    }

    fn http_rules(&self, options: Option<DynamicMessage>) -> Vec<HttpRule> {
        self.annotation::<HttpRuleJson>(options, HTTP)
            .map(HttpRuleJson::into_rules)
            .unwrap_or_default()
    }
}

fn field_behaviors(value: &ReflectValue) -> Vec<FieldBehavior> {
    match value {
        ReflectValue::List(values) => values
            .iter()
            .filter_map(|value| value.as_enum_number())
            .filter_map(FieldBehavior::from_number)
            .collect(),
        other => other
            .as_enum_number()
            .and_then(FieldBehavior::from_number)
            .into_iter()
            .collect(),
    }
}

/// JSON mapping of `google.api.HttpRule`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct HttpRuleJson {
    get: Option<String>,
    put: Option<String>,
    post: Option<String>,
    delete: Option<String>,
    patch: Option<String>,
    custom: Option<CustomPatternJson>,
    body: String,
    additional_bindings: Vec<HttpRuleJson>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CustomPatternJson {
    kind: String,
    path: String,
}

impl HttpRuleJson {
    fn pattern(&self) -> HttpPattern {
        if let Some(path) = &self.get {
            HttpPattern::Get(path.clone())
        } else if let Some(path) = &self.put {
            HttpPattern::Put(path.clone())
        } else if let Some(path) = &self.post {
            HttpPattern::Post(path.clone())
        } else if let Some(path) = &self.delete {
            HttpPattern::Delete(path.clone())
        } else if let Some(path) = &self.patch {
            HttpPattern::Patch(path.clone())
        } else if let Some(custom) = &self.custom {
            debug!("custom http pattern {} {}", custom.kind, custom.path);
            HttpPattern::Custom(custom.kind.clone())
        } else {
            HttpPattern::Unknown
        }
    }

    /// The rule followed by its additional bindings; bindings nested deeper
    /// than one level are ignored.
    fn into_rules(self) -> Vec<HttpRule> {
        let mut rules = vec![HttpRule {
            pattern: self.pattern(),
            body: self.body.clone(),
        }];
        rules.extend(self.additional_bindings.iter().map(|binding| HttpRule {
            pattern: binding.pattern(),
            body: binding.body.clone(),
        }));
        rules
    }
}

struct Loader<'a> {
    options: OptionReader<'a>,
    set: DescriptorSet,
}

impl Loader<'_> {
    fn load_file(&mut self, file: &FileDescriptorProto, generate: bool) {
        let package = file.package().to_string();
        let comments = SourceCodeComments::from_source_info(file.source_code_info.as_ref());
        let pool = self.options.pool;

        let mut desc = FileDesc::new(file.name(), package.as_str());
        desc.generate = generate;
        desc.document = self.options.annotation(
            pool.get_file_by_name(file.name()).map(|f| f.options()),
            DOCUMENT,
        );
        for (idx, message) in (0..).zip(&file.message_type) {
            let full_name = qualified_name(&package, message.name());
            desc.messages.push(full_name.clone());
            self.load_message(&package, None, full_name, message, &[4, idx], &comments);
        }
        for (idx, enumeration) in (0..).zip(&file.enum_type) {
            let full_name = qualified_name(&package, enumeration.name());
            self.load_enum(full_name, enumeration, &[5, idx], &comments);
        }
        for (idx, service) in (0..).zip(&file.service) {
            desc.services
                .push(self.load_service(&package, service, &[6, idx], &comments));
        }
        debug!(
            "loaded {} ({} messages, {} services)",
            file.name(),
            desc.messages.len(),
            desc.services.len()
        );
        self.set.add_file(desc);
    }

    fn load_message(
        &mut self,
        package: &str,
        parent: Option<&str>,
        full_name: String,
        descriptor: &DescriptorProto,
        path: &[i32],
        comments: &SourceCodeComments,
    ) {
        let reflected = self.options.pool.get_message_by_name(&full_name);
        let mut desc = MessageDesc {
            name: descriptor.name().to_string(),
            full_name: full_name.clone(),
            package: package.to_string(),
            parent: parent.map(str::to_string),
            description: comments.comment_for(path),
            map_entry: descriptor
                .options
                .as_ref()
                .and_then(|options| options.map_entry)
                .unwrap_or(false),
            annotation: self
                .options
                .annotation(reflected.as_ref().map(|m| m.options()), SCHEMA),
            ..Default::default()
        };

        for (idx, field) in (0..).zip(&descriptor.field) {
            let options = reflected
                .as_ref()
                .and_then(|m| m.get_field_by_name(field.name()))
                .map(|f| f.options());
            desc.fields
                .push(self.load_field(field, options, &extend_path(path, 2, idx), comments));
        }
        for (idx, nested) in (0..).zip(&descriptor.nested_type) {
            let nested_name = format!("{full_name}.{}", nested.name());
            desc.nested.push(nested_name.clone());
            self.load_message(
                package,
                Some(descriptor.name()),
                nested_name,
                nested,
                &extend_path(path, 3, idx),
                comments,
            );
        }
        for (idx, enumeration) in (0..).zip(&descriptor.enum_type) {
            let enum_name = format!("{full_name}.{}", enumeration.name());
            self.load_enum(enum_name, enumeration, &extend_path(path, 4, idx), comments);
        }
        self.set.add_message(desc);
    }

    fn load_field(
        &self,
        field: &FieldDescriptorProto,
        options: Option<DynamicMessage>,
        path: &[i32],
        comments: &SourceCodeComments,
    ) -> FieldDesc {
        let type_name = normalize_type_name(field.type_name());
        let kind = match field.r#type() {
            Type::Double => FieldKind::Double,
            Type::Float => FieldKind::Float,
            Type::Int64 => FieldKind::Int64,
            Type::Uint64 => FieldKind::Uint64,
            Type::Int32 => FieldKind::Int32,
            Type::Fixed64 => FieldKind::Fixed64,
            Type::Fixed32 => FieldKind::Fixed32,
            Type::Bool => FieldKind::Bool,
            Type::String => FieldKind::String,
            Type::Group => FieldKind::Group(type_name),
            Type::Message => FieldKind::Message(type_name),
            Type::Bytes => FieldKind::Bytes,
            Type::Uint32 => FieldKind::Uint32,
            Type::Enum => FieldKind::Enum(type_name),
            Type::Sfixed32 => FieldKind::Sfixed32,
            Type::Sfixed64 => FieldKind::Sfixed64,
            Type::Sint32 => FieldKind::Sint32,
            Type::Sint64 => FieldKind::Sint64,
        };
        FieldDesc {
            name: field.name().to_string(),
            json_name: field
                .json_name
                .clone()
                .unwrap_or_else(|| json_name(field.name())),
            number: field.number(),
            kind,
            repeated: field.label() == Label::Repeated,
            description: comments.comment_for(path),
            behaviors: self.options.field_behaviors(options.clone()),
            deprecated: field
                .options
                .as_ref()
                .and_then(|options| options.deprecated)
                .unwrap_or(false),
            annotation: self.options.annotation(options, PROPERTY),
        }
    }

    fn load_enum(
        &mut self,
        full_name: String,
        descriptor: &EnumDescriptorProto,
        path: &[i32],
        comments: &SourceCodeComments,
    ) {
        let values = (0..)
            .zip(&descriptor.value)
            .map(|(idx, value)| EnumValueDesc {
                name: value.name().to_string(),
                number: value.number(),
                description: comments.comment_for(&extend_path(path, 2, idx)),
            })
            .collect();
        self.set.add_enum(EnumDesc {
            name: descriptor.name().to_string(),
            full_name,
            values,
        });
    }

    fn load_service(
        &self,
        package: &str,
        descriptor: &ServiceDescriptorProto,
        path: &[i32],
        comments: &SourceCodeComments,
    ) -> ServiceDesc {
        let full_name = qualified_name(package, descriptor.name());
        let reflected = self.options.pool.get_service_by_name(&full_name);
        let service_options = || reflected.as_ref().map(|s| s.options());

        let methods = (0..)
            .zip(&descriptor.method)
            .map(|(idx, method)| {
                let method_options = || {
                    reflected
                        .as_ref()
                        .and_then(|s| s.methods().find(|m| m.name() == method.name()))
                        .map(|m| m.options())
                };
                MethodDesc {
                    name: method.name().to_string(),
                    input_type: normalize_type_name(method.input_type()),
                    output_type: normalize_type_name(method.output_type()),
                    description: comments.comment_for(&extend_path(path, 2, idx)),
                    http_rules: self.options.http_rules(method_options()),
                    annotation: self.options.annotation(method_options(), OPERATION),
                }
            })
            .collect();

        ServiceDesc {
            name: descriptor.name().to_string(),
            full_name,
            description: comments.comment_for(path),
            default_host: self.options.string(service_options(), DEFAULT_HOST),
            methods,
            annotation: self.options.annotation(service_options(), SERVICE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::descriptor_proto::ExtensionRange;
    use prost_types::source_code_info::Location;
    use prost_types::{EnumValueDescriptorProto, MessageOptions, MethodDescriptorProto};

    fn location(path: Vec<i32>, comment: &str) -> Location {
        Location {
            path,
            leading_comments: Some(comment.into()),
            ..Default::default()
        }
    }

    fn field(name: &str, number: i32, ty: Type, type_name: Option<&str>) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.into()),
            number: Some(number),
            label: Some(Label::Optional as i32),
            r#type: Some(ty as i32),
            type_name: type_name.map(Into::into),
            json_name: Some(json_name(name)),
            ..Default::default()
        }
    }

    fn library_file() -> FileDescriptorProto {
        let labels_entry = DescriptorProto {
            name: Some("LabelsEntry".into()),
            field: vec![
                field("key", 1, Type::String, None),
                field("value", 2, Type::String, None),
            ],
            options: Some(MessageOptions {
                map_entry: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut labels = field(
            "labels",
            3,
            Type::Message,
            Some(".library.v1.Shelf.LabelsEntry"),
        );
        labels.label = Some(Label::Repeated as i32);

        let shelf = DescriptorProto {
            name: Some("Shelf".into()),
            field: vec![
                field("name", 1, Type::String, None),
                field("genre", 2, Type::Enum, Some(".library.v1.Genre")),
                labels,
            ],
            nested_type: vec![labels_entry],
            ..Default::default()
        };
        let genre = EnumDescriptorProto {
            name: Some("Genre".into()),
            value: vec![
                EnumValueDescriptorProto {
                    name: Some("GENRE_UNSPECIFIED".into()),
                    number: Some(0),
                    ..Default::default()
                },
                EnumValueDescriptorProto {
                    name: Some("FICTION".into()),
                    number: Some(1),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let service = ServiceDescriptorProto {
            name: Some("LibraryService".into()),
            method: vec![MethodDescriptorProto {
                name: Some("GetShelf".into()),
                input_type: Some(".library.v1.Shelf".into()),
                output_type: Some(".library.v1.Shelf".into()),
                ..Default::default()
            }],
            ..Default::default()
        };

        FileDescriptorProto {
            name: Some("library/v1/library.proto".into()),
            package: Some("library.v1".into()),
            message_type: vec![shelf],
            enum_type: vec![genre],
            service: vec![service],
            syntax: Some("proto3".into()),
            source_code_info: Some(SourceCodeInfo {
                location: vec![
                    location(
                        vec![4, 0],
                        " A shelf of books.\n (-- api-linter: core::0123=disabled --)\n",
                    ),
                    location(vec![4, 0, 2, 0], " Resource name.\n Default: none\n"),
                    location(vec![4, 0, 3, 0], " Free-form labels.\n"),
                    location(vec![4, 0, 3, 0, 2, 1], " Label value.\n"),
                    location(vec![5, 0, 2, 1], " Made up stories.\n"),
                    location(vec![6, 0], " Manages shelves.\n"),
                    location(vec![6, 0, 2, 0], " Gets a shelf.\n"),
                ],
            }),
            ..Default::default()
        }
    }

    fn request(files: Vec<Vec<u8>>, to_generate: &str) -> Vec<u8> {
        RawCodeGeneratorRequest {
            file_to_generate: vec![to_generate.into()],
            parameter: Some("naming=json".into()),
            proto_file: files,
        }
        .encode_to_vec()
    }

    #[test]
    fn loads_structure_and_comments() {
        let bytes = request(
            vec![library_file().encode_to_vec()],
            "library/v1/library.proto",
        );
        let request = PluginRequest::decode(&bytes).unwrap();
        assert_eq!(request.parameter, "naming=json");
        let set = &request.descriptors;

        let file = &set.files()[0];
        assert!(file.generate);
        assert_eq!(file.messages, vec!["library.v1.Shelf"]);

        let shelf = set.message("library.v1.Shelf").unwrap();
        assert_eq!(shelf.description, "A shelf of books.");
        assert_eq!(shelf.nested, vec!["library.v1.Shelf.LabelsEntry"]);
        assert_eq!(shelf.fields[0].description, "Resource name.\nDefault: none");
        assert_eq!(
            shelf.fields[1].kind,
            FieldKind::Enum("library.v1.Genre".into())
        );
        assert!(set.is_map(&shelf.fields[2]));

        let entry = set.message("library.v1.Shelf.LabelsEntry").unwrap();
        assert_eq!(entry.parent.as_deref(), Some("Shelf"));
        assert_eq!(entry.description, "Free-form labels.");
        assert_eq!(entry.fields[0].description, "");
        assert_eq!(entry.fields[1].description, "Label value.");

        let genre = set.enumeration("library.v1.Genre").unwrap();
        assert_eq!(genre.values[0].description, "");
        assert_eq!(genre.values[1].description, "Made up stories.");

        let service = &file.services[0];
        assert_eq!(service.full_name, "library.v1.LibraryService");
        assert_eq!(service.description, "Manages shelves.");
        assert_eq!(service.methods[0].description, "Gets a shelf.");
        assert_eq!(service.methods[0].input_type, "library.v1.Shelf");
        assert!(service.methods[0].http_rules.is_empty());
        assert_eq!(service.default_host, None);
    }

    #[test]
    fn rejects_garbage() {
        assert!(PluginRequest::decode(&[0xff, 0xff, 0xff]).is_err());
    }

    // Option messages carrying the extension fields the real protos declare.
    #[derive(Clone, PartialEq, prost::Message)]
    struct TestHttpRule {
        #[prost(string, tag = "2")]
        get: String,
        #[prost(string, tag = "4")]
        post: String,
        #[prost(string, tag = "7")]
        body: String,
        #[prost(message, repeated, tag = "11")]
        additional_bindings: Vec<TestHttpRule>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    struct TestMethodOptions {
        #[prost(message, optional, tag = "72295728")]
        http: Option<TestHttpRule>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    struct TestServiceOptions {
        #[prost(string, optional, tag = "1049")]
        default_host: Option<String>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    struct TestMethod {
        #[prost(string, tag = "1")]
        name: String,
        #[prost(string, tag = "2")]
        input_type: String,
        #[prost(string, tag = "3")]
        output_type: String,
        #[prost(message, optional, tag = "4")]
        options: Option<TestMethodOptions>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    struct TestService {
        #[prost(string, tag = "1")]
        name: String,
        #[prost(message, repeated, tag = "2")]
        method: Vec<TestMethod>,
        #[prost(message, optional, tag = "3")]
        options: Option<TestServiceOptions>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    struct TestFile {
        #[prost(string, tag = "1")]
        name: String,
        #[prost(string, tag = "2")]
        package: String,
        #[prost(string, repeated, tag = "3")]
        dependency: Vec<String>,
        #[prost(message, repeated, tag = "4")]
        message_type: Vec<DescriptorProto>,
        #[prost(message, repeated, tag = "6")]
        service: Vec<TestService>,
    }

    fn options_message(name: &str) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.into()),
            extension_range: vec![ExtensionRange {
                start: Some(1000),
                end: Some(536_870_912),
                options: None,
            }],
            ..Default::default()
        }
    }

    fn extension(
        name: &str,
        number: i32,
        ty: Type,
        type_name: Option<&str>,
        extendee: &str,
    ) -> FieldDescriptorProto {
        FieldDescriptorProto {
            extendee: Some(extendee.into()),
            json_name: None,
            ..field(name, number, ty, type_name)
        }
    }

    fn google_files() -> Vec<Vec<u8>> {
        let descriptor = FileDescriptorProto {
            name: Some("google/protobuf/descriptor.proto".into()),
            package: Some("google.protobuf".into()),
            message_type: vec![
                options_message("MethodOptions"),
                options_message("ServiceOptions"),
            ],
            ..Default::default()
        };
        let mut additional_bindings =
            field("additional_bindings", 11, Type::Message, Some(".google.api.HttpRule"));
        additional_bindings.label = Some(Label::Repeated as i32);
        let http = FileDescriptorProto {
            name: Some("google/api/http.proto".into()),
            package: Some("google.api".into()),
            message_type: vec![DescriptorProto {
                name: Some("HttpRule".into()),
                field: vec![
                    field("get", 2, Type::String, None),
                    field("post", 4, Type::String, None),
                    field("body", 7, Type::String, None),
                    additional_bindings,
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        let annotations = FileDescriptorProto {
            name: Some("google/api/annotations.proto".into()),
            package: Some("google.api".into()),
            dependency: vec![
                "google/api/http.proto".into(),
                "google/protobuf/descriptor.proto".into(),
            ],
            extension: vec![extension(
                "http",
                72_295_728,
                Type::Message,
                Some(".google.api.HttpRule"),
                ".google.protobuf.MethodOptions",
            )],
            ..Default::default()
        };
        let client = FileDescriptorProto {
            name: Some("google/api/client.proto".into()),
            package: Some("google.api".into()),
            dependency: vec!["google/protobuf/descriptor.proto".into()],
            extension: vec![extension(
                "default_host",
                1049,
                Type::String,
                None,
                ".google.protobuf.ServiceOptions",
            )],
            ..Default::default()
        };
        vec![
            descriptor.encode_to_vec(),
            http.encode_to_vec(),
            annotations.encode_to_vec(),
            client.encode_to_vec(),
        ]
    }

    #[test]
    fn reads_http_rules_and_default_host() {
        let file = TestFile {
            name: "shelves.proto".into(),
            package: "shelves".into(),
            dependency: vec![
                "google/api/annotations.proto".into(),
                "google/api/client.proto".into(),
            ],
            message_type: vec![DescriptorProto {
                name: Some("Shelf".into()),
                field: vec![field("name", 1, Type::String, None)],
                ..Default::default()
            }],
            service: vec![TestService {
                name: "Shelves".into(),
                method: vec![TestMethod {
                    name: "GetShelf".into(),
                    input_type: ".shelves.Shelf".into(),
                    output_type: ".shelves.Shelf".into(),
                    options: Some(TestMethodOptions {
                        http: Some(TestHttpRule {
                            get: "/v1/{name=shelves/*}".into(),
                            additional_bindings: vec![TestHttpRule {
                                post: "/v1/shelves:get".into(),
                                body: "*".into(),
                                ..Default::default()
                            }],
                            ..Default::default()
                        }),
                    }),
                }],
                options: Some(TestServiceOptions {
                    default_host: Some("shelves.example.com".into()),
                }),
            }],
        };
        let mut files = google_files();
        files.push(file.encode_to_vec());
        let request = PluginRequest::decode(&request(files, "shelves.proto")).unwrap();
        let set = &request.descriptors;

        assert_eq!(set.files().len(), 5);
        assert!(set.files().iter().filter(|f| f.generate).count() == 1);
        let service = &set.files()[4].services[0];
        assert_eq!(service.default_host.as_deref(), Some("shelves.example.com"));
        assert_eq!(
            service.methods[0].http_rules,
            vec![
                HttpRule::get("/v1/{name=shelves/*}"),
                HttpRule::post("/v1/shelves:get", "*"),
            ]
        );
    }

    #[test]
    fn http_rule_json_mapping() {
        let rule: HttpRuleJson = serde_json::from_value(serde_json::json!({
            "patch": "/v1/{book.name=shelves/*/books/*}",
            "body": "book",
            "additionalBindings": [
                {"custom": {"kind": "HEAD", "path": "/v1/books"}},
                {"selector": "ignored"}
            ]
        }))
        .unwrap();
        let rules = rule.into_rules();
        assert_eq!(
            rules[0],
            HttpRule {
                pattern: HttpPattern::Patch("/v1/{book.name=shelves/*/books/*}".into()),
                body: "book".into(),
            }
        );
        assert_eq!(rules[1].pattern, HttpPattern::Custom("HEAD".into()));
        assert_eq!(rules[2].pattern, HttpPattern::Unknown);
    }

    #[test]
    fn field_behavior_values() {
        let value = ReflectValue::List(vec![
            ReflectValue::EnumNumber(2),
            ReflectValue::EnumNumber(3),
            ReflectValue::EnumNumber(42),
        ]);
        assert_eq!(
            field_behaviors(&value),
            vec![FieldBehavior::Required, FieldBehavior::OutputOnly]
        );
    }

    #[test]
    fn source_paths() {
        assert_eq!(extend_path(&[4, 1], 3, 2), vec![4, 1, 3, 2]);
        assert_eq!(extend_path(&[6, 0], 2, i32::MAX), vec![6, 0, 2, i32::MAX]);
    }

    #[test]
    fn comment_normalization() {
        assert_eq!(
            normalize_comment(" First line.\n   indented\n (-- internal --)\n").as_deref(),
            Some("First line.\n  indented")
        );
        assert_eq!(normalize_comment(" (-- only a directive --)\n"), None);
    }
}
