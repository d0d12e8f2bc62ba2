// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

use openapi_gen::descriptor::{
    DescriptorSet, EnumDesc, FieldBehavior, FieldDesc, FieldKind, FileDesc, HttpPattern, HttpRule,
    MessageDesc, MethodDesc, ServiceDesc,
};
use openapi_gen::{
    base_configuration, generate, parse_base_document, ConfigError, Configuration, EnumType,
    Naming, OutputFormat, OutputMode, Settings,
};
use serde_json::{json, Value};

fn message(kind: &str) -> FieldKind {
    FieldKind::Message(kind.into())
}

fn library() -> DescriptorSet {
    let mut set = DescriptorSet::default();
    set.add_enum(
        EnumDesc::new("library.v1", "Genre")
            .value("GENRE_UNSPECIFIED", 0, "")
            .value("FICTION", 1, "Made up stories."),
    );
    set.add_message(
        MessageDesc::new("library.v1", "Book")
            .with_description("A single book.")
            .field(FieldDesc::new("name", 1, FieldKind::String).with_behavior(FieldBehavior::Required))
            .field(FieldDesc::new("page_count", 2, FieldKind::Int64))
            .field(FieldDesc::new("genre", 3, FieldKind::Enum("library.v1.Genre".into())))
            .field(FieldDesc::new("update_time", 4, message("google.protobuf.Timestamp"))),
    );
    set.add_message(
        MessageDesc::new("library.v1", "ListBooksRequest")
            .field(FieldDesc::new("parent", 1, FieldKind::String))
            .field(FieldDesc::new("page_size", 2, FieldKind::Int32))
            .field(FieldDesc::new("filter", 3, FieldKind::String)),
    );
    set.add_message(
        MessageDesc::new("library.v1", "ListBooksResponse")
            .field(FieldDesc::new("books", 1, message("library.v1.Book")).repeated())
            .field(FieldDesc::new("next_page_token", 2, FieldKind::String)),
    );
    set.add_message(
        MessageDesc::new("library.v1", "CreateBookRequest")
            .field(FieldDesc::new("parent", 1, FieldKind::String))
            .field(FieldDesc::new("book", 2, message("library.v1.Book"))),
    );
    set.add_message(
        MessageDesc::new("library.v1", "DeleteBookRequest")
            .field(FieldDesc::new("name", 1, FieldKind::String)),
    );

    let service = ServiceDesc::new("library.v1", "LibraryService")
        .method(
            MethodDesc::new(
                "ListBooks",
                "library.v1.ListBooksRequest",
                "library.v1.ListBooksResponse",
            )
            .rule(HttpRule::get("/v1/{parent=shelves/*}/books")),
        )
        .method(
            MethodDesc::new("CreateBook", "library.v1.CreateBookRequest", "library.v1.Book")
                .rule(HttpRule::post("/v1/{parent=shelves/*}/books", "book")),
        )
        .method(
            MethodDesc::new(
                "DeleteBook",
                "library.v1.DeleteBookRequest",
                "google.protobuf.Empty",
            )
            .rule(HttpRule::new(HttpPattern::Delete(
                "/v1/{name=shelves/*/books/*}".into(),
            ))),
        );
    set.add_file(
        FileDesc::new("library/v1/library.proto", "library.v1")
            .message("library.v1.Book")
            .message("library.v1.ListBooksRequest")
            .message("library.v1.ListBooksResponse")
            .message("library.v1.CreateBookRequest")
            .message("library.v1.DeleteBookRequest")
            .service(service),
    );
    set
}

fn generate_json(settings: &Settings, set: &DescriptorSet) -> Value {
    let settings = Settings {
        format: OutputFormat::Json,
        ..settings.clone()
    };
    let outputs = generate(&settings, set, None).unwrap();
    assert_eq!(outputs.len(), 1);
    serde_json::from_str(&outputs[0].content).unwrap()
}

#[test]
fn library_document() {
    let doc = generate_json(&Settings::default(), &library());

    assert_eq!(doc["openapi"], "3.0.3");
    assert_eq!(
        doc["info"],
        json!({"title": "API", "description": "Generated API", "version": "1.0.0"})
    );
    assert_eq!(doc["tags"], json!([{"name": "LibraryService"}]));

    let paths: Vec<&String> = doc["paths"].as_object().unwrap().keys().collect();
    assert_eq!(
        paths,
        vec!["/v1/shelves/{shelf}/books", "/v1/shelves/{shelf}/books/{book}"]
    );

    let list = &doc["paths"]["/v1/shelves/{shelf}/books"]["get"];
    assert_eq!(list["operationId"], "LibraryService_ListBooks");
    let parameters: Vec<(&str, &str)> = list["parameters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| (p["name"].as_str().unwrap(), p["in"].as_str().unwrap()))
        .collect();
    assert_eq!(
        parameters,
        vec![("shelf", "path"), ("page_size", "query"), ("filter", "query")]
    );
    let responses: Vec<&String> = list["responses"].as_object().unwrap().keys().collect();
    assert_eq!(responses, vec!["200", "default"]);

    let create = &doc["paths"]["/v1/shelves/{shelf}/books"]["post"];
    assert_eq!(
        create["requestBody"]["content"]["application/json"]["schema"],
        json!({"$ref": "#/components/schemas/Book"})
    );
    assert_eq!(create["parameters"].as_array().unwrap().len(), 1);

    let delete = &doc["paths"]["/v1/shelves/{shelf}/books/{book}"]["delete"];
    assert_eq!(delete["responses"]["200"], json!({"description": "OK"}));

    let schemas: Vec<&String> = doc["components"]["schemas"].as_object().unwrap().keys().collect();
    assert_eq!(
        schemas,
        vec!["Book", "GoogleProtobufAny", "ListBooksResponse", "Status"]
    );

    let book = &doc["components"]["schemas"]["Book"];
    assert_eq!(book["description"], "A single book.");
    assert_eq!(book["required"], json!(["name"]));
    assert_eq!(book["properties"]["page_count"], json!({"type": "string"}));
    assert_eq!(
        book["properties"]["update_time"],
        json!({"type": "string", "format": "date-time"})
    );
    assert_eq!(
        book["properties"]["genre"],
        json!({
            "type": "string",
            "description": "- Made up stories.: FICTION\n",
            "enum": ["GENRE_UNSPECIFIED", "FICTION"],
            "default": "GENRE_UNSPECIFIED"
        })
    );
    assert_eq!(
        doc["components"]["schemas"]["ListBooksResponse"]["properties"]["books"],
        json!({"type": "array", "items": {"$ref": "#/components/schemas/Book"}})
    );
}

#[test]
fn integer_enums_and_json_names() {
    let settings = Settings {
        enum_type: EnumType::Integer,
        naming: Naming::Json,
        ..Default::default()
    };
    let doc = generate_json(&settings, &library());
    let book = &doc["components"]["schemas"]["Book"];
    assert_eq!(book["properties"]["genre"]["type"], "integer");
    assert_eq!(book["properties"]["genre"]["enum"], json!([0, 1]));
    assert_eq!(book["properties"]["genre"]["default"], 0);
    assert!(book["properties"].get("pageCount").is_some());

    let list = &doc["paths"]["/v1/shelves/{shelf}/books"]["get"];
    assert_eq!(list["parameters"][1]["name"], "pageSize");
}

#[test]
fn output_is_deterministic() {
    let settings = Settings::default();
    let first = generate(&settings, &library(), None).unwrap();
    let second = generate(&settings, &library(), None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn schemas_are_registered_once() {
    let mut set = library();
    // A second file whose methods reference the same messages.
    set.add_file(
        FileDesc::new("library/v1/archive.proto", "library.v1").service(
            ServiceDesc::new("library.v1", "ArchiveService").method(
                MethodDesc::new(
                    "ListArchivedBooks",
                    "library.v1.ListBooksRequest",
                    "library.v1.ListBooksResponse",
                )
                .rule(HttpRule::get("/v1/archive/books")),
            ),
        ),
    );
    let outputs = generate(&Settings::default(), &set, None).unwrap();
    let yaml = &outputs[0].content;
    assert_eq!(yaml.matches("\n    ListBooksResponse:\n").count(), 1);
    assert_eq!(yaml.matches("\n    Status:\n").count(), 1);

    let doc: Value = serde_yaml::from_str(yaml).unwrap();
    let tags: Vec<&str> = doc["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(tags, vec!["ArchiveService", "LibraryService"]);
}

#[test]
fn source_relative_documents() {
    let mut set = library();
    set.add_file(FileDesc::new("library/v1/empty.proto", "library.v1"));
    let settings = Settings {
        output_mode: OutputMode::SourceRelative,
        ..Default::default()
    };
    let outputs = generate(&settings, &set, None).unwrap();
    let names: Vec<&str> = outputs.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["library/v1/library.openapi.yaml", "library/v1/empty.openapi.yaml"]
    );
    insta::assert_snapshot!(outputs[1].content, @r"
    # Generated with protoc-gen-openapi
    openapi: 3.0.3
    info:
      title: API
      description: Generated API
      version: 1.0.0
    paths: {}
    ");
}

#[test]
fn base_document_seeds_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("base.yaml");
    std::fs::write(
        &path,
        r#"openapi: 3.0.3
info:
  title: Library
  version: 2.1.0
servers:
  - url: https://library.example.com
components:
  schemas:
    Book:
      type: object
      description: Maintained by hand.
"#,
    )
    .unwrap();

    let base = parse_base_document(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let settings = Configuration::default()
        .merge(base_configuration(&base))
        .merge(Configuration {
            format: Some("json".into()),
            ..Default::default()
        })
        .validate()
        .unwrap();
    let outputs = generate(&settings, &library(), Some(&base)).unwrap();
    let doc: Value = serde_json::from_str(&outputs[0].content).unwrap();

    assert_eq!(doc["info"]["title"], "Library");
    assert_eq!(doc["info"]["version"], "2.1.0");
    assert_eq!(doc["servers"], json!([{"url": "https://library.example.com"}]));
    assert_eq!(
        doc["components"]["schemas"]["Book"],
        json!({"type": "object", "description": "Maintained by hand."})
    );
    assert!(doc["components"]["schemas"].get("ListBooksResponse").is_some());
}

#[test]
fn invalid_configuration_fails_before_generation() {
    let err = Configuration {
        depth: Some(0),
        ..Default::default()
    }
    .validate()
    .unwrap_err();
    assert_eq!(err, ConfigError::InvalidDepth(0));
}

#[test]
fn additional_bindings_share_the_operation() {
    let mut set = DescriptorSet::default();
    set.add_message(
        MessageDesc::new("library.v1", "GetBookRequest")
            .field(FieldDesc::new("id", 1, FieldKind::String)),
    );
    set.add_message(
        MessageDesc::new("library.v1", "Book").field(FieldDesc::new("id", 1, FieldKind::String)),
    );
    let service = ServiceDesc::new("library.v1", "LibraryService").method(
        MethodDesc::new("GetBook", "library.v1.GetBookRequest", "library.v1.Book")
            .rule(HttpRule::get("/v1/books/{id}"))
            .rule(HttpRule::post("/v1/books/lookup", "*")),
    );
    set.add_file(
        FileDesc::new("library/v1/library.proto", "library.v1")
            .message("library.v1.GetBookRequest")
            .message("library.v1.Book")
            .service(service),
    );

    let doc = generate_json(&Settings::default(), &set);
    let paths: Vec<&String> = doc["paths"].as_object().unwrap().keys().collect();
    assert_eq!(paths, vec!["/v1/books/lookup", "/v1/books/{id}"]);
    assert_eq!(
        doc["paths"]["/v1/books/{id}"]["get"]["operationId"],
        "LibraryService_GetBook"
    );
    assert_eq!(
        doc["paths"]["/v1/books/lookup"]["post"]["operationId"],
        "LibraryService_GetBook"
    );
    assert_eq!(doc["tags"], json!([{"name": "LibraryService"}]));
}

#[test]
fn later_binding_for_the_same_route_wins() {
    let mut set = DescriptorSet::default();
    set.add_message(MessageDesc::new("status.v1", "StatusRequest"));
    set.add_message(
        MessageDesc::new("status.v1", "Status").field(FieldDesc::new("ok", 1, FieldKind::Bool)),
    );
    let first = ServiceDesc::new("status.v1", "First").method(
        MethodDesc::new("Check", "status.v1.StatusRequest", "status.v1.Status")
            .rule(HttpRule::get("/v1/x")),
    );
    let second = ServiceDesc::new("status.v1", "Second").method(
        MethodDesc::new("Check", "status.v1.StatusRequest", "status.v1.Status")
            .rule(HttpRule::get("/v1/x")),
    );
    set.add_file(
        FileDesc::new("status/v1/status.proto", "status.v1")
            .message("status.v1.StatusRequest")
            .message("status.v1.Status")
            .service(first)
            .service(second),
    );

    let doc = generate_json(&Settings::default(), &set);
    assert_eq!(doc["paths"].as_object().unwrap().len(), 1);
    assert_eq!(doc["paths"]["/v1/x"]["get"]["operationId"], "Second_Check");
    assert_eq!(doc["paths"]["/v1/x"]["get"]["tags"], json!(["Second"]));
}
