// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Hand-written schemas for protobuf well-known types.
//!
//! These types have a JSON mapping that differs from their message layout
//! (a `Timestamp` is an RFC 3339 string, an `Int64Value` is a quoted number,
//! ...), so they bypass generic message reflection.

use indexmap::IndexMap;

use crate::model::{AdditionalProperties, MediaType, Schema, SchemaOrReference};

pub const ANY: &str = "google.protobuf.Any";
pub const VALUE: &str = "google.protobuf.Value";
pub const EMPTY: &str = "google.protobuf.Empty";
pub const STATUS: &str = "google.rpc.Status";
pub const HTTP_BODY: &str = "google.api.HttpBody";

const TIMESTAMP: &str = "google.protobuf.Timestamp";
const DURATION: &str = "google.protobuf.Duration";
const FIELD_MASK: &str = "google.protobuf.FieldMask";
const DATE: &str = "google.type.Date";
const DATE_TIME: &str = "google.type.DateTime";

const DURATION_PATTERN: &str = r"^-?(?:0|[1-9][0-9]{0,11})(?:\.[0-9]{1,9})?s$";

/// Outcome of a catalog lookup for a by-value well-known type.
#[derive(Clone, Debug, PartialEq)]
pub enum WellKnown {
    /// Inline this schema in place of the message.
    Inline(Schema),
    /// The type has no JSON representation; drop the field.
    Omit,
}

/// Inline schema for the by-value well-known types, `None` for everything else.
pub fn schema_for_well_known_type(full_name: &str) -> Option<WellKnown> {
    let schema = match full_name {
        HTTP_BODY => Schema::string(),
        TIMESTAMP => Schema::string().with_format("date-time"),
        DURATION => Schema {
            pattern: Some(DURATION_PATTERN.into()),
            ..Schema::string()
        },
        DATE => Schema::string().with_format("date"),
        DATE_TIME => Schema::string().with_format("date-time"),
        FIELD_MASK => Schema::string().with_format("field-mask"),
        "google.protobuf.Struct" => Schema::typed("object"),
        EMPTY => return Some(WellKnown::Omit),
        "google.protobuf.BoolValue" => Schema::typed("boolean"),
        "google.protobuf.BytesValue" => Schema::string().with_format("bytes"),
        "google.protobuf.Int32Value" => Schema::typed("integer").with_format("int32"),
        "google.protobuf.UInt32Value" => Schema::typed("integer").with_format("uint32"),
        "google.protobuf.StringValue"
        | "google.protobuf.Int64Value"
        | "google.protobuf.UInt64Value" => Schema::string(),
        "google.protobuf.FloatValue" => Schema::typed("number").with_format("float"),
        "google.protobuf.DoubleValue" => Schema::typed("number").with_format("double"),
        _ => return None,
    };
    Some(WellKnown::Inline(schema))
}

/// Message types that stay a single query parameter instead of being
/// expanded field by field.
pub fn is_query_leaf(full_name: &str) -> bool {
    matches!(
        full_name,
        VALUE
            | TIMESTAMP
            | DURATION
            | FIELD_MASK
            | DATE
            | DATE_TIME
            | "google.protobuf.BoolValue"
            | "google.protobuf.BytesValue"
            | "google.protobuf.Int32Value"
            | "google.protobuf.UInt32Value"
            | "google.protobuf.StringValue"
            | "google.protobuf.Int64Value"
            | "google.protobuf.UInt64Value"
            | "google.protobuf.FloatValue"
            | "google.protobuf.DoubleValue"
    )
}

/// Component schema for `google.protobuf.Value`.
pub fn value_schema() -> Schema {
    Schema::default().with_description(
        "Represents a dynamically typed value which can be either null, a number, a string, \
         a boolean, a recursive struct value, or a list of values.",
    )
}

/// Component schema for `google.protobuf.Any`.
pub fn any_schema() -> Schema {
    let mut properties = IndexMap::new();
    properties.insert(
        "@type".to_string(),
        Schema::string()
            .with_description("The type of the serialized message.")
            .into(),
    );
    Schema {
        properties,
        additional_properties: Some(AdditionalProperties::Bool(true)),
        ..Schema::typed("object").with_description(
            "Contains an arbitrary serialized message along with a @type that describes the \
             type of the serialized message.",
        )
    }
}

/// Component schema for `google.rpc.Status`; `any_name` is the component
/// name the `details` items point at.
pub fn status_schema(any_name: &str) -> Schema {
    let mut properties = IndexMap::new();
    properties.insert(
        "code".to_string(),
        Schema::typed("integer")
            .with_format("int32")
            .with_description(
                "The status code, which should be an enum value of [google.rpc.Code][google.rpc.Code].",
            )
            .into(),
    );
    properties.insert(
        "message".to_string(),
        Schema::string()
            .with_description(
                "A developer-facing error message, which should be in English. Any user-facing \
                 error message should be localized and sent in the \
                 [google.rpc.Status.details][google.rpc.Status.details] field, or localized by \
                 the client.",
            )
            .into(),
    );
    properties.insert(
        "details".to_string(),
        Schema::array(SchemaOrReference::component(any_name))
            .with_description(
                "A list of messages that carry the error details.  There is a common set of \
                 message types for APIs to use.",
            )
            .into(),
    );
    Schema {
        properties,
        ..Schema::typed("object").with_description(
            "The `Status` type defines a logical error model that is suitable for different \
             programming environments, including REST APIs and RPC APIs. It is used by \
             [gRPC](https://github.com/grpc). Each `Status` message contains three pieces of \
             data: error code, error message, and error details. You can find out more about \
             this error model and how to work with it in the \
             [API Design Guide](https://cloud.google.com/apis/design/errors).",
        )
    }
}

/// `{type: object, additionalProperties: <value>}` for map fields.
pub fn map_schema(value: Option<SchemaOrReference>) -> Schema {
    Schema {
        additional_properties: value.map(|v| AdditionalProperties::Schema(Box::new(v))),
        ..Schema::typed("object")
    }
}

/// Raw-body response content for `google.api.HttpBody` outputs.
pub fn http_body_content() -> IndexMap<String, MediaType> {
    let mut content = IndexMap::new();
    content.insert("*/*".to_string(), MediaType::with_schema(Schema::string()));
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inline(full_name: &str) -> serde_json::Value {
        match schema_for_well_known_type(full_name) {
            Some(WellKnown::Inline(schema)) => serde_json::to_value(schema).unwrap(),
            other => panic!("{full_name}: {other:?}"),
        }
    }

    #[test]
    fn by_value_types_are_inlined() {
        assert_eq!(
            inline("google.protobuf.Timestamp"),
            json!({"type": "string", "format": "date-time"})
        );
        assert_eq!(inline("google.type.Date"), json!({"type": "string", "format": "date"}));
        assert_eq!(
            inline("google.protobuf.FieldMask"),
            json!({"type": "string", "format": "field-mask"})
        );
        assert_eq!(inline("google.protobuf.Int64Value"), json!({"type": "string"}));
        assert_eq!(
            inline("google.protobuf.UInt32Value"),
            json!({"type": "integer", "format": "uint32"})
        );
        assert_eq!(
            inline("google.protobuf.BytesValue"),
            json!({"type": "string", "format": "bytes"})
        );
        assert_eq!(inline("google.protobuf.Struct"), json!({"type": "object"}));
        assert_eq!(inline("google.api.HttpBody"), json!({"type": "string"}));
        assert_eq!(
            inline("google.protobuf.Duration"),
            json!({"type": "string", "pattern": DURATION_PATTERN})
        );
    }

    #[test]
    fn empty_is_omitted_and_others_fall_through() {
        assert_eq!(schema_for_well_known_type(EMPTY), Some(WellKnown::Omit));
        assert_eq!(schema_for_well_known_type(ANY), None);
        assert_eq!(schema_for_well_known_type(STATUS), None);
        assert_eq!(schema_for_well_known_type("library.v1.Book"), None);
    }

    #[test]
    fn status_points_details_at_any() {
        let status = serde_json::to_value(status_schema("GoogleProtobufAny")).unwrap();
        assert_eq!(status["properties"]["code"]["format"], "int32");
        assert_eq!(
            status["properties"]["details"]["items"],
            json!({"$ref": "#/components/schemas/GoogleProtobufAny"})
        );
        let any = serde_json::to_value(any_schema()).unwrap();
        assert_eq!(any["additionalProperties"], json!(true));
        assert_eq!(any["properties"]["@type"]["type"], "string");
    }

    #[test]
    fn query_leaves() {
        assert!(is_query_leaf("google.protobuf.Timestamp"));
        assert!(is_query_leaf(VALUE));
        assert!(!is_query_leaf("google.protobuf.Struct"));
        assert!(!is_query_leaf("library.v1.Book"));
    }
}
