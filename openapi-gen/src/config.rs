// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Generator options.
//!
//! [`Configuration`] is the layered, partially-populated form read from the
//! plugin parameter, the environment and config files. Every option is
//! optional so layers can be combined with [`Configuration::merge`]; the
//! result is checked once by [`Configuration::validate`], which produces the
//! fully resolved [`Settings`] the generator works with.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// OpenAPI version written to every generated document.
pub const OPENAPI_VERSION: &str = "3.0.3";

pub const DEFAULT_VERSION: &str = "1.0.0";
pub const DEFAULT_TITLE: &str = "API";
pub const DEFAULT_DESCRIPTION: &str = "Generated API";
pub const DEFAULT_CIRCULAR_DEPTH: i64 = 2;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `proto` or `json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub naming: Option<String>,
    #[serde(alias = "fqSchemaNaming", skip_serializing_if = "Option::is_none")]
    pub fq_schema_naming: Option<bool>,
    /// `string` or `integer`.
    #[serde(alias = "enumType", skip_serializing_if = "Option::is_none")]
    pub enum_type: Option<String>,
    /// Maximum recursion depth when expanding message fields into query parameters.
    #[serde(
        alias = "circular_depth",
        alias = "circularDepth",
        skip_serializing_if = "Option::is_none"
    )]
    pub depth: Option<i64>,
    #[serde(alias = "defaultResponse", skip_serializing_if = "Option::is_none")]
    pub default_response: Option<bool>,
    /// `merged` or `source_relative`.
    #[serde(alias = "outputMode", skip_serializing_if = "Option::is_none")]
    pub output_mode: Option<String>,
    /// `yaml` or `json`.
    #[serde(alias = "outputFormat", skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Fully qualified service names to include, separated by `;`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,
    /// Path of a base document the output is seeded from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

impl Configuration {
    /// The documented default for every option that has one.
    pub fn defaults() -> Self {
        Self {
            version: Some(DEFAULT_VERSION.into()),
            title: Some(DEFAULT_TITLE.into()),
            description: Some(DEFAULT_DESCRIPTION.into()),
            naming: Some(Naming::Proto.as_str().into()),
            fq_schema_naming: Some(false),
            enum_type: Some(EnumType::String.as_str().into()),
            depth: Some(DEFAULT_CIRCULAR_DEPTH),
            default_response: Some(true),
            output_mode: Some(OutputMode::Merged.as_str().into()),
            format: Some(OutputFormat::Yaml.as_str().into()),
            services: None,
            base: None,
        }
    }

    /// Layers `other` on top of `self`: a value set in `other` wins.
    pub fn merge(self, other: Configuration) -> Configuration {
        Configuration {
            version: other.version.or(self.version),
            title: other.title.or(self.title),
            description: other.description.or(self.description),
            naming: other.naming.or(self.naming),
            fq_schema_naming: other.fq_schema_naming.or(self.fq_schema_naming),
            enum_type: other.enum_type.or(self.enum_type),
            depth: other.depth.or(self.depth),
            default_response: other.default_response.or(self.default_response),
            output_mode: other.output_mode.or(self.output_mode),
            format: other.format.or(self.format),
            services: other.services.or(self.services),
            base: other.base.or(self.base),
        }
    }

    /// Resolves unset options to their defaults and checks every value.
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let resolved = Configuration::defaults().merge(self.clone());

        let version = resolved.version.unwrap_or_default();
        if version.trim().is_empty() {
            return Err(ConfigError::Empty("version"));
        }
        let depth = resolved.depth.unwrap_or(DEFAULT_CIRCULAR_DEPTH);
        if depth < 1 {
            return Err(ConfigError::InvalidDepth(depth));
        }
        let circular_depth = usize::try_from(depth).map_err(|_| ConfigError::InvalidDepth(depth))?;

        Ok(Settings {
            version,
            title: resolved.title.unwrap_or_default(),
            description: resolved.description.unwrap_or_default(),
            naming: parse_option(resolved.naming.as_deref())?,
            fq_schema_naming: resolved.fq_schema_naming.unwrap_or(false),
            enum_type: parse_option(resolved.enum_type.as_deref())?,
            circular_depth,
            default_response: resolved.default_response.unwrap_or(true),
            output_mode: parse_option(resolved.output_mode.as_deref())?,
            format: parse_option(resolved.format.as_deref())?,
            services: resolved
                .services
                .as_deref()
                .map(split_services)
                .unwrap_or_default(),
        })
    }
}

fn parse_option<T>(value: Option<&str>) -> Result<T, ConfigError>
where
    T: FromStr<Err = ConfigError> + Default,
{
    match value {
        Some(value) => value.parse(),
        None => Ok(T::default()),
    }
}

fn split_services(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(|s| s.trim().trim_start_matches('.'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fully resolved generator options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub version: String,
    pub title: String,
    pub description: String,
    pub naming: Naming,
    pub fq_schema_naming: bool,
    pub enum_type: EnumType,
    pub circular_depth: usize,
    pub default_response: bool,
    pub output_mode: OutputMode,
    pub format: OutputFormat,
    pub services: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.into(),
            title: DEFAULT_TITLE.into(),
            description: DEFAULT_DESCRIPTION.into(),
            naming: Naming::Proto,
            fq_schema_naming: false,
            enum_type: EnumType::String,
            circular_depth: DEFAULT_CIRCULAR_DEPTH as usize,
            default_response: true,
            output_mode: OutputMode::Merged,
            format: OutputFormat::Yaml,
            services: Vec::new(),
        }
    }
}

impl Settings {
    /// Whether services with the given full name end up in the output.
    pub fn includes_service(&self, full_name: &str) -> bool {
        self.services.is_empty() || self.services.iter().any(|s| s == full_name)
    }
}

/// How schema and property names are derived from protobuf names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Naming {
    /// Declared protobuf names, verbatim.
    #[default]
    Proto,
    /// JSON names for fields, capitalised names for schemas.
    Json,
}

impl FromStr for Naming {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "proto" => Naming::Proto,
            "json" => Naming::Json,
            _ => {
                return Err(ConfigError::InvalidValue {
                    option: "naming",
                    value: s.into(),
                    expected: "proto, json",
                })
            }
        })
    }
}

impl Naming {
    pub fn as_str(&self) -> &'static str {
        match self {
            Naming::Proto => "proto",
            Naming::Json => "json",
        }
    }
}

/// How enum values are rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnumType {
    #[default]
    String,
    Integer,
}

impl FromStr for EnumType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "string" => EnumType::String,
            "integer" => EnumType::Integer,
            _ => {
                return Err(ConfigError::InvalidValue {
                    option: "enum_type",
                    value: s.into(),
                    expected: "string, integer",
                })
            }
        })
    }
}

impl EnumType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnumType::String => "string",
            EnumType::Integer => "integer",
        }
    }
}

/// Whether one document covers all inputs or each input file gets its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    Merged,
    SourceRelative,
}

impl FromStr for OutputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "merged" => OutputMode::Merged,
            "source_relative" => OutputMode::SourceRelative,
            _ => {
                return Err(ConfigError::InvalidValue {
                    option: "output_mode",
                    value: s.into(),
                    expected: "merged, source_relative",
                })
            }
        })
    }
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Merged => "merged",
            OutputMode::SourceRelative => "source_relative",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "yaml" | "yml" => OutputFormat::Yaml,
            "json" => OutputFormat::Json,
            _ => {
                return Err(ConfigError::InvalidValue {
                    option: "format",
                    value: s.into(),
                    expected: "yaml, json",
                })
            }
        })
    }
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Yaml => "yaml",
            OutputFormat::Json => "json",
        }
    }

    /// File extension used for generated documents.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}
