// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors raised while resolving generator options.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("option `{0}` must not be empty")]
    Empty(&'static str),

    #[error("invalid value `{value}` for option `{option}`, expected one of: {expected}")]
    InvalidValue {
        option: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("option `depth` must be at least 1, got {0}")]
    InvalidDepth(i64),
}

/// Errors that abort a generation run.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to decode code generator request: {0}")]
    Request(#[from] prost::DecodeError),

    #[error("failed to build descriptor pool: {0}")]
    Descriptor(#[from] prost_reflect::DescriptorError),

    #[error("malformed base document: {0}")]
    BaseDocument(#[source] serde_yaml::Error),

    #[error("failed to render document as yaml: {0}")]
    RenderYaml(#[source] serde_yaml::Error),

    #[error("failed to render document as json: {0}")]
    RenderJson(#[source] serde_json::Error),
}

pub type Result<T, E = GenerateError> = std::result::Result<T, E>;
