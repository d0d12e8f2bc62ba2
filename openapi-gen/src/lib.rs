// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Generates OpenAPI v3 documents from protobuf service descriptors and their
//! `google.api.http` bindings.

pub use config::{Configuration, EnumType, Naming, OutputFormat, OutputMode, Settings};
pub use document::{build_document, DocumentAssembler};
pub use error::{ConfigError, GenerateError, Result};
pub use output::{base_configuration, generate, parse_base_document, render, OutputFile};
pub use source::{load_descriptors, PluginRequest, RawCodeGeneratorRequest};

pub mod annotations;
pub mod config;
pub mod descriptor;
pub mod document;
pub mod model;
pub mod naming;
pub mod operation;
pub mod paths;
pub mod reflector;
pub mod source;
pub mod wellknown;

mod error;
mod output;
