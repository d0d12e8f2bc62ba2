// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Output units, rendering and the base document.

use tracing::info;

use crate::config::{Configuration, OutputFormat, OutputMode, Settings};
use crate::descriptor::{DescriptorSet, FileDesc};
use crate::document::build_document;
use crate::error::{GenerateError, Result};
use crate::model::Document;

const YAML_HEADER: &str = "# Generated with protoc-gen-openapi\n";
const MERGED_STEM: &str = "openapi";

/// A rendered document and the file name it is written to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputFile {
    pub name: String,
    pub content: String,
}

/// Generates every output document for the files marked for generation.
pub fn generate(
    settings: &Settings,
    descriptors: &DescriptorSet,
    base: Option<&Document>,
) -> Result<Vec<OutputFile>> {
    let files: Vec<&FileDesc> = descriptors.files().iter().filter(|f| f.generate).collect();
    let units: Vec<(String, Vec<&FileDesc>)> = match settings.output_mode {
        OutputMode::Merged => vec![(MERGED_STEM.to_string(), files)],
        OutputMode::SourceRelative => files
            .into_iter()
            .map(|file| (source_relative_stem(&file.name), vec![file]))
            .collect(),
    };

    let mut outputs = Vec::with_capacity(units.len());
    for (stem, files) in units {
        let document = build_document(settings, descriptors, &files, base);
        info!(
            "{stem}: {} paths, {} schemas",
            document.paths.len(),
            document.components.schemas.len()
        );
        outputs.push(OutputFile {
            name: format!("{stem}.{}", settings.format.extension()),
            content: render(&document, settings.format)?,
        });
    }
    Ok(outputs)
}

/// `library/v1/library.proto` becomes `library/v1/library.openapi`.
fn source_relative_stem(proto_name: &str) -> String {
    let stem = proto_name.strip_suffix(".proto").unwrap_or(proto_name);
    format!("{stem}.{MERGED_STEM}")
}

pub fn render(document: &Document, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => {
            let body = serde_yaml::to_string(document).map_err(GenerateError::RenderYaml)?;
            Ok(format!("{YAML_HEADER}{body}"))
        }
        OutputFormat::Json => {
            let mut body =
                serde_json::to_string_pretty(document).map_err(GenerateError::RenderJson)?;
            body.push('\n');
            Ok(body)
        }
    }
}

/// Parses a YAML or JSON OpenAPI document used to seed the output.
pub fn parse_base_document(text: &str) -> Result<Document> {
    serde_yaml::from_str(text).map_err(GenerateError::BaseDocument)
}

/// The `info` values of a base document as a configuration layer.
pub fn base_configuration(document: &Document) -> Configuration {
    let non_empty = |value: &str| Some(value.to_string()).filter(|v| !v.is_empty());
    Configuration {
        version: non_empty(&document.info.version),
        title: non_empty(&document.info.title),
        description: document.info.description.as_deref().and_then(non_empty),
        ..Default::default()
    }
}
