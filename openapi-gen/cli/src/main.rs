// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use openapi_gen::{generate, OutputFile, PluginRequest};
use prost::Message;
use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::CodeGeneratorResponse;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::PluginOptions;

mod config;

/// protoc plugin generating OpenAPI v3 documents from `google.api.http`
/// annotated services. Reads a CodeGeneratorRequest on stdin.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML file with generator options
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut request = Vec::new();
    std::io::stdin()
        .read_to_end(&mut request)
        .context("Failed to read request from stdin")?;

    let mut response = CodeGeneratorResponse {
        supported_features: Some(Feature::Proto3Optional as u64),
        ..Default::default()
    };
    match run(&cli, &request) {
        Ok(outputs) => {
            info!("generated {} document(s)", outputs.len());
            response.file = outputs
                .into_iter()
                .map(|output| File {
                    name: Some(output.name),
                    content: Some(output.content),
                    ..Default::default()
                })
                .collect();
        }
        Err(err) => {
            error!("{err:?}");
            response.error = Some(format!("{err:#}"));
        }
    }

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&response.encode_to_vec())
        .context("Failed to write response to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}

fn run(cli: &Cli, request: &[u8]) -> Result<Vec<OutputFile>> {
    let request = PluginRequest::decode(request).context("Failed to decode plugin request")?;
    let options = PluginOptions::load(cli.config.as_deref(), &request.parameter)?;
    let outputs = generate(&options.settings, &request.descriptors, options.base.as_ref())
        .context("Failed to generate OpenAPI documents")?;
    Ok(outputs)
}
