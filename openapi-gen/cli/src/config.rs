// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    value::{Dict, Value},
    Figment,
};
use fs_err as fs;
use openapi_gen::model::Document;
use openapi_gen::{base_configuration, parse_base_document, Configuration, Settings};
use tracing::debug;

pub const DEFAULT_CONFIG: &str = include_str!("../protoc-gen-openapi.toml");
pub const ENV_PREFIX: &str = "PROTOC_GEN_OPENAPI_";

/// Keys whose values are parsed as booleans or numbers; every other value
/// stays a string.
const TYPED_KEYS: &[&str] = &["depth", "circular_depth", "fq_schema_naming", "default_response"];

/// Fully resolved options for one plugin run.
pub struct PluginOptions {
    pub settings: Settings,
    pub base: Option<Document>,
}

impl PluginOptions {
    /// Layers the built-in defaults, the base document's `info`, the config
    /// file, the environment and the compiler parameter, in that order.
    pub fn load(config_file: Option<&Path>, parameter: &str) -> Result<Self> {
        let defaults: Configuration = Figment::from(Toml::string(DEFAULT_CONFIG))
            .extract()
            .context("Failed to parse built-in defaults")?;
        let user: Configuration = user_figment(config_file, parameter)?
            .extract()
            .context("Failed to load configuration")?;

        let base = match user.base.as_deref() {
            Some(path) => {
                let text = fs::read_to_string(path).context("Failed to read base document")?;
                Some(parse_base_document(&text)?)
            }
            None => None,
        };
        let mut configuration = defaults;
        if let Some(base) = &base {
            configuration = configuration.merge(base_configuration(base));
        }
        let settings = configuration.merge(user).validate()?;
        debug!("resolved settings: {settings:?}");
        Ok(Self { settings, base })
    }
}

/// The user-controlled layers. A `config=` entry in the parameter takes the
/// place of `--config`.
pub fn user_figment(config_file: Option<&Path>, parameter: &str) -> Result<Figment> {
    let parameters = parse_parameter(parameter);
    let config_file = match parameters.get("config").and_then(Value::as_str) {
        Some(path) => Some(Path::new(path).to_path_buf()),
        None => config_file.map(Path::to_path_buf),
    };

    let mut figment = Figment::new();
    if let Some(path) = config_file {
        let text = fs::read_to_string(&path).context("Failed to read config file")?;
        figment = figment.merge(Toml::string(&text));
    }
    Ok(figment
        .merge(Env::prefixed(ENV_PREFIX))
        .merge(Serialized::globals(parameters)))
}

/// Parses `key=value,key=value`. Keys may be given in camelCase.
pub fn parse_parameter(parameter: &str) -> Dict {
    let mut dict = Dict::new();
    for entry in parameter.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (key, raw) = entry.split_once('=').unwrap_or((entry, "true"));
        let key = snake_case(key.trim());
        let raw = raw.trim();
        let value = if TYPED_KEYS.contains(&key.as_str()) {
            raw.parse().unwrap_or_else(|_| Value::from(raw.to_string()))
        } else {
            Value::from(raw.to_string())
        };
        dict.insert(key, value);
    }
    dict
}

fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
