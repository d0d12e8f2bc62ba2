// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Assembles a whole OpenAPI document from a set of files.
//!
//! Operations are added first; every message they reference is queued on the
//! schema worklist. [`DocumentAssembler::finish`] then drains the worklist,
//! writing component schemas until no new names show up, and applies the
//! document-wide post-processing.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::config::{Settings, OPENAPI_VERSION};
use crate::descriptor::{DescriptorSet, FileDesc, MessageDesc};
use crate::model::{Document, Schema, Server, Tag};
use crate::operation::build_operation;
use crate::reflector::{Reflector, SchemaWorklist};
use crate::wellknown::{self, ANY, STATUS, VALUE};

pub struct DocumentAssembler<'a> {
    reflector: Reflector<'a>,
    worklist: SchemaWorklist,
    document: Document,
}

impl<'a> DocumentAssembler<'a> {
    /// Starts from `base` when given; the generator options supply the info
    /// block either way.
    pub fn new(settings: &'a Settings, descriptors: &'a DescriptorSet, base: Option<&Document>) -> Self {
        let mut document = base.cloned().unwrap_or_default();
        if document.openapi.is_empty() {
            document.openapi = OPENAPI_VERSION.into();
        }
        document.info.title = settings.title.clone();
        document.info.version = settings.version.clone();
        if !settings.description.is_empty() {
            document.info.description = Some(settings.description.clone());
        }

        let mut worklist = SchemaWorklist::default();
        for name in document.components.schemas.keys() {
            worklist.mark_emitted(name);
        }
        Self {
            reflector: Reflector::new(settings, descriptors),
            worklist,
            document,
        }
    }

    pub fn add_file(&mut self, file: &FileDesc) {
        if let Some(annotation) = &file.document {
            annotation.merge_into(&mut self.document);
            for name in self.document.components.schemas.keys() {
                self.worklist.mark_emitted(name);
            }
        }

        let settings = self.reflector.settings();
        for service in &file.services {
            if !settings.includes_service(&service.full_name) {
                debug!("skipping service {}", service.full_name);
                continue;
            }
            let mut bound_any = false;
            for method in &service.methods {
                for rule in &method.http_rules {
                    let Some(bound) = build_operation(
                        &self.reflector,
                        service,
                        method,
                        rule,
                        &mut self.worklist,
                    ) else {
                        continue;
                    };
                    bound_any = true;
                    if settings.default_response {
                        self.register_builtin(STATUS);
                    }
                    let item = self.document.paths.entry(bound.path.clone()).or_default();
                    let slot = item.slot_mut(bound.method);
                    if slot.is_some() {
                        warn!(
                            "{} {} is bound more than once, keeping {}.{}",
                            bound.method.as_str(),
                            bound.path,
                            service.full_name,
                            method.name
                        );
                    }
                    *slot = Some(bound.operation);
                }
            }
            if bound_any && !self.document.tags.iter().any(|t| t.name == service.name) {
                self.document.tags.push(Tag {
                    name: service.name.clone(),
                    description: Some(service.description.clone()).filter(|d| !d.is_empty()),
                    ..Default::default()
                });
            }
        }
    }

    pub fn finish(mut self) -> Document {
        self.resolve_schemas();
        self.promote_single_tag();
        hoist_servers(&mut self.document);

        let document = &mut self.document;
        document.tags.sort_by(|a, b| a.name.cmp(&b.name));
        document.paths.sort_keys();
        document.components.schemas.sort_keys();
        self.document
    }

    fn resolve_schemas(&mut self) {
        let descriptors = self.reflector.descriptors();
        loop {
            let round: HashSet<String> = self.worklist.next_round().into_iter().collect();
            if round.is_empty() {
                break;
            }
            let mut found: Vec<&'a MessageDesc> = Vec::new();
            for file in descriptors.files() {
                descriptors.walk_messages(file, &mut |message| {
                    if round.contains(&self.reflector.message_name(message)) {
                        found.push(message);
                    }
                });
            }
            for message in found {
                self.emit_message(message);
            }
        }
        for name in self.worklist.unresolved() {
            warn!("no message found for referenced schema {name}");
        }
    }

    fn emit_message(&mut self, message: &MessageDesc) {
        let name = self.reflector.message_name(message);
        if self.worklist.is_emitted(&name) {
            return;
        }
        match message.full_name.as_str() {
            ANY | STATUS => self.register_builtin(&message.full_name),
            VALUE => self.insert_schema(name, wellknown::value_schema()),
            _ => {
                let schema = self.reflector.message_schema(message, &mut self.worklist);
                self.insert_schema(name, schema);
            }
        }
    }

    /// Writes the fixed `Any` or `Status` schema; `Status` pulls in `Any`.
    fn register_builtin(&mut self, full_name: &str) {
        let name = self.reflector.message_name_for(full_name);
        if self.worklist.is_emitted(&name) {
            return;
        }
        let schema = if full_name == STATUS {
            self.register_builtin(ANY);
            wellknown::status_schema(&self.reflector.message_name_for(ANY))
        } else {
            wellknown::any_schema()
        };
        self.insert_schema(name, schema);
    }

    fn insert_schema(&mut self, name: String, schema: Schema) {
        if self.worklist.mark_emitted(&name) {
            self.document
                .components
                .schemas
                .entry(name)
                .or_insert_with(|| schema.into());
        }
    }

    fn promote_single_tag(&mut self) {
        let document = &mut self.document;
        if document.tags.len() != 1 || !document.info.title.is_empty() {
            return;
        }
        let tag = &mut document.tags[0];
        document.info.title = format!("{} API", tag.name);
        let description = tag.description.take();
        if document.info.description.as_deref().unwrap_or_default().is_empty() {
            document.info.description = description;
        }
        info!("using service {} as the document title", tag.name);
    }
}

/// Moves servers shared by every operation of a path to the path, then
/// servers shared by every path to the document.
fn hoist_servers(document: &mut Document) {
    for item in document.paths.values_mut() {
        let Some(server) = single_shared(item.operations().map(|op| op.servers.as_slice())) else {
            continue;
        };
        for operation in item.operations_mut() {
            operation.servers.clear();
        }
        item.servers = vec![server];
    }

    let Some(server) = single_shared(document.paths.values().map(|item| item.servers.as_slice()))
    else {
        return;
    };
    for item in document.paths.values_mut() {
        item.servers.clear();
    }
    document.servers = vec![server];
}

/// The server when every list holds exactly that one server.
fn single_shared<'s>(mut lists: impl Iterator<Item = &'s [Server]>) -> Option<Server> {
    let first = match lists.next()? {
        [server] => server,
        _ => return None,
    };
    lists
        .all(|servers| servers.len() == 1 && servers[0] == *first)
        .then(|| first.clone())
}

/// Builds one document from `files`.
pub fn build_document(
    settings: &Settings,
    descriptors: &DescriptorSet,
    files: &[&FileDesc],
    base: Option<&Document>,
) -> Document {
    let mut assembler = DocumentAssembler::new(settings, descriptors, base);
    for file in files {
        assembler.add_file(file);
    }
    assembler.finish()
}
