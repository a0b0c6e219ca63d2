//! Typed declarations extracted from one parsed configuration file.

use serde::Serialize;
use serde_json::Value;
use strum::{Display, EnumString};

use crate::attributes::{AttributeSet, unwrap_block};

/// Kind of a resource-like block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResourceKind {
    Resource,
    Data,
}

/// One declaration found in a file
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Module {
        name: String,
        body: AttributeSet,
    },
    Resource {
        kind: ResourceKind,
        resource_type: String,
        name: String,
        body: AttributeSet,
    },
    Variable {
        name: String,
        default: Option<Value>,
    },
    /// Anything this engine does not interpret (provider, output, locals...)
    Other {
        kind: String,
        name: String,
        body: Value,
    },
}

/// Extract every block from a parsed document.
///
/// Returns `None` when the document is not a mapping at the top level.
/// Labelled collections may be mappings (`{"name": {...}}`) or sequences of
/// such mappings; both are flattened in declaration order.
pub fn extract_blocks(document: &Value) -> Option<Vec<Block>> {
    let top = document.as_object()?;
    let mut blocks = Vec::new();

    for (kind, collection) in top {
        match kind.as_str() {
            "module" => {
                for (name, payload) in labelled(collection) {
                    if let Some(body) = unwrap_block(payload) {
                        blocks.push(Block::Module {
                            name: name.clone(),
                            body: body.clone(),
                        });
                    }
                }
            }
            "resource" | "data" => {
                let kind = if kind == "data" {
                    ResourceKind::Data
                } else {
                    ResourceKind::Resource
                };
                for (resource_type, instances) in labelled(collection) {
                    for (name, payload) in labelled(instances) {
                        if let Some(body) = unwrap_block(payload) {
                            blocks.push(Block::Resource {
                                kind,
                                resource_type: resource_type.clone(),
                                name: name.clone(),
                                body: body.clone(),
                            });
                        }
                    }
                }
            }
            "variable" => {
                for (name, payload) in labelled(collection) {
                    let default = unwrap_block(payload).and_then(|b| b.get("default").cloned());
                    blocks.push(Block::Variable {
                        name: name.clone(),
                        default,
                    });
                }
            }
            _ => match collection {
                Value::Object(_) | Value::Array(_) => {
                    for (name, payload) in labelled(collection) {
                        blocks.push(Block::Other {
                            kind: kind.clone(),
                            name: name.clone(),
                            body: payload.clone(),
                        });
                    }
                }
                scalar => blocks.push(Block::Other {
                    kind: kind.clone(),
                    name: kind.clone(),
                    body: scalar.clone(),
                }),
            },
        }
    }

    Some(blocks)
}

/// Entries of a labelled collection, whichever shape it arrived in
fn labelled(collection: &Value) -> Vec<(&String, &Value)> {
    match collection {
        Value::Object(map) => map.iter().collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_object)
            .flat_map(|map| map.iter())
            .collect(),
        _ => Vec::new(),
    }
}
