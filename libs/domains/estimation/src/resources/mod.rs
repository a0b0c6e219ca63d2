//! Resource cost models and the sibling index they read from.

pub mod gcp;

use std::collections::HashMap;

use crate::attributes::AttributeExt;
use crate::config::{ResourceKind, Resource};
use crate::cost::CostModel;
use crate::error::{EstimateError, EstimateResult};

/// Constructs a cost model from a resolved resource
pub trait FromResource: Sized {
    fn from_resource(name: &str, resource: &Resource, index: &ResourceIndex) -> EstimateResult<Self>;
}

/// Read-only map of every resource in the tree, keyed by identifier
#[derive(Debug, Default)]
pub struct ResourceIndex {
    by_id: HashMap<String, Resource>,
}

impl ResourceIndex {
    pub fn new<'a>(resources: impl IntoIterator<Item = &'a Resource>) -> Self {
        Self {
            by_id: resources
                .into_iter()
                .map(|r| (r.identifier.clone(), r.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, identifier: &str) -> Option<&Resource> {
        self.by_id.get(identifier)
    }

    /// Resolve a reference written in `from`'s attributes.
    ///
    /// Accepts a full identifier, or an address such as
    /// `${google_compute_image.base.self_link}` / `data.google_compute_image.x.id`
    /// which is matched by kind, type and name, preferring `from`'s own module.
    pub fn referenced(&self, from: &Resource, reference: &str) -> Option<&Resource> {
        if let Some(found) = self.get(reference) {
            return Some(found);
        }

        let address = reference
            .trim()
            .strip_prefix("${")
            .and_then(|r| r.strip_suffix('}'))
            .unwrap_or(reference.trim());
        let mut parts = address.split('.');
        let (kind, resource_type) = match parts.next()? {
            "data" => (ResourceKind::Data, parts.next()?),
            t => (ResourceKind::Resource, t),
        };
        let name = parts.next()?;

        let suffix = format!(".{kind}.{resource_type}.{name}");
        let local = format!("{}{}", module_of(from), suffix);
        if let Some(found) = self.get(&local) {
            return Some(found);
        }

        let mut candidates: Vec<&Resource> = self
            .by_id
            .values()
            .filter(|r| r.identifier.ends_with(&suffix))
            .collect();
        candidates.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        candidates.into_iter().next()
    }

    /// Resources of `resource_type` whose `key` attribute equals `value`,
    /// ordered by identifier
    pub fn with_attribute(&self, resource_type: &str, key: &str, value: &str) -> Vec<&Resource> {
        let mut found: Vec<&Resource> = self
            .by_id
            .values()
            .filter(|r| r.resource_type == resource_type && r.attributes.str_attr(key) == Some(value))
            .collect();
        found.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        found
    }

    /// Follow the string attribute `key` of `from` to the resource it names
    pub fn follow(&self, from: &Resource, key: &str) -> Option<&Resource> {
        let reference = from.attributes.str_attr(key)?;
        self.referenced(from, reference)
    }
}

/// Identifier of the module that declares `resource`
pub fn module_of(resource: &Resource) -> &str {
    let suffix_len = resource.kind.to_string().len()
        + resource.resource_type.len()
        + resource.name.len()
        + 3;
    let id = &resource.identifier;
    if id.len() > suffix_len {
        &id[..id.len() - suffix_len]
    } else {
        ""
    }
}

/// Box a model built by `M::from_resource`; used as a registry factory
pub fn factory<M>(name: &str, resource: &Resource, index: &ResourceIndex) -> EstimateResult<Box<dyn CostModel>>
where
    M: FromResource + CostModel + 'static,
{
    Ok(Box::new(M::from_resource(name, resource, index)?))
}

/// A string attribute the model cannot work without
pub(crate) fn required_str(resource: &Resource, key: &str) -> EstimateResult<String> {
    resource
        .attributes
        .string_attr(key)
        .ok_or_else(|| EstimateError::invalid_resource(&resource.identifier, format!("missing '{key}'")))
}
