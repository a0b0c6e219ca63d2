//! Variable resolution: turns a raw [`Module`] tree into a [`ResolvedModule`].

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::ops::Deref;
use tracing::{debug, instrument};

use crate::attributes::AttributeSet;
use crate::config::expr;
use crate::config::tree::{Module, Resource};
use crate::error::{EstimateError, EstimateResult};

static INTERPOLATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid interpolation regex"));

static VARIABLE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"var\.([A-Za-z_][A-Za-z0-9_]*)").expect("valid variable regex"));

/// Effective variable values of one module
pub type Environment = Map<String, Value>;

/// A module tree whose attributes have been interpolated exactly once
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct ResolvedModule(Module);

impl Deref for ResolvedModule {
    type Target = Module;

    fn deref(&self) -> &Module {
        &self.0
    }
}

impl Module {
    /// Declared defaults overlaid with caller-supplied inputs.
    ///
    /// Fails when a declared variable ends up with no value.
    pub fn environment(&self) -> EstimateResult<Environment> {
        let mut env = Environment::new();
        for (name, default) in &self.variables {
            if let Some(value) = default {
                env.insert(name.clone(), value.clone());
            }
        }
        for (name, value) in &self.inputs {
            env.insert(name.clone(), value.clone());
        }

        if let Some(missing) = self.variables.keys().find(|name| !env.contains_key(*name)) {
            return Err(EstimateError::UnresolvedVariable {
                module: self.identifier.clone(),
                variable: missing.clone(),
            });
        }

        Ok(env)
    }

    /// Resolve this module and its subtree.
    ///
    /// Children build their environment from their own defaults and their
    /// raw inputs; inputs are not re-resolved against this module's values.
    #[instrument(skip(self), fields(module = %self.identifier))]
    pub fn resolve(self) -> EstimateResult<ResolvedModule> {
        resolve_module(self).map(ResolvedModule)
    }
}

fn resolve_module(module: Module) -> EstimateResult<Module> {
    let env = module.environment()?;
    let interpolator = Interpolator::new(&env);

    let Module {
        name,
        identifier,
        source,
        attributes,
        variables,
        inputs,
        resources,
        modules,
        opaque,
    } = module;

    let attributes = interpolator.rewrite_set(attributes);
    let resources = resources
        .into_iter()
        .map(|resource| Resource {
            attributes: interpolator.rewrite_set(resource.attributes),
            ..resource
        })
        .collect();
    let modules = modules
        .into_iter()
        .map(resolve_module)
        .collect::<EstimateResult<Vec<_>>>()?;

    debug!(module = %identifier, variables = env.len(), "Module resolved");

    Ok(Module {
        name,
        identifier,
        source,
        attributes,
        variables,
        inputs,
        resources,
        modules,
        opaque,
    })
}

/// Rewrites `${...}` markers inside attribute values
pub struct Interpolator<'a> {
    env: &'a Environment,
}

impl<'a> Interpolator<'a> {
    pub fn new(env: &'a Environment) -> Self {
        Self { env }
    }

    pub fn rewrite_set(&self, set: AttributeSet) -> AttributeSet {
        set.into_iter()
            .map(|(key, value)| (key, self.rewrite(value)))
            .collect()
    }

    pub fn rewrite(&self, value: Value) -> Value {
        match value {
            Value::String(text) => self.rewrite_str(&text),
            Value::Array(items) => Value::Array(items.into_iter().map(|v| self.rewrite(v)).collect()),
            Value::Object(map) => Value::Object(self.rewrite_set(map)),
            scalar => scalar,
        }
    }

    /// Rewrite one string.
    ///
    /// A string that is a single interpolation may change type: a bare
    /// `${var.x}` takes the variable's value as is, and a numeric result
    /// becomes a number.
    pub fn rewrite_str(&self, text: &str) -> Value {
        if let Some(whole) = single_interpolation(text) {
            if let Some(value) = self.bare_variable(whole) {
                return value.clone();
            }
            return match self.expand(whole) {
                Expansion::Number(n) => number_value(n),
                Expansion::Text(t) => Value::String(t),
                Expansion::Untouched => Value::String(text.to_string()),
            };
        }

        let rewritten = INTERPOLATION.replace_all(text, |caps: &Captures| {
            match self.expand(&caps[1]) {
                Expansion::Number(n) => n.to_string(),
                Expansion::Text(t) => t,
                Expansion::Untouched => caps[0].to_string(),
            }
        });
        Value::String(rewritten.into_owned())
    }

    fn bare_variable(&self, expression: &str) -> Option<&Value> {
        let name = expression.trim().strip_prefix("var.")?;
        let caps = VARIABLE_REF.captures(expression.trim())?;
        if caps[0].len() != expression.trim().len() {
            return None;
        }
        self.env.get(name)
    }

    fn expand(&self, expression: &str) -> Expansion {
        let mut substituted = false;
        let text = VARIABLE_REF.replace_all(expression, |caps: &Captures| {
            match self.env.get(&caps[1]) {
                Some(value) => {
                    substituted = true;
                    render(value)
                }
                None => caps[0].to_string(),
            }
        });

        match expr::evaluate(&text) {
            Ok(n) => Expansion::Number(n),
            Err(e) if substituted => {
                debug!(expression = %text, error = %e, "Expression kept as text");
                Expansion::Text(text.into_owned())
            }
            Err(_) => Expansion::Untouched,
        }
    }
}

enum Expansion {
    Number(f64),
    Text(String),
    /// No known reference and not arithmetic
    Untouched,
}

fn single_interpolation(text: &str) -> Option<&str> {
    let caps = INTERPOLATION.captures(text)?;
    let whole = caps.get(0)?;
    if whole.start() == 0 && whole.end() == text.len() {
        caps.get(1).map(|m| m.as_str())
    } else {
        None
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}
