//! Environment configuration resolution.
//!
//! Deploy settings live in a single YAML document keyed by environment
//! name. Each environment is a flat mapping of variable names to scalar
//! values plus one reserved `FUNCTION` block holding the function
//! settings. The resolver loads exactly one environment per process
//! invocation; the result is immutable for the duration of the deploy.

use std::collections::BTreeMap;
use std::path::Path;

use figment::providers::{Format, Yaml};
use figment::Figment;
use serde::Deserialize;

use crate::descriptor::FunctionSpec;
use crate::error::ConfigError;

/// The reserved key holding the nested function block.
pub const FUNCTION_KEY: &str = "FUNCTION";

/// A raw scalar stored in the configuration document.
///
/// Variant order matters: YAML scalars are tried as booleans, then
/// integers, then strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// A boolean scalar.
    Bool(bool),
    /// An integer scalar.
    Int(i64),
    /// A string scalar.
    String(String),
}

impl ConfigValue {
    /// Coerce to a string.
    pub fn as_string(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::String(s) => s.clone(),
        }
    }

    /// Coerce to an integer. Strings that do not parse yield `None`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Int(i) => Some(*i),
            Self::String(s) => s.trim().parse().ok(),
        }
    }

    /// Coerce to a boolean. Strings other than true/false/1/0 yield `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::String(s) => match s.trim() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
        }
    }
}

/// The root configuration document.
#[derive(Debug, Deserialize)]
struct ConfigDocument {
    /// All named environments.
    environments: BTreeMap<String, EnvironmentEntry>,
}

/// One environment's raw entry in the document.
#[derive(Debug, Deserialize)]
struct EnvironmentEntry {
    /// The reserved function settings block.
    #[serde(rename = "FUNCTION")]
    function: Option<FunctionSpec>,

    /// Every other key is a deployable variable.
    #[serde(flatten)]
    variables: BTreeMap<String, ConfigValue>,
}

/// The resolved settings for one named environment.
///
/// Missing keys are reported as `None` by every accessor; a missing key
/// is never conflated with the zero value of the requested type.
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    name: String,
    function: Option<FunctionSpec>,
    variables: BTreeMap<String, ConfigValue>,
}

impl EnvironmentConfig {
    /// Load the named environment from a YAML configuration file.
    ///
    /// Fails with [`ConfigError::UnknownEnvironment`] when the name is
    /// absent from the document. There is no fallback environment.
    pub fn load(path: &Path, environment: &str) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_owned()));
        }

        let document: ConfigDocument = Figment::new().merge(Yaml::file(path)).extract()?;
        Self::resolve(document, environment)
    }

    /// Load the named environment from a YAML string.
    pub fn from_yaml(yaml: &str, environment: &str) -> Result<Self, ConfigError> {
        let document: ConfigDocument = Figment::new().merge(Yaml::string(yaml)).extract()?;
        Self::resolve(document, environment)
    }

    fn resolve(mut document: ConfigDocument, environment: &str) -> Result<Self, ConfigError> {
        let entry = document
            .environments
            .remove(environment)
            .ok_or_else(|| ConfigError::UnknownEnvironment(environment.to_owned()))?;

        let mut variables = entry.variables;
        variables.insert(
            "ENVIRONMENT".to_owned(),
            ConfigValue::String(environment.to_owned()),
        );

        Ok(Self {
            name: environment.to_owned(),
            function: entry.function,
            variables,
        })
    }

    /// The environment name this configuration was resolved for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The nested function block, if the environment defines one.
    pub fn function(&self) -> Option<&FunctionSpec> {
        self.function.as_ref()
    }

    /// The nested function block, or an error naming the environment.
    pub fn require_function(&self) -> Result<&FunctionSpec, ConfigError> {
        self.function
            .as_ref()
            .ok_or_else(|| ConfigError::MissingFunctionBlock(self.name.clone()))
    }

    /// Look up a raw variable. The reserved `FUNCTION` key is never
    /// visible through this accessor.
    pub fn variable(&self, name: &str) -> Option<&ConfigValue> {
        if name == FUNCTION_KEY {
            return None;
        }
        self.variables.get(name)
    }

    /// Look up a variable coerced to a string.
    pub fn string(&self, name: &str) -> Option<String> {
        self.variable(name).map(ConfigValue::as_string)
    }

    /// Look up a variable coerced to an integer.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.variable(name).and_then(ConfigValue::as_int)
    }

    /// Look up a variable coerced to a boolean.
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.variable(name).and_then(ConfigValue::as_bool)
    }

    /// All variables rendered as strings, ready to ship as the
    /// function's environment. The reserved block is excluded.
    pub fn deploy_variables(&self) -> BTreeMap<String, String> {
        self.variables
            .iter()
            .map(|(key, value)| (key.clone(), value.as_string()))
            .collect()
    }
}
