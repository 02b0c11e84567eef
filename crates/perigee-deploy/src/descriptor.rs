//! The deploy descriptor and its validated constructor.
//!
//! A [`DeployDescriptor`] is the fully-resolved request sent to the
//! function platform. It is built fresh for every deploy through
//! [`DeployDescriptor::build`], which applies defaults and validates the
//! required fields; a partially-configured descriptor cannot exist.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use crate::error::ValidationError;

/// A supported function runtime identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    Nodejs,
    Nodejs43,
    Nodejs610,
    Java8,
    Python27,
    Python36,
    Dotnetcore10,
    Nodejs43Edge,
}

impl Runtime {
    /// The runtime used when the function block does not name one.
    pub const DEFAULT: Self = Self::Nodejs610;

    /// The platform identifier for this runtime.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nodejs => "nodejs",
            Self::Nodejs43 => "nodejs4.3",
            Self::Nodejs610 => "nodejs6.10",
            Self::Java8 => "java8",
            Self::Python27 => "python2.7",
            Self::Python36 => "python3.6",
            Self::Dotnetcore10 => "dotnetcore1.0",
            Self::Nodejs43Edge => "nodejs4.3-edge",
        }
    }

    /// Parse a platform identifier, `None` for anything outside the
    /// supported set.
    pub fn parse(identifier: &str) -> Option<Self> {
        match identifier {
            "nodejs" => Some(Self::Nodejs),
            "nodejs4.3" => Some(Self::Nodejs43),
            "nodejs6.10" => Some(Self::Nodejs610),
            "java8" => Some(Self::Java8),
            "python2.7" => Some(Self::Python27),
            "python3.6" => Some(Self::Python36),
            "dotnetcore1.0" => Some(Self::Dotnetcore10),
            "nodejs4.3-edge" => Some(Self::Nodejs43Edge),
            _ => None,
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The raw function settings block from the environment configuration.
///
/// Fields are as-written in the configuration; defaulting and
/// validation happen in [`DeployDescriptor::build`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionSpec {
    /// The function name. Required.
    #[serde(default)]
    pub function_name: String,

    /// The handler entry point. Required.
    #[serde(default)]
    pub handler: String,

    /// The execution role ARN. Required.
    #[serde(default)]
    pub role: String,

    /// The runtime identifier. Defaults to [`Runtime::DEFAULT`].
    pub runtime: Option<String>,

    /// Memory size in megabytes. Defaults to 128.
    pub memory_size: Option<i32>,

    /// Timeout in seconds. Defaults to 3.
    pub timeout: Option<i32>,

    /// Free-text description. Defaults to empty.
    pub description: Option<String>,
}

/// The fully-resolved request sent to the function platform.
#[derive(Debug, Clone)]
pub struct DeployDescriptor {
    /// The function name.
    pub function_name: String,
    /// The handler entry point.
    pub handler: String,
    /// The execution role ARN.
    pub role: String,
    /// The validated runtime.
    pub runtime: Runtime,
    /// Memory size in megabytes.
    pub memory_size: i32,
    /// Timeout in seconds.
    pub timeout: i32,
    /// Free-text description.
    pub description: String,
    /// Staging bucket the artifact is uploaded to.
    pub bucket: String,
    /// Object key for this deploy's artifact.
    pub key: String,
    /// Desired environment variables, sentinel-aware.
    pub variables: BTreeMap<String, String>,
}

impl DeployDescriptor {
    /// Build a descriptor from a function block and the environment's
    /// deployable variables.
    ///
    /// Applies defaults, then validates the required fields in fixed
    /// order (FunctionName, Handler, Role, Runtime), failing on the
    /// first one that is empty. The timestamp makes the object key
    /// unique per deploy, so concurrent deploys of the same function
    /// never collide on the key.
    pub fn build(
        spec: &FunctionSpec,
        variables: BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let runtime_identifier = spec.runtime.as_deref().unwrap_or(Runtime::DEFAULT.as_str());

        if spec.function_name.is_empty() {
            return Err(ValidationError::MissingRequiredField("FunctionName"));
        }
        if spec.handler.is_empty() {
            return Err(ValidationError::MissingRequiredField("Handler"));
        }
        if spec.role.is_empty() {
            return Err(ValidationError::MissingRequiredField("Role"));
        }
        if runtime_identifier.is_empty() {
            return Err(ValidationError::MissingRequiredField("Runtime"));
        }

        let runtime = Runtime::parse(runtime_identifier)
            .ok_or_else(|| ValidationError::UnsupportedRuntime(runtime_identifier.to_owned()))?;

        let bucket = format!("{}-lambda-deploy-bucket", spec.function_name);
        let key = format!(
            "lambda/deploy/{}-{}",
            spec.function_name,
            now.to_rfc3339_opts(SecondsFormat::Secs, true)
        );

        Ok(Self {
            function_name: spec.function_name.clone(),
            handler: spec.handler.clone(),
            role: spec.role.clone(),
            runtime,
            memory_size: spec.memory_size.unwrap_or(128),
            timeout: spec.timeout.unwrap_or(3),
            description: spec.description.clone().unwrap_or_default(),
            bucket,
            key,
            variables,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn full_spec() -> FunctionSpec {
        FunctionSpec {
            function_name: "orders".to_owned(),
            handler: "handler.handle".to_owned(),
            role: "arn:aws:iam::123456789012:role/orders".to_owned(),
            runtime: Some("python3.6".to_owned()),
            memory_size: None,
            timeout: None,
            description: None,
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap()
    }

    #[test]
    fn applies_defaults() {
        let descriptor =
            DeployDescriptor::build(&full_spec(), BTreeMap::new(), fixed_now()).unwrap();
        assert_eq!(descriptor.memory_size, 128);
        assert_eq!(descriptor.timeout, 3);
        assert_eq!(descriptor.description, "");
    }

    #[test]
    fn defaults_runtime_when_unset() {
        let spec = FunctionSpec {
            runtime: None,
            ..full_spec()
        };
        let descriptor = DeployDescriptor::build(&spec, BTreeMap::new(), fixed_now()).unwrap();
        assert_eq!(descriptor.runtime, Runtime::Nodejs610);
    }

    #[test]
    fn required_fields_checked_in_fixed_order() {
        // Both the name and the handler are missing; the name is
        // reported because it is checked first.
        let spec = FunctionSpec {
            function_name: String::new(),
            handler: String::new(),
            ..full_spec()
        };
        match DeployDescriptor::build(&spec, BTreeMap::new(), fixed_now()).unwrap_err() {
            ValidationError::MissingRequiredField(field) => assert_eq!(field, "FunctionName"),
            other => panic!("expected MissingRequiredField, got {other:?}"),
        }

        let spec = FunctionSpec {
            handler: String::new(),
            role: String::new(),
            ..full_spec()
        };
        match DeployDescriptor::build(&spec, BTreeMap::new(), fixed_now()).unwrap_err() {
            ValidationError::MissingRequiredField(field) => assert_eq!(field, "Handler"),
            other => panic!("expected MissingRequiredField, got {other:?}"),
        }

        let spec = FunctionSpec {
            role: String::new(),
            ..full_spec()
        };
        match DeployDescriptor::build(&spec, BTreeMap::new(), fixed_now()).unwrap_err() {
            ValidationError::MissingRequiredField(field) => assert_eq!(field, "Role"),
            other => panic!("expected MissingRequiredField, got {other:?}"),
        }

        let spec = FunctionSpec {
            runtime: Some(String::new()),
            ..full_spec()
        };
        match DeployDescriptor::build(&spec, BTreeMap::new(), fixed_now()).unwrap_err() {
            ValidationError::MissingRequiredField(field) => assert_eq!(field, "Runtime"),
            other => panic!("expected MissingRequiredField, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unsupported_runtime() {
        let spec = FunctionSpec {
            runtime: Some("fortran77".to_owned()),
            ..full_spec()
        };
        match DeployDescriptor::build(&spec, BTreeMap::new(), fixed_now()).unwrap_err() {
            ValidationError::UnsupportedRuntime(identifier) => {
                assert_eq!(identifier, "fortran77");
            }
            other => panic!("expected UnsupportedRuntime, got {other:?}"),
        }
    }

    #[test]
    fn derives_bucket_and_timestamped_key() {
        let descriptor =
            DeployDescriptor::build(&full_spec(), BTreeMap::new(), fixed_now()).unwrap();
        assert_eq!(descriptor.bucket, "orders-lambda-deploy-bucket");
        assert_eq!(descriptor.key, "lambda/deploy/orders-2024-05-17T09:30:00Z");
    }

    #[test]
    fn keys_differ_across_deploys() {
        let first = DeployDescriptor::build(&full_spec(), BTreeMap::new(), fixed_now()).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 1).unwrap();
        let second = DeployDescriptor::build(&full_spec(), BTreeMap::new(), later).unwrap();
        assert_ne!(first.key, second.key);
    }

    #[test]
    fn runtime_identifiers_round_trip() {
        for identifier in [
            "nodejs",
            "nodejs4.3",
            "nodejs6.10",
            "java8",
            "python2.7",
            "python3.6",
            "dotnetcore1.0",
            "nodejs4.3-edge",
        ] {
            let runtime = Runtime::parse(identifier).unwrap();
            assert_eq!(runtime.as_str(), identifier);
        }
        assert!(Runtime::parse("python3.12").is_none());
    }
}
