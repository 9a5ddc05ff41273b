//! Launch parameters for the vLLM servers.
//!
//! Parameters arrive as a free-form bag, either from trailing command line
//! tokens or from a YAML/JSON mapping, and are normalised into the flag list
//! every generated server is started with.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde_yaml::Value;

use crate::error::{GeneratorError, Result};

/// Model identifier, the only parameter that must always be given.
pub const MODEL: &str = "model";
/// Number of devices per server. Also forwarded to vLLM as its tensor parallel size.
pub const GROUP_SIZE: &str = "tensor_parallel_size";
/// Tag of the `vllm/vllm-openai` image.
pub const IMAGE_TAG: &str = "vllm_version";

pub const DEFAULT_GROUP_SIZE: usize = 1;
pub const DEFAULT_IMAGE_TAG: &str = "latest";

const SCALAR: &str = "boolean, number or string";

/// Shape of a parameter value, used when reporting type errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ValueKind {
    #[display("null")]
    Null,
    #[display("boolean")]
    Boolean,
    #[display("number")]
    Number,
    #[display("string")]
    String,
    #[display("sequence")]
    Sequence,
    #[display("mapping")]
    Mapping,
    #[display("tagged value")]
    Tagged,
}

impl From<&Value> for ValueKind {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Sequence(_) => Self::Sequence,
            Value::Mapping(_) => Self::Mapping,
            Value::Tagged(_) => Self::Tagged,
        }
    }
}

/// Ordered bag of launch parameters.
///
/// Names are stored in snake case so `max-model-len` and `max_model_len`
/// address the same entry. Re-inserting a name replaces its value but keeps
/// its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchParameters {
    entries: IndexMap<String, Value>,
}

impl LaunchParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.entries.insert(canonical_name(name), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(&canonical_name(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.shift_remove(&canonical_name(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Fails on the first parameter named like one of `names`.
    pub fn reject_names<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let names: Vec<String> = names.into_iter().map(canonical_name).collect();
        match self.entries.keys().find(|name| names.contains(name)) {
            Some(name) => Err(GeneratorError::MisplacedOption {
                name: name.replace('_', "-"),
            }),
            None => Ok(()),
        }
    }

    /// Merges `other` into `self`; values from `other` win.
    pub fn merge(&mut self, other: LaunchParameters) {
        self.entries.extend(other.entries);
    }

    /// Parses command line style tokens: `--name=value`, `--name value` or a
    /// bare `--name`, which stands for `true`.
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut params = Self::new();
        let mut tokens = args.into_iter().map(Into::into).peekable();

        while let Some(token) = tokens.next() {
            let Some(flag) = token.strip_prefix("--") else {
                return Err(GeneratorError::UnexpectedArgument { token });
            };

            let (name, value) = match flag.split_once('=') {
                Some((name, raw)) => (name, infer_value(raw)),
                None => match tokens.next_if(|next| !next.starts_with("--")) {
                    Some(raw) => (flag, infer_value(&raw)),
                    None => (flag, Value::Bool(true)),
                },
            };

            if name.is_empty() {
                return Err(GeneratorError::UnexpectedArgument { token });
            }
            params.insert(name, value);
        }

        Ok(params)
    }

    /// Parses a YAML (or JSON) mapping of parameter names to values.
    ///
    /// Values are kept as they are; type checking happens in [`normalize`].
    pub fn from_yaml_str(source: &str, origin: &str) -> Result<Self> {
        let file_error = |reason: String| GeneratorError::ParamsFile {
            path: origin.to_string(),
            reason,
        };

        let document: Value =
            serde_yaml::from_str(source).map_err(|e| file_error(e.to_string()))?;

        let mapping = match document {
            Value::Null => return Ok(Self::new()),
            Value::Mapping(mapping) => mapping,
            other => {
                return Err(file_error(format!(
                    "expected a mapping at the top level, got {}",
                    ValueKind::from(&other)
                )))
            }
        };

        let mut params = Self::new();
        for (key, value) in mapping {
            match key {
                Value::String(name) => params.insert(&name, value),
                other => {
                    return Err(file_error(format!(
                        "parameter names must be strings, got {}",
                        ValueKind::from(&other)
                    )))
                }
            }
        }
        Ok(params)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let origin = path.display().to_string();
        let source = std::fs::read_to_string(path).map_err(|e| GeneratorError::ParamsFile {
            path: origin.clone(),
            reason: e.to_string(),
        })?;
        Self::from_yaml_str(&source, &origin)
    }
}

impl<N: AsRef<str>, V: Into<Value>> FromIterator<(N, V)> for LaunchParameters {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name.as_ref(), value);
        }
        params
    }
}

fn canonical_name(name: &str) -> String {
    name.replace('-', "_")
}

/// Types a raw command line value the way a shell user would expect:
/// booleans, then integers, then finite floats, otherwise a string.
pub fn infer_value(raw: &str) -> Value {
    match raw {
        "true" | "True" => return Value::Bool(true),
        "false" | "False" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    match raw.parse::<f64>() {
        Ok(float) if float.is_finite() => Value::Number(float.into()),
        _ => Value::String(raw.to_string()),
    }
}

/// A rendered command line flag for the vLLM server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flag {
    /// `--name`
    Toggle(String),
    /// `--name=value`
    Value { name: String, value: String },
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::Toggle(name) => write!(f, "--{name}"),
            Flag::Value { name, value } => write!(f, "--{name}={value}"),
        }
    }
}

/// Launch parameters after the control values have been taken out.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedParameters {
    pub group_size: usize,
    pub image_tag: String,
    /// Flags in the order the parameters were given.
    pub flags: Vec<Flag>,
}

/// Extracts the group size and image tag and turns every remaining
/// parameter into a [`Flag`].
///
/// `true` booleans become toggles. `false` booleans are dropped: a false
/// value means "leave the flag off", never `--name=false`.
pub fn normalize(mut params: LaunchParameters) -> Result<NormalizedParameters> {
    let group_size = take_group_size(&mut params)?;
    let image_tag = take_image_tag(&mut params)?;

    match params.get(MODEL) {
        None => {
            return Err(GeneratorError::MissingRequiredParameter {
                name: MODEL.to_string(),
            })
        }
        Some(value @ Value::Bool(_)) => return Err(invalid_type(MODEL, "string", value)),
        Some(_) => {}
    }

    let mut flags = Vec::with_capacity(params.len());
    for (name, value) in params.iter() {
        let flag_name = name.replace('_', "-");
        match value {
            Value::Bool(true) => flags.push(Flag::Toggle(flag_name)),
            Value::Bool(false) => {}
            Value::Number(number) => flags.push(Flag::Value {
                name: flag_name,
                value: number.to_string(),
            }),
            Value::String(string) => flags.push(Flag::Value {
                name: flag_name,
                value: string.clone(),
            }),
            other => return Err(invalid_type(name, SCALAR, other)),
        }
    }

    Ok(NormalizedParameters {
        group_size,
        image_tag,
        flags,
    })
}

fn take_group_size(params: &mut LaunchParameters) -> Result<usize> {
    let Some(value) = params.remove(GROUP_SIZE) else {
        return Ok(DEFAULT_GROUP_SIZE);
    };

    let size = match &value {
        Value::Number(number) => number.as_i64(),
        _ => None,
    }
    .ok_or_else(|| invalid_type(GROUP_SIZE, "integer", &value))?;

    usize::try_from(size)
        .ok()
        .filter(|size| *size >= 1)
        .ok_or(GeneratorError::InvalidGroupSize { value: size })
}

fn take_image_tag(params: &mut LaunchParameters) -> Result<String> {
    match params.remove(IMAGE_TAG) {
        None => Ok(DEFAULT_IMAGE_TAG.to_string()),
        Some(Value::String(tag)) => Ok(tag),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(other) => Err(invalid_type(IMAGE_TAG, "string", &other)),
    }
}

fn invalid_type(name: &str, expected: &'static str, value: &Value) -> GeneratorError {
    GeneratorError::InvalidParameterType {
        name: name.to_string(),
        expected,
        found: ValueKind::from(value),
    }
}
