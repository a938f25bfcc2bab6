use crate::types::{Ty, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Argument name to value, in declaration order.
pub type Bindings = IndexMap<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Example {
    pub input: Bindings,
    pub output: Value,
}

impl Example {
    pub fn new<I, K>(input: I, output: Value) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Example {
            input: input.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            output,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExampleError {
    #[error("at least one example is required")]
    Empty,
    #[error("example {index} binds [{found}], expected [{expected}]")]
    ArgumentMismatch {
        index: usize,
        expected: String,
        found: String,
    },
    #[error("argument '{name}' of example {index} is {found}, expected {expected}")]
    ArgumentType {
        index: usize,
        name: String,
        expected: Ty,
        found: Ty,
    },
    #[error("output of example {index} is {found}, expected {expected}")]
    OutputType {
        index: usize,
        expected: Ty,
        found: Ty,
    },
}

/// Argument and output types shared by every example of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub arguments: IndexMap<String, Ty>,
    pub output: Ty,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, (name, ty)) in self.arguments.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, ty)?;
        }
        write!(f, ") -> {}", self.output)
    }
}

/// A validated, non-empty list of examples. Its length fixes the length of
/// every output vector in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExampleSet {
    examples: Vec<Example>,
    signature: Signature,
}

impl ExampleSet {
    pub fn new(examples: Vec<Example>) -> Result<Self, ExampleError> {
        let signature = infer_signature(&examples)?;
        Ok(ExampleSet {
            examples,
            signature,
        })
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Example> {
        self.examples.iter()
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn argument_names(&self) -> impl Iterator<Item = &str> {
        self.signature.arguments.keys().map(String::as_str)
    }

    /// Expected outputs, one per example, in order.
    pub fn target(&self) -> Vec<Value> {
        self.examples.iter().map(|ex| ex.output.clone()).collect()
    }

    /// The value bound to `name` in each example, or `None` if the examples
    /// don't bind it.
    pub fn column(&self, name: &str) -> Option<Vec<Value>> {
        self.examples
            .iter()
            .map(|ex| ex.input.get(name).cloned())
            .collect()
    }
}

impl<'a> IntoIterator for &'a ExampleSet {
    type Item = &'a Example;
    type IntoIter = std::slice::Iter<'a, Example>;

    fn into_iter(self) -> Self::IntoIter {
        self.examples.iter()
    }
}

pub fn infer_signature(examples: &[Example]) -> Result<Signature, ExampleError> {
    let first = examples.first().ok_or(ExampleError::Empty)?;
    let arguments = first
        .input
        .iter()
        .map(|(name, value)| (name.clone(), value.ty()))
        .collect::<IndexMap<_, _>>();
    let output = first.output.ty();

    for (index, ex) in examples.iter().enumerate().skip(1) {
        let same_names = ex.input.len() == arguments.len()
            && ex.input.keys().all(|k| arguments.contains_key(k));
        if !same_names {
            return Err(ExampleError::ArgumentMismatch {
                index,
                expected: join_names(arguments.keys()),
                found: join_names(ex.input.keys()),
            });
        }
        for (name, value) in ex.input.iter() {
            let expected = arguments[name];
            if value.ty() != expected {
                return Err(ExampleError::ArgumentType {
                    index,
                    name: name.clone(),
                    expected,
                    found: value.ty(),
                });
            }
        }
        if ex.output.ty() != output {
            return Err(ExampleError::OutputType {
                index,
                expected: output,
                found: ex.output.ty(),
            });
        }
    }

    Ok(Signature { arguments, output })
}

fn join_names<'a>(names: impl Iterator<Item = &'a String>) -> String {
    names.map(String::as_str).collect::<Vec<_>>().join(", ")
}

pub fn decode_examples(bytes: &[u8]) -> Result<Vec<Example>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

pub fn read_examples<P: AsRef<Path>>(path: P) -> anyhow::Result<ExampleSet> {
    let data = fs::read(path)?;
    let examples = decode_examples(&data)?;
    Ok(ExampleSet::new(examples)?)
}
