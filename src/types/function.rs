use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A function the model may ask to call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    /// Name the model uses to refer to the function.
    pub name: String,

    /// What the function does, in prose for the model.
    pub description: String,

    /// JSON-schema description of the arguments.
    pub parameters: Parameters,
}

/// The argument object of a [`FunctionDef`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Always `"object"` for function arguments.
    #[serde(rename = "type")]
    pub kind: String,

    /// The named arguments.
    pub properties: BTreeMap<String, Property>,

    /// Names of the arguments that must be supplied.
    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            kind: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

/// A single argument of a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// JSON-schema type name.
    #[serde(rename = "type")]
    pub kind: String,

    /// What the argument means.
    pub description: String,

    /// Element type when `kind` is `"array"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ArrayItems>,
}

/// Element type of an array argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayItems {
    /// JSON-schema type name.
    #[serde(rename = "type")]
    pub kind: String,
}

impl FunctionDef {
    /// Create a function definition with no arguments.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Parameters::default(),
        }
    }

    /// Add an argument.
    pub fn with_property(
        mut self,
        name: impl Into<String>,
        property: Property,
        required: bool,
    ) -> Self {
        let name = name.into();
        if required {
            self.parameters.required.push(name.clone());
        }
        self.parameters.properties.insert(name, property);
        self
    }
}

impl Property {
    /// Create a scalar argument of the given JSON-schema type.
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
            items: None,
        }
    }

    /// Create an array argument whose elements have the given JSON-schema type.
    pub fn array(items: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: "array".to_string(),
            description: description.into(),
            items: Some(ArrayItems { kind: items.into() }),
        }
    }
}

/// How the model should choose whether to call a function.
///
/// Serializes to `"none"`, `"auto"`, or `{"name": <function>}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionCallDirective {
    /// Never call a function.
    None,

    /// Let the model decide.
    Auto,

    /// Force a call to the named function.
    Named(String),
}

impl From<&str> for FunctionCallDirective {
    fn from(value: &str) -> Self {
        match value {
            "none" => FunctionCallDirective::None,
            "auto" => FunctionCallDirective::Auto,
            name => FunctionCallDirective::Named(name.to_string()),
        }
    }
}

impl Serialize for FunctionCallDirective {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FunctionCallDirective::None => serializer.serialize_str("none"),
            FunctionCallDirective::Auto => serializer.serialize_str("auto"),
            FunctionCallDirective::Named(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("name", name)?;
                map.end()
            }
        }
    }
}
