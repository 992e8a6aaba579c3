//! Component records and the typed [`ComponentData`] trait.
//!
//! A [`Component`] is a bag of named fields with no behaviour. Entities key
//! their components by name, so the record itself does not carry its name.
//! Field values are `serde_json::Value`s: any serialisable Rust struct can be
//! stored as a component and read back through [`ComponentData`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ComponentError;

/// A mutable record of named fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Component {
    fields: Map<String, Value>,
}

impl Component {
    /// Create an empty component (a pure tag).
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Convert any serialisable value into a component.
    ///
    /// Structs and maps become records; unit values (`null`) become an empty
    /// tag component.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NotAnObject`] if `value` serialises to
    /// something other than an object or `null`, and
    /// [`ComponentError::Serde`] if serialisation itself fails.
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self, ComponentError> {
        match serde_json::to_value(value)? {
            Value::Object(fields) => Ok(Self { fields }),
            Value::Null => Ok(Self::new()),
            other => Err(ComponentError::NotAnObject(kind_of(&other))),
        }
    }

    /// Deserialise the record back into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Serde`] if the fields do not match `T`.
    pub fn to_value<T: DeserializeOwned>(&self) -> Result<T, ComponentError> {
        if self.fields.is_empty() {
            // Unit structs deserialise from `null`, not from `{}`.
            if let Ok(value) = serde_json::from_value(Value::Null) {
                return Ok(value);
            }
        }
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }

    /// Returns the value of a single field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets a single field, returning the previous value if there was one.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Shallow merge: every supplied field overwrites the field of the same
    /// name. Nested objects are replaced, not merged.
    pub fn merge(&mut self, partial: Map<String, Value>) {
        for (field, value) in partial {
            self.fields.insert(field, value);
        }
    }

    /// Returns all fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consumes the component, returning its fields.
    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the component has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for Component {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A Rust type that can be stored as a named component.
///
/// # Examples
///
/// ```rust
/// use serde::{Serialize, Deserialize};
/// use engine_component::ComponentData;
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl ComponentData for Health {
///     fn component_name() -> &'static str { "health" }
/// }
/// ```
pub trait ComponentData: Serialize + DeserializeOwned + 'static {
    /// The key this component is stored under on an entity.
    fn component_name() -> &'static str;
}
