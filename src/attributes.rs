// 🏷️ Attribute Layer - Typed names, values, definitions
// Attributes exist independently of any entity type: a name means the same
// thing (and carries the same kind of value) wherever it is used.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::entity::Entity;
use crate::error::{EntityError, Result};
use crate::vocabulary::Vocabulary;

// ============================================================================
// VALUE KINDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Integer,
    Real,
    Text,
    Boolean,
    Timestamp,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Integer => "integer",
            ValueKind::Real => "real",
            ValueKind::Text => "text",
            ValueKind::Boolean => "boolean",
            ValueKind::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ATTRIBUTE VALUE (erased storage)
// ============================================================================

/// A stored attribute value. Entities keep these in their frozen map; typed
/// access goes through [`AttributeType::from_value`].
#[derive(Debug, Clone)]
pub enum AttributeValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
}

impl AttributeValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            AttributeValue::Integer(_) => ValueKind::Integer,
            AttributeValue::Real(_) => ValueKind::Real,
            AttributeValue::Text(_) => ValueKind::Text,
            AttributeValue::Boolean(_) => ValueKind::Boolean,
            AttributeValue::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    /// Coerce a raw JSON value to `kind`.
    ///
    /// Accepted: numbers and numeric strings for integer/real, booleans and
    /// "true"/"false" for boolean, strings for text, RFC 3339 strings or
    /// epoch seconds for timestamps.
    pub fn from_json(attribute: &str, kind: ValueKind, raw: &serde_json::Value) -> Result<Self> {
        use serde_json::Value as Json;

        let coerced = match (kind, raw) {
            (ValueKind::Integer, Json::Number(n)) => n.as_i64().map(AttributeValue::Integer),
            (ValueKind::Real, Json::Number(n)) => n.as_f64().map(AttributeValue::Real),
            (ValueKind::Boolean, Json::Bool(b)) => Some(AttributeValue::Boolean(*b)),
            (ValueKind::Text, Json::String(s)) => Some(AttributeValue::Text(s.clone())),
            (ValueKind::Timestamp, Json::Number(n)) => n.as_i64().and_then(epoch_seconds),
            (_, Json::String(s)) => return Self::parse_text(attribute, kind, s),
            _ => None,
        };

        coerced.ok_or_else(|| EntityError::type_mismatch(attribute, kind, describe_json(raw)))
    }

    /// Parse a raw text cell (e.g. one column of a delimited file) as `kind`.
    pub fn parse_text(attribute: &str, kind: ValueKind, raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let parsed = match kind {
            ValueKind::Integer => trimmed.parse::<i64>().ok().map(AttributeValue::Integer),
            ValueKind::Real => trimmed.parse::<f64>().ok().map(AttributeValue::Real),
            ValueKind::Text => Some(AttributeValue::Text(raw.to_string())),
            ValueKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(AttributeValue::Boolean(true)),
                "false" | "0" => Some(AttributeValue::Boolean(false)),
                _ => None,
            },
            ValueKind::Timestamp => DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| AttributeValue::Timestamp(dt.with_timezone(&Utc)))
                .or_else(|| trimmed.parse::<i64>().ok().and_then(epoch_seconds)),
        };

        parsed.ok_or_else(|| EntityError::type_mismatch(attribute, kind, format!("text {:?}", raw)))
    }
}

/// Reals compare by their total order, so a stored NaN equals its own copy.
impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttributeValue::Integer(a), AttributeValue::Integer(b)) => a == b,
            (AttributeValue::Real(a), AttributeValue::Real(b)) => a.total_cmp(b).is_eq(),
            (AttributeValue::Text(a), AttributeValue::Text(b)) => a == b,
            (AttributeValue::Boolean(a), AttributeValue::Boolean(b)) => a == b,
            (AttributeValue::Timestamp(a), AttributeValue::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AttributeValue {}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Integer(v) => write!(f, "{}", v),
            AttributeValue::Real(v) => write!(f, "{}", v),
            AttributeValue::Text(v) => write!(f, "{}", v),
            AttributeValue::Boolean(v) => write!(f, "{}", v),
            AttributeValue::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

fn epoch_seconds(secs: i64) -> Option<AttributeValue> {
    Utc.timestamp_opt(secs, 0).single().map(AttributeValue::Timestamp)
}

fn describe_json(raw: &serde_json::Value) -> String {
    use serde_json::Value as Json;

    let label = match raw {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    };
    format!("{} {}", label, raw)
}

// ============================================================================
// ATTRIBUTE TYPE (Rust type <-> value kind)
// ============================================================================

/// Rust types an attribute may carry.
///
/// Implemented for `i64`, `f64`, `String`, `bool` and `DateTime<Utc>`; the
/// kind of a [`TypedName<T>`] is always `T::KIND`.
pub trait AttributeType: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    const KIND: ValueKind;

    fn into_value(self) -> AttributeValue;

    /// Borrow the typed value, or `None` if `value` holds another kind.
    fn from_value(value: &AttributeValue) -> Option<&Self>;
}

macro_rules! attribute_type {
    ($ty:ty, $variant:ident) => {
        impl AttributeType for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn into_value(self) -> AttributeValue {
                AttributeValue::$variant(self)
            }

            fn from_value(value: &AttributeValue) -> Option<&Self> {
                match value {
                    AttributeValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

attribute_type!(i64, Integer);
attribute_type!(f64, Real);
attribute_type!(String, Text);
attribute_type!(bool, Boolean);
attribute_type!(DateTime<Utc>, Timestamp);

// ============================================================================
// ATTRIBUTE NAME (erased key)
// ============================================================================

#[derive(Debug)]
struct NameData {
    name: Box<str>,
    kind: ValueKind,
}

/// An attribute key with its declared kind, but without the Rust type
/// parameter. This is what entities store and what
/// [`Entity::typed_attribute_names`] hands out for generic iteration.
///
/// Identity is the name alone; two canonical instances from the same
/// vocabulary compare by pointer first.
#[derive(Clone)]
pub struct AttributeName(Arc<NameData>);

impl AttributeName {
    pub(crate) fn new(name: &str, kind: ValueKind) -> Self {
        AttributeName(Arc::new(NameData {
            name: name.into(),
            kind,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> ValueKind {
        self.0.kind
    }

    /// True if both are the very same canonical instance.
    pub fn same_instance(&self, other: &AttributeName) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Recover the typed key if `T` matches the declared kind.
    pub fn typed<T: AttributeType>(&self) -> Option<TypedName<T>> {
        (self.kind() == T::KIND).then(|| TypedName::from_erased(self.clone()))
    }
}

impl PartialEq for AttributeName {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for AttributeName {}

impl Hash for AttributeName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl PartialOrd for AttributeName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AttributeName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name().cmp(other.name())
    }
}

impl Borrow<str> for AttributeName {
    fn borrow(&self) -> &str {
        self.name()
    }
}

impl fmt::Debug for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttributeName({}: {})", self.name(), self.kind())
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// TYPED NAME
// ============================================================================

/// Attribute key parameterized by the value type it carries.
///
/// Obtain canonical instances from a [`Vocabulary`] (or [`TypedName::create`]
/// for the process-wide one); registering a name under two different types is
/// rejected with [`EntityError::RegistrationConflict`].
pub struct TypedName<T> {
    erased: AttributeName,
    _type: PhantomData<fn() -> T>,
}

impl<T: AttributeType> TypedName<T> {
    /// Canonical key from the global vocabulary.
    pub fn create(name: &str) -> Result<Self> {
        Vocabulary::global().typed_name(name)
    }

    pub(crate) fn from_erased(erased: AttributeName) -> Self {
        debug_assert_eq!(erased.kind(), T::KIND);
        TypedName {
            erased,
            _type: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.erased.name()
    }

    pub fn kind(&self) -> ValueKind {
        T::KIND
    }

    pub fn erased(&self) -> &AttributeName {
        &self.erased
    }
}

impl<T> Clone for TypedName<T> {
    fn clone(&self) -> Self {
        TypedName {
            erased: self.erased.clone(),
            _type: PhantomData,
        }
    }
}

impl<T> PartialEq for TypedName<T> {
    fn eq(&self, other: &Self) -> bool {
        self.erased == other.erased
    }
}

impl<T> Eq for TypedName<T> {}

impl<T> Hash for TypedName<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.erased.hash(state);
    }
}

impl<T> fmt::Debug for TypedName<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedName({}: {})", self.erased.name(), self.erased.kind())
    }
}

impl<T> fmt::Display for TypedName<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.erased.name())
    }
}

// ============================================================================
// ATTRIBUTE (typed name + extraction metadata)
// ============================================================================

/// An attribute definition used by extraction combinators: the typed key plus
/// what to do when an entity lacks it.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute<T: AttributeType> {
    name: TypedName<T>,
    description: String,
    default_value: Option<T>,
    missing_label: String,
}

impl<T: AttributeType> Attribute<T> {
    pub fn new(name: TypedName<T>) -> Self {
        Attribute {
            name,
            description: String::new(),
            default_value: None,
            missing_label: String::new(),
        }
    }

    /// Builder: add description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: value substituted by `extract_or_default`
    pub fn with_default(mut self, value: T) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Builder: text rendered by `format` when the value is missing
    pub fn with_missing_label(mut self, label: impl Into<String>) -> Self {
        self.missing_label = label.into();
        self
    }

    pub fn name(&self) -> &TypedName<T> {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn default_value(&self) -> Option<&T> {
        self.default_value.as_ref()
    }

    pub fn missing_label(&self) -> &str {
        &self.missing_label
    }

    pub fn extract(&self, entity: &Entity) -> Option<T> {
        entity.maybe_get(&self.name).cloned()
    }

    pub fn extract_or_default(&self, entity: &Entity) -> Option<T> {
        self.extract(entity).or_else(|| self.default_value.clone())
    }

    /// Render the entity's value, or the missing label.
    pub fn format(&self, entity: &Entity) -> String {
        match entity.maybe_get(&self.name) {
            Some(value) => value.clone().into_value().to_string(),
            None => self.missing_label.clone(),
        }
    }
}

impl<T: AttributeType> From<TypedName<T>> for Attribute<T> {
    fn from(name: TypedName<T>) -> Self {
        Attribute::new(name)
    }
}

// ============================================================================
// ATTRIBUTE DEFINITION (declarative vocabulary entry)
// ============================================================================

/// Serializable declaration of an attribute, as read from a vocabulary file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Attribute name (e.g., "rating")
    pub name: String,

    /// Kind of value this attribute holds
    #[serde(rename = "type")]
    pub kind: ValueKind,

    /// What does this attribute mean?
    #[serde(default)]
    pub description: String,

    /// Optional: example values
    #[serde(default)]
    pub examples: Vec<String>,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        AttributeDefinition {
            name: name.into(),
            kind,
            description: String::new(),
            examples: Vec::new(),
        }
    }

    /// Builder: add description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: add example
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================
