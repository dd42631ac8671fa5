//! # Values
//!
//! Data types, typed literals, variable references and the expressions that
//! steps carry.

use crate::error::ValueError;
use crate::step::FunctionCall;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Prefix every variable reference carries on the wire
pub const VARIABLE_PREFIX: &str = "$$variables.";

/// Largest integer an f64 holds exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Declared type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "_types.String")]
    String,
    #[serde(rename = "_types.Number")]
    Number,
    #[serde(rename = "_types.Boolean")]
    Boolean,
}

impl DataType {
    pub const ALL: [DataType; 3] =
        [DataType::String, DataType::Number, DataType::Boolean];

    /// Fully-qualified type identifier, e.g. `_types.Number`
    pub fn identifier(&self) -> &'static str {
        match self {
            DataType::String => "_types.String",
            DataType::Number => "_types.Number",
            DataType::Boolean => "_types.Boolean",
        }
    }

    /// Short display label, e.g. `Number`
    pub fn label(&self) -> &'static str {
        match self {
            DataType::String => "String",
            DataType::Number => "Number",
            DataType::Boolean => "Boolean",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DataType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        DataType::ALL
            .into_iter()
            .find(|t| {
                t.identifier() == trimmed
                    || t.label().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| ValueError::UnknownDataType(trimmed.to_string()))
    }
}

/// A literal whose representation always matches its data type
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl TypedValue {
    pub fn data_type(&self) -> DataType {
        match self {
            TypedValue::String(_) => DataType::String,
            TypedValue::Number(_) => DataType::Number,
            TypedValue::Boolean(_) => DataType::Boolean,
        }
    }

    /// Initial value a fresh declaration of `data_type` gets
    pub fn default_for(data_type: DataType) -> Self {
        match data_type {
            DataType::String => TypedValue::String(String::new()),
            DataType::Number => TypedValue::Number(0.0),
            DataType::Boolean => TypedValue::Boolean(false),
        }
    }

    /// Coerces raw form input into a literal of `data_type`
    pub fn from_input(
        data_type: DataType,
        input: &str,
    ) -> Result<Self, ValueError> {
        let invalid = || ValueError::InvalidLiteral {
            data_type,
            input: input.to_string(),
        };
        match data_type {
            DataType::String => Ok(TypedValue::String(input.to_string())),
            DataType::Number => input
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(TypedValue::Number)
                .ok_or_else(invalid),
            DataType::Boolean => match input.trim() {
                "true" => Ok(TypedValue::Boolean(true)),
                "false" => Ok(TypedValue::Boolean(false)),
                _ => Err(invalid()),
            },
        }
    }

    /// Reads a JSON literal, rejecting one whose kind does not match `data_type`
    pub fn from_json(
        data_type: DataType,
        value: &Value,
    ) -> Result<Self, ValueError> {
        let typed = match (data_type, value) {
            (DataType::String, Value::String(s)) => {
                Some(TypedValue::String(s.clone()))
            }
            (DataType::Number, Value::Number(n)) => {
                n.as_f64().map(TypedValue::Number)
            }
            (DataType::Boolean, Value::Bool(b)) => Some(TypedValue::Boolean(*b)),
            _ => None,
        };
        typed.ok_or_else(|| ValueError::TypeMismatch {
            expected: data_type,
            found: value.clone(),
        })
    }

    /// Rejects a Number literal that has no JSON form (NaN or infinite)
    pub fn validate(&self) -> Result<(), ValueError> {
        match self {
            TypedValue::Number(n) if !n.is_finite() => Err(ValueError::InvalidLiteral {
                data_type: DataType::Number,
                input: n.to_string(),
            }),
            _ => Ok(()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::String(s) => Value::String(s.clone()),
            TypedValue::Number(n) => number_to_json(*n),
            TypedValue::Boolean(b) => Value::Bool(*b),
        }
    }

    /// Lossless conversion to another data type, if one exists
    pub fn convert(&self, target: DataType) -> Option<TypedValue> {
        match (self, target) {
            (value, target) if value.data_type() == target => Some(value.clone()),
            (TypedValue::String(s), DataType::Number) => {
                TypedValue::from_input(DataType::Number, s).ok()
            }
            (TypedValue::String(s), DataType::Boolean) => {
                TypedValue::from_input(DataType::Boolean, s).ok()
            }
            (TypedValue::Number(_) | TypedValue::Boolean(_), DataType::String) => {
                Some(TypedValue::String(self.to_string()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::String(s) => f.write_str(s),
            TypedValue::Number(n) => write!(f, "{}", number_to_json(*n)),
            TypedValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::String(value.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        TypedValue::String(value)
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        TypedValue::Number(value)
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        TypedValue::Boolean(value)
    }
}

/// Whole numbers are written as integers so `0` stays `0` on the wire.
fn number_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Rewrites whole-number floats anywhere in `value` as integers, so `5.0`
/// reads `5` the way the editor displays it
pub fn normalize_numbers(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => n.as_f64().map(number_to_json).unwrap_or(Value::Null),
        Value::Array(items) => Value::Array(items.iter().map(normalize_numbers).collect()),
        Value::Object(object) => Value::Object(
            object
                .iter()
                .map(|(key, item)| (key.clone(), normalize_numbers(item)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Reference to a declared variable, stored in its `$$variables.` form
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VariableRef(String);

impl VariableRef {
    /// Builds a reference from a bare name, keeping an existing prefix
    pub fn variable(name: &str) -> Self {
        if name.starts_with(VARIABLE_PREFIX) {
            Self(name.to_string())
        } else {
            Self(format!("{VARIABLE_PREFIX}{name}"))
        }
    }

    /// Recognises a prefixed reference string
    pub fn parse(raw: &str) -> Option<Self> {
        raw.strip_prefix(VARIABLE_PREFIX)
            .filter(|name| !name.is_empty())
            .map(|_| Self(raw.to_string()))
    }

    /// Bare variable name
    pub fn name(&self) -> &str {
        self.0.strip_prefix(VARIABLE_PREFIX).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Engine-internal variables such as `$$returns` or `$$iterations`
    pub fn is_internal(&self) -> bool {
        self.name().starts_with("$$")
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A function argument: a variable reference or a literal
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum Operand {
    Reference(VariableRef),
    Literal(Value),
}

impl Operand {
    pub fn reference(name: &str) -> Self {
        Operand::Reference(VariableRef::variable(name))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Operand::Literal(value.into())
    }

    /// Variable references this operand mentions, including ones embedded in
    /// array or object literals
    pub fn references(&self) -> Vec<VariableRef> {
        match self {
            Operand::Reference(r) => vec![r.clone()],
            Operand::Literal(value) => {
                let mut found = Vec::new();
                collect_embedded(value, &mut found);
                found
            }
        }
    }
}

fn collect_embedded(value: &Value, found: &mut Vec<VariableRef>) {
    match value {
        Value::String(s) => found.extend(VariableRef::parse(s)),
        Value::Array(items) => {
            items.iter().for_each(|item| collect_embedded(item, found))
        }
        Value::Object(map) => {
            map.values().for_each(|item| collect_embedded(item, found))
        }
        _ => {}
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        match &value {
            Value::String(s) => VariableRef::parse(s)
                .map(Operand::Reference)
                .unwrap_or(Operand::Literal(value)),
            _ => Operand::Literal(value),
        }
    }
}

impl From<Operand> for Value {
    fn from(operand: Operand) -> Self {
        match operand {
            Operand::Reference(r) => Value::String(r.0),
            Operand::Literal(value) => value,
        }
    }
}

impl From<VariableRef> for Operand {
    fn from(reference: VariableRef) -> Self {
        Operand::Reference(reference)
    }
}

impl Serialize for Operand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Operand::Reference(r) => r.serialize(serializer),
            Operand::Literal(value) => value.serialize(serializer),
        }
    }
}

/// Condition, collection, bound or assigned value of a step
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Call(Box<FunctionCall>),
    Operand(Operand),
}

impl Expression {
    pub fn reference(name: &str) -> Self {
        Expression::Operand(Operand::reference(name))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Operand(Operand::literal(value))
    }

    pub fn call(call: FunctionCall) -> Self {
        Expression::Call(Box::new(call))
    }

    pub fn references(&self) -> Vec<VariableRef> {
        match self {
            Expression::Call(call) => call.references(),
            Expression::Operand(operand) => operand.references(),
        }
    }
}

impl Default for Expression {
    fn default() -> Self {
        Expression::Operand(Operand::Literal(Value::Null))
    }
}

impl From<FunctionCall> for Expression {
    fn from(call: FunctionCall) -> Self {
        Expression::call(call)
    }
}

impl From<Operand> for Expression {
    fn from(operand: Operand) -> Self {
        Expression::Operand(operand)
    }
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Expression::Call(call) => call.serialize(serializer),
            Expression::Operand(operand) => operand.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let is_call = value
            .as_object()
            .is_some_and(|object| object.contains_key("call"));
        if is_call {
            serde_json::from_value::<FunctionCall>(value)
                .map(Expression::call)
                .map_err(serde::de::Error::custom)
        } else {
            Ok(Expression::Operand(Operand::from(value)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_input_coercion() {
        assert_eq!(
            TypedValue::from_input(DataType::Number, " 42 ").unwrap(),
            TypedValue::Number(42.0)
        );
        assert_eq!(
            TypedValue::from_input(DataType::Boolean, "true").unwrap(),
            TypedValue::Boolean(true)
        );
        assert!(matches!(
            TypedValue::from_input(DataType::Number, "forty"),
            Err(ValueError::InvalidLiteral { data_type: DataType::Number, .. })
        ));
        assert!(TypedValue::from_input(DataType::Boolean, "yes").is_err());
    }

    #[test]
    fn test_json_literal_must_match_type() {
        assert!(TypedValue::from_json(DataType::Boolean, &json!("true")).is_err());
        assert_eq!(
            TypedValue::from_json(DataType::Number, &json!(3)).unwrap(),
            TypedValue::Number(3.0)
        );
    }

    #[test]
    fn test_whole_numbers_stay_integers() {
        assert_eq!(TypedValue::Number(0.0).to_json(), json!(0));
        assert_eq!(TypedValue::Number(2.5).to_json(), json!(2.5));
        assert_eq!(TypedValue::Number(10.0).to_string(), "10");
    }

    #[test]
    fn test_non_finite_numbers_are_invalid() {
        assert!(TypedValue::Number(1.5).validate().is_ok());
        assert!(matches!(
            TypedValue::from(f64::NAN).validate(),
            Err(ValueError::InvalidLiteral { data_type: DataType::Number, .. })
        ));
        assert!(TypedValue::from(f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_normalize_numbers() {
        assert_eq!(normalize_numbers(&json!(40.0)).to_string(), "40");
        assert_eq!(normalize_numbers(&json!(2.5)).to_string(), "2.5");
        assert_eq!(
            normalize_numbers(&json!({ "xs": [1.0, 2, "3.0"] })),
            json!({ "xs": [1, 2, "3.0"] })
        );
    }

    #[test]
    fn test_convert_between_types() {
        let text = TypedValue::from("12");
        assert_eq!(text.convert(DataType::Number), Some(TypedValue::Number(12.0)));
        assert_eq!(TypedValue::from("abc").convert(DataType::Number), None);
        assert_eq!(
            TypedValue::Boolean(true).convert(DataType::String),
            Some(TypedValue::from("true"))
        );
        assert_eq!(TypedValue::Boolean(true).convert(DataType::Number), None);
    }

    #[test]
    fn test_data_type_parsing() {
        assert_eq!("_types.Number".parse::<DataType>().unwrap(), DataType::Number);
        assert_eq!("boolean".parse::<DataType>().unwrap(), DataType::Boolean);
        assert!("_types.Date".parse::<DataType>().is_err());
    }

    #[test]
    fn test_operand_recognises_references() {
        let operand: Operand = serde_json::from_value(json!("$$variables.index")).unwrap();
        assert_eq!(operand, Operand::reference("index"));

        let literal: Operand = serde_json::from_value(json!("index")).unwrap();
        assert_eq!(literal, Operand::literal("index"));

        let embedded = Operand::literal(json!(["$$variables.a", 1, {"b": "$$variables.b"}]));
        let names: Vec<_> = embedded.references().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_expression_wire_forms() {
        let call: Expression = serde_json::from_value(json!({
            "call": "_functions.Math.LessThan",
            "arguments": { "a": "$$variables.index", "b": 10 }
        }))
        .unwrap();
        assert!(matches!(call, Expression::Call(_)));
        assert_eq!(call.references(), vec![VariableRef::variable("index")]);

        let literal: Expression = serde_json::from_value(json!(true)).unwrap();
        assert_eq!(serde_json::to_value(&literal).unwrap(), json!(true));
    }
}
