//! Tool parameter schemas and argument validation.

use serde_json::{Map, Number, Value, json};

use crate::ToolError;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Number,
    Integer,
    String,
    Boolean,
}

impl ParamType {
    fn json_type(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Integer => "integer",
            Self::String => "string",
            Self::Boolean => "boolean",
        }
    }

    /// Normalize a supplied value to this type.
    ///
    /// Local models often quote numbers and booleans, so string forms of
    /// those are accepted and converted.
    fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (Self::Number, Value::Number(_)) => Some(value.clone()),
            (Self::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            (Self::Integer, Value::Number(n)) => n.as_i64().map(Value::from),
            (Self::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (Self::String, Value::String(_)) => Some(value.clone()),
            (Self::Boolean, Value::Bool(_)) => Some(value.clone()),
            (Self::Boolean, Value::String(s)) => match s.trim() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A single declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSchema {
    pub name: String,
    pub kind: ParamType,
    pub description: String,
    pub required: bool,
}

impl ParamSchema {
    pub fn required(name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Name, description and parameters of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSchema>,
}

impl ToolDeclaration {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, param: ParamSchema) -> Self {
        self.params.push(param);
        self
    }

    /// JSON Schema for the tool's input object.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({"type": p.kind.json_type(), "description": p.description}),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    pub fn to_tool(&self) -> mcp::Tool {
        mcp::Tool {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            input_schema: self.input_schema(),
        }
    }

    /// Check supplied arguments against the declared parameters.
    pub fn validate(&self, args: &Map<String, Value>) -> Result<Arguments, ToolError> {
        if let Some(unknown) = args
            .keys()
            .find(|key| !self.params.iter().any(|p| &p.name == *key))
        {
            return Err(ToolError::invalid_arguments(
                &self.name,
                format!("unknown parameter '{unknown}'"),
            ));
        }

        let mut values = Map::new();
        for param in &self.params {
            match args.get(&param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(ToolError::invalid_arguments(
                        &self.name,
                        format!("missing required parameter '{}'", param.name),
                    ));
                }
                None | Some(Value::Null) => {}
                Some(value) => {
                    let normalized = param.kind.coerce(value).ok_or_else(|| {
                        ToolError::invalid_arguments(
                            &self.name,
                            format!(
                                "parameter '{}' must be a {}, got {value}",
                                param.name,
                                param.kind.json_type()
                            ),
                        )
                    })?;
                    values.insert(param.name.clone(), normalized);
                }
            }
        }

        Ok(Arguments {
            tool: self.name.clone(),
            values,
        })
    }
}

/// Validated, type-normalized arguments for one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct Arguments {
    tool: String,
    values: Map<String, Value>,
}

impl Arguments {
    pub fn number(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    pub fn require_number(&self, name: &str) -> Result<f64, ToolError> {
        self.number(name).ok_or_else(|| {
            ToolError::invalid_arguments(&self.tool, format!("missing number '{name}'"))
        })
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declaration() -> ToolDeclaration {
        ToolDeclaration::new("getTemperature", "Get the temperature")
            .param(ParamSchema::required("latitude", ParamType::Number, "The location latitude"))
            .param(ParamSchema::required("longitude", ParamType::Number, "The location longitude"))
            .param(ParamSchema::optional("units", ParamType::String, "Units"))
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn input_schema_lists_required_params() {
        let schema = declaration().input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["latitude"]["type"], "number");
        assert_eq!(schema["required"], json!(["latitude", "longitude"]));
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let validated = declaration()
            .validate(&args(json!({"latitude": "40.6317", "longitude": 22.9353})))
            .unwrap();
        assert_eq!(validated.number("latitude"), Some(40.6317));
        assert_eq!(validated.number("longitude"), Some(22.9353));
        assert_eq!(validated.string("units"), None);
    }

    #[test]
    fn rejects_missing_required() {
        let err = declaration()
            .validate(&args(json!({"latitude": 1.0})))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { ref reason, .. } if reason.contains("longitude")));
    }

    #[test]
    fn rejects_null_for_required() {
        let err = declaration()
            .validate(&args(json!({"latitude": 1.0, "longitude": null})))
            .unwrap_err();
        assert!(err.is_call_fault());
    }

    #[test]
    fn rejects_unknown_params() {
        let err = declaration()
            .validate(&args(json!({"latitude": 1.0, "longitude": 2.0, "city": "X"})))
            .unwrap_err();
        assert_eq!(
            err,
            ToolError::invalid_arguments("getTemperature", "unknown parameter 'city'")
        );
    }

    #[test]
    fn rejects_wrong_types() {
        let err = declaration()
            .validate(&args(json!({"latitude": "north", "longitude": 2.0})))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { ref reason, .. } if reason.contains("must be a number")));
    }

    #[test]
    fn coerces_integer_and_boolean_strings() {
        assert_eq!(ParamType::Integer.coerce(&json!("42")), Some(json!(42)));
        assert_eq!(ParamType::Integer.coerce(&json!(4.5)), None);
        assert_eq!(ParamType::Boolean.coerce(&json!("true")), Some(json!(true)));
        assert_eq!(ParamType::String.coerce(&json!(1)), None);
    }
}
