//! Protocol schema definitions.
//!
//! A protocol is passive data: a named map of endpoint name to [`EndpointSpec`].
//! All types deserialize from JSON or TOML protocol files.

use std::collections::BTreeMap;
use std::fmt;

use axum::routing::MethodFilter;
use serde::Deserialize;
use serde_json::{Map, Value};

/// A named API contract. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Protocol {
    name: String,
    endpoints: BTreeMap<String, EndpointSpec>,
}

impl Protocol {
    /// Create a protocol from already parsed endpoints.
    pub fn new(name: impl Into<String>, endpoints: BTreeMap<String, EndpointSpec>) -> Self {
        Self {
            name: name.into(),
            endpoints,
        }
    }

    /// Protocol name (usually the file stem it was loaded from).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up an endpoint by name.
    pub fn endpoint(&self, name: &str) -> Option<&EndpointSpec> {
        self.endpoints.get(name)
    }

    /// Iterate endpoints in name order.
    pub fn endpoints(&self) -> impl Iterator<Item = (&str, &EndpointSpec)> {
        self.endpoints.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// One named operation within a protocol.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointSpec {
    /// Path template, e.g. `/item/:id` or `/item/{id}`.
    pub path: String,

    /// HTTP method.
    pub method: HttpMethod,

    /// Whether the Auth Gate guards this endpoint.
    #[serde(default)]
    pub authorized: bool,

    /// Where parameters are read from. Defaults by method.
    #[serde(default)]
    pub transport: Option<Transport>,

    /// Declared parameters.
    #[serde(default)]
    pub params: BTreeMap<String, ParamSpec>,

    /// Success and error contract.
    pub response: ResponseSpec,
}

impl EndpointSpec {
    /// Effective transport: the declared one, else `query` for GET/DELETE and
    /// `body` for everything else.
    pub fn transport(&self) -> Transport {
        self.transport
            .unwrap_or_else(|| self.method.default_transport())
    }

    /// A param is required unless it is explicitly marked `required: false`.
    pub fn is_required(&self, name: &str) -> bool {
        self.params.get(name).map(|p| p.required).unwrap_or(false)
    }

    /// Names of all required params, in name order.
    pub fn required_params(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
    }
}

/// HTTP methods a protocol may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// The axum method filter for this method.
    pub fn filter(&self) -> MethodFilter {
        match self {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Post => MethodFilter::POST,
            HttpMethod::Put => MethodFilter::PUT,
            HttpMethod::Patch => MethodFilter::PATCH,
            HttpMethod::Delete => MethodFilter::DELETE,
        }
    }

    fn default_transport(&self) -> Transport {
        match self {
            HttpMethod::Get | HttpMethod::Delete => Transport::Query,
            _ => Transport::Body,
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(format!("unsupported HTTP method: {}", value)),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter source for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// JSON object request body (plus path captures).
    Body,
    /// Path captures plus query string.
    #[serde(alias = "path")]
    Query,
}

/// Declared parameter.
///
/// Accepts either a bare type name (`id = "string"`) or a table
/// (`id = { required = false }`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawParam")]
pub struct ParamSpec {
    pub required: bool,
    pub kind: Option<String>,
}

/// Canonical form used to match incoming names against declared ones.
pub fn canonical_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

impl Default for ParamSpec {
    fn default() -> Self {
        Self {
            required: true,
            kind: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawParam {
    Kind(String),
    Spec {
        #[serde(default = "default_required")]
        required: bool,
        #[serde(default, rename = "type")]
        kind: Option<String>,
    },
}

fn default_required() -> bool {
    true
}

impl From<RawParam> for ParamSpec {
    fn from(raw: RawParam) -> Self {
        match raw {
            RawParam::Kind(kind) => ParamSpec {
                required: true,
                kind: Some(kind),
            },
            RawParam::Spec { required, kind } => ParamSpec { required, kind },
        }
    }
}

/// Response contract of an endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseSpec {
    pub success: SuccessSpec,

    /// Named business errors, keyed by error name.
    #[serde(default)]
    pub error: BTreeMap<String, ErrorSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuccessSpec {
    pub status: u16,

    /// Message template logged on success.
    #[serde(default, alias = "message")]
    pub msg: String,

    /// Expected body shape; `None` means a bare status is sent.
    #[serde(default)]
    pub body: Option<BodyShape>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorSpec {
    pub status: u16,

    /// Message template sent to the client as `error`.
    #[serde(default, alias = "message")]
    pub msg: String,
}

/// Declared shape of a success body.
///
/// An object in the protocol file declares an object result carrying its
/// keys; an array whose first element is an object declares an array result
/// whose elements carry those keys.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Value")]
pub enum BodyShape {
    Object(Vec<String>),
    Array(Vec<String>),
}

impl TryFrom<Value> for BodyShape {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(BodyShape::Object(map.keys().cloned().collect())),
            Value::Array(items) => match items.first() {
                None => Ok(BodyShape::Array(Vec::new())),
                Some(Value::Object(map)) => Ok(BodyShape::Array(map.keys().cloned().collect())),
                Some(_) => Err("array body schema must contain an object".to_string()),
            },
            _ => Err("body schema must be an object or an array".to_string()),
        }
    }
}

impl BodyShape {
    /// Keys every result object must carry.
    pub fn keys(&self) -> &[String] {
        match self {
            BodyShape::Object(keys) | BodyShape::Array(keys) => keys,
        }
    }

    /// Check a handler result against this shape.
    pub fn check(&self, result: Option<&Value>) -> Result<(), ShapeMismatch> {
        match (self, result) {
            (BodyShape::Object(keys), None | Some(Value::Null)) => {
                if keys.is_empty() {
                    Ok(())
                } else {
                    Err(ShapeMismatch::ExpectedObject {
                        missing: keys.clone(),
                    })
                }
            }
            (BodyShape::Object(keys), Some(Value::Object(map))) => {
                let missing = missing_keys(keys, map);
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(ShapeMismatch::MissingKeys(missing))
                }
            }
            (BodyShape::Object(keys), Some(_)) => Err(ShapeMismatch::ExpectedObject {
                missing: keys.clone(),
            }),
            (BodyShape::Array(keys), Some(Value::Array(items))) => {
                let mut missing: Vec<String> = Vec::new();
                for item in items {
                    let absent = match item {
                        Value::Object(map) => missing_keys(keys, map),
                        _ => keys.clone(),
                    };
                    for key in absent {
                        if !missing.contains(&key) {
                            missing.push(key);
                        }
                    }
                }
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(ShapeMismatch::MissingKeys(missing))
                }
            }
            (BodyShape::Array(keys), _) => Err(ShapeMismatch::ExpectedArray {
                missing: keys.clone(),
            }),
        }
    }
}

fn missing_keys(keys: &[String], map: &Map<String, Value>) -> Vec<String> {
    keys.iter()
        .filter(|key| !map.contains_key(key.as_str()))
        .cloned()
        .collect()
}

/// Why a success result was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeMismatch {
    ExpectedObject { missing: Vec<String> },
    ExpectedArray { missing: Vec<String> },
    MissingKeys(Vec<String>),
}

impl ShapeMismatch {
    /// Declared keys the result failed to provide.
    pub fn missing(&self) -> &[String] {
        match self {
            ShapeMismatch::ExpectedObject { missing }
            | ShapeMismatch::ExpectedArray { missing }
            | ShapeMismatch::MissingKeys(missing) => missing,
        }
    }
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeMismatch::ExpectedObject { missing } if missing.is_empty() => {
                write!(f, "expected an object")
            }
            ShapeMismatch::ExpectedObject { missing } => {
                write!(f, "expected an object with keys: {}", missing.join(", "))
            }
            ShapeMismatch::ExpectedArray { missing } if missing.is_empty() => {
                write!(f, "expected an array")
            }
            ShapeMismatch::ExpectedArray { missing } => {
                write!(f, "expected an array of objects with keys: {}", missing.join(", "))
            }
            ShapeMismatch::MissingKeys(missing) => {
                write!(f, "missing keys: {}", missing.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn endpoint(value: Value) -> EndpointSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn params_default_to_required() {
        let spec = endpoint(json!({
            "path": "/item/:id",
            "method": "get",
            "params": { "id": "string", "verbose": { "required": false } },
            "response": { "success": { "status": 200 } }
        }));
        assert!(spec.is_required("id"));
        assert!(!spec.is_required("verbose"));
        assert_eq!(spec.required_params().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(spec.params["id"].kind.as_deref(), Some("string"));
    }

    #[test]
    fn transport_defaults_by_method() {
        let get = endpoint(json!({
            "path": "/a", "method": "GET", "response": { "success": { "status": 200 } }
        }));
        let post = endpoint(json!({
            "path": "/a", "method": "POST", "response": { "success": { "status": 201 } }
        }));
        let explicit = endpoint(json!({
            "path": "/a", "method": "POST", "transport": "path",
            "response": { "success": { "status": 201 } }
        }));
        assert_eq!(get.transport(), Transport::Query);
        assert_eq!(post.transport(), Transport::Body);
        assert_eq!(explicit.transport(), Transport::Query);
    }

    #[test]
    fn rejects_unknown_method() {
        let result: Result<EndpointSpec, _> = serde_json::from_value(json!({
            "path": "/a", "method": "TRACE", "response": { "success": { "status": 200 } }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn body_shape_from_schema() {
        let object: BodyShape = serde_json::from_value(json!({ "id": "", "name": "" })).unwrap();
        assert_eq!(object, BodyShape::Object(vec!["id".into(), "name".into()]));

        let array: BodyShape = serde_json::from_value(json!([{ "id": "" }])).unwrap();
        assert_eq!(array, BodyShape::Array(vec!["id".into()]));

        assert!(serde_json::from_value::<BodyShape>(json!("id")).is_err());
        assert!(serde_json::from_value::<BodyShape>(json!(["id"])).is_err());
    }

    #[test]
    fn object_shape_reports_missing_keys() {
        let shape = BodyShape::Object(vec!["id".into(), "name".into()]);
        assert!(shape.check(Some(&json!({ "id": "42", "name": "widget" }))).is_ok());

        let err = shape.check(Some(&json!({ "id": "42" }))).unwrap_err();
        assert_eq!(err, ShapeMismatch::MissingKeys(vec!["name".into()]));
        assert_eq!(err.to_string(), "missing keys: name");

        assert!(matches!(
            shape.check(Some(&json!([{ "id": "42", "name": "w" }]))),
            Err(ShapeMismatch::ExpectedObject { .. })
        ));
        assert!(shape.check(None).is_err());
        assert!(BodyShape::Object(Vec::new()).check(None).is_ok());
    }

    #[test]
    fn array_shape_requires_array() {
        let shape = BodyShape::Array(vec!["id".into()]);
        assert!(shape.check(Some(&json!([{ "id": 1 }, { "id": 2 }]))).is_ok());
        assert!(shape.check(Some(&json!([]))).is_ok());

        let err = shape.check(Some(&json!([{ "id": 1 }, { "other": 2 }]))).unwrap_err();
        assert_eq!(err.missing(), ["id".to_string()]);

        for non_array in [json!({ "id": 1 }), json!("x"), Value::Null] {
            assert!(matches!(
                shape.check(Some(&non_array)),
                Err(ShapeMismatch::ExpectedArray { .. })
            ));
        }
        assert!(BodyShape::Array(Vec::new()).check(None).is_err());
    }
}
