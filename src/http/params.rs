//! Parameter extraction, normalization and validation.
//!
//! # Responsibilities
//! - Read params from the endpoint's transport (query string or JSON body),
//!   merged with path captures
//! - Normalize incoming names to the protocol's canonical casing
//! - Reject the request on the first missing required param
//!
//! # Design Decisions
//! - Path captures win over query/body values with the same name
//! - Names match after lower-casing and dropping `_`, `-` and spaces
//! - Unknown params are passed through untouched
//! - Only the first missing param is reported

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use crate::protocol::canonical_key;
use crate::protocol::{EndpointSpec, Transport};
use crate::routing::endpoint::CompiledEndpoint;

/// Validated, normalized request parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// String value of a param; `None` for absent or non-string values.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Deserialize the params into a typed struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Why a request was rejected before reaching its handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Malformed {
    /// A required param is absent.
    Missing(String),
    /// The body is not a JSON object.
    InvalidBody,
}

impl Malformed {
    /// Field named in the malformed-request message.
    pub fn field(&self) -> &str {
        match self {
            Malformed::Missing(name) => name,
            Malformed::InvalidBody => "body",
        }
    }
}

/// Collect, normalize and validate the params of one request.
pub fn extract(
    endpoint: &CompiledEndpoint,
    path: HashMap<String, String>,
    query: HashMap<String, String>,
    body: &[u8],
) -> Result<Params, Malformed> {
    let mut raw = Map::new();

    match endpoint.transport() {
        Transport::Query => {
            for (key, value) in query {
                raw.insert(key, Value::String(value));
            }
        }
        Transport::Body => {
            if !body.iter().all(u8::is_ascii_whitespace) {
                match serde_json::from_slice::<Value>(body) {
                    Ok(Value::Object(map)) => raw.extend(map),
                    _ => return Err(Malformed::InvalidBody),
                }
            }
        }
    }

    let canonical = |key: String| match endpoint.canonical_name(&key) {
        Some(declared) => declared.to_string(),
        None => key,
    };

    let mut params = Map::new();
    for (key, value) in raw {
        params.insert(canonical(key), value);
    }
    // Captures go last so the routed value always wins.
    for (key, value) in path {
        params.insert(canonical(key), Value::String(value));
    }
    let params = Params(params);

    validate(endpoint.spec(), &params)?;
    Ok(params)
}

/// Every param not explicitly `required: false` must be present.
pub fn validate(spec: &EndpointSpec, params: &Params) -> Result<(), Malformed> {
    match spec.required_params().find(|name| !params.contains(name)) {
        Some(missing) => Err(Malformed::Missing(missing.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::StandardErrors;
    use serde_json::json;
    use std::sync::Arc;

    fn endpoint(spec: Value) -> CompiledEndpoint {
        CompiledEndpoint::compile(
            Arc::from("items"),
            "items",
            "test",
            serde_json::from_value(spec).unwrap(),
            Arc::new(StandardErrors::default()),
        )
    }

    fn query_endpoint() -> CompiledEndpoint {
        endpoint(json!({
            "path": "/item/:itemId",
            "method": "GET",
            "params": {
                "itemId": "string",
                "pageSize": { "required": false },
                "ownerName": { "required": true }
            },
            "response": { "success": { "status": 200 } }
        }))
    }

    fn body_endpoint() -> CompiledEndpoint {
        endpoint(json!({
            "path": "/item",
            "method": "POST",
            "params": { "displayName": "string", "tags": { "required": false } },
            "response": { "success": { "status": 201 } }
        }))
    }

    fn map(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn canonical_keys_ignore_case_and_separators() {
        assert_eq!(canonical_key("itemId"), "itemid");
        assert_eq!(canonical_key("item_id"), "itemid");
        assert_eq!(canonical_key("Item-ID"), "itemid");
    }

    #[test]
    fn query_params_are_normalized() {
        let endpoint = query_endpoint();
        let params = extract(
            &endpoint,
            map(&[("itemId", "42")]),
            map(&[("owner_name", "ada"), ("page-size", "10"), ("extra", "x")]),
            b"",
        )
        .unwrap();

        assert_eq!(params.str("itemId"), Some("42"));
        assert_eq!(params.str("ownerName"), Some("ada"));
        assert_eq!(params.str("pageSize"), Some("10"));
        assert_eq!(params.str("extra"), Some("x"));
    }

    #[test]
    fn first_missing_param_is_reported() {
        let endpoint = query_endpoint();
        let err = extract(&endpoint, HashMap::new(), HashMap::new(), b"").unwrap_err();
        assert_eq!(err, Malformed::Missing("itemId".into()));

        let err = extract(&endpoint, map(&[("itemId", "1")]), HashMap::new(), b"").unwrap_err();
        assert_eq!(err.field(), "ownerName");
    }

    #[test]
    fn path_captures_override_query() {
        let endpoint = query_endpoint();
        let params = extract(
            &endpoint,
            map(&[("itemId", "from-path")]),
            map(&[("item_id", "from-query"), ("ownerName", "ada")]),
            b"",
        )
        .unwrap();
        assert_eq!(params.str("itemId"), Some("from-path"));
    }

    #[test]
    fn path_captures_override_body() {
        let endpoint = endpoint(json!({
            "path": "/item/:itemId",
            "method": "PUT",
            "params": { "itemId": "string" },
            "response": { "success": { "status": 200 } }
        }));
        let params = extract(
            &endpoint,
            map(&[("itemId", "from-path")]),
            HashMap::new(),
            br#"{ "item_id": "from-body", "ItemId": "also-body" }"#,
        )
        .unwrap();
        assert_eq!(params.str("itemId"), Some("from-path"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn body_params_keep_json_types() {
        let endpoint = body_endpoint();
        let params = extract(
            &endpoint,
            HashMap::new(),
            map(&[("displayName", "ignored-query")]),
            br#"{ "display_name": "widget", "tags": ["a"] }"#,
        )
        .unwrap();
        assert_eq!(params.str("displayName"), Some("widget"));
        assert_eq!(params.get("tags"), Some(&json!(["a"])));
    }

    #[test]
    fn body_must_be_an_object() {
        let endpoint = body_endpoint();
        assert_eq!(
            extract(&endpoint, HashMap::new(), HashMap::new(), b"[1, 2]"),
            Err(Malformed::InvalidBody)
        );
        assert_eq!(
            extract(&endpoint, HashMap::new(), HashMap::new(), b"not json"),
            Err(Malformed::InvalidBody)
        );
        assert_eq!(
            extract(&endpoint, HashMap::new(), HashMap::new(), b"  "),
            Err(Malformed::Missing("displayName".into()))
        );
    }

    #[test]
    fn params_parse_into_structs() {
        #[derive(serde::Deserialize)]
        struct NewItem {
            #[serde(rename = "displayName")]
            display_name: String,
        }

        let params = Params::from(json!({ "displayName": "widget" }).as_object().unwrap().clone());
        let item: NewItem = params.parse().unwrap();
        assert_eq!(item.display_name, "widget");
    }
}
