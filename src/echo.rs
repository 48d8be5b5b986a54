//! Echo handlers.
//!
//! Answer every endpoint of a protocol with a body that satisfies its declared
//! shape, filled from the request params. Used by the `protocol-module` binary
//! to stand up a mock of any protocol.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::http::context::RequestContext;
use crate::http::params::Params;
use crate::protocol::{BodyShape, Protocol};
use crate::routing::HandlerMap;

/// One echo handler per endpoint of every protocol.
pub fn echo_handlers(protocols: &[Arc<Protocol>]) -> HandlerMap {
    let mut handlers = HandlerMap::new();
    for protocol in protocols {
        for (name, spec) in protocol.endpoints() {
            if handlers.contains(name) {
                continue;
            }
            let shape = spec.response.success.body.clone();
            handlers.insert(name, move |ctx: RequestContext| {
                let body = echo_body(shape.as_ref(), ctx.params());
                async move { ctx.success(body) }
            });
        }
    }
    handlers
}

/// A body matching `shape`, built from `params`. Declared keys without a
/// matching param are set to `null`.
pub fn echo_body(shape: Option<&BodyShape>, params: &Params) -> Option<Value> {
    let item = |keys: &[String]| {
        let mut object = Map::new();
        for key in keys {
            object.insert(key.clone(), params.get(key).cloned().unwrap_or(Value::Null));
        }
        Value::Object(object)
    };

    match shape? {
        BodyShape::Object(keys) => Some(item(keys)),
        BodyShape::Array(keys) => Some(Value::Array(vec![item(keys)])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        Params::from(value.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn object_shape_is_filled_from_params() {
        let shape = BodyShape::Object(vec!["id".into(), "name".into()]);
        let body = echo_body(Some(&shape), &params(json!({ "id": "42" }))).unwrap();
        assert_eq!(body, json!({ "id": "42", "name": null }));
        assert!(shape.check(Some(&body)).is_ok());
    }

    #[test]
    fn array_shape_wraps_one_item() {
        let shape = BodyShape::Array(vec!["id".into()]);
        let body = echo_body(Some(&shape), &params(json!({ "id": "1", "extra": true }))).unwrap();
        assert_eq!(body, json!([{ "id": "1" }]));
        assert!(shape.check(Some(&body)).is_ok());
    }

    #[test]
    fn no_shape_no_body() {
        assert_eq!(echo_body(None, &params(json!({ "id": "1" }))), None);
    }

    #[test]
    fn handlers_cover_every_endpoint() {
        let protocol: Protocol = crate::protocol::parse_json(
            "items",
            r#"{
                "getItem": {
                    "path": "/item/:id", "method": "GET", "params": { "id": "string" },
                    "response": { "success": { "status": 200, "body": { "id": "" } } }
                },
                "deleteItem": {
                    "path": "/item/:id", "method": "DELETE", "params": { "id": "string" },
                    "response": { "success": { "status": 204 } }
                }
            }"#,
        )
        .unwrap();
        let handlers = echo_handlers(&[Arc::new(protocol)]);
        assert_eq!(
            handlers.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            vec!["deleteItem", "getItem"]
        );
    }
}
