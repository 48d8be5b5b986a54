//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};

use protocol_module::config::ModuleConfig;
use protocol_module::protocol::{parse_json, Protocol};
use protocol_module::{HandlerMap, Module, ModuleBuilder, RequestContext};

pub const API_KEY: &str = "abc";

pub const ITEMS_PROTOCOL: &str = r#"{
    "getItem": {
        "path": "/item/:id",
        "method": "GET",
        "authorized": true,
        "params": { "id": "string" },
        "response": {
            "success": { "status": 200, "msg": "found {name}", "body": { "id": "", "name": "" } },
            "error": { "notFound": { "status": 404, "msg": "no item {id}" } }
        }
    },
    "deleteItem": {
        "path": "/item/:id",
        "method": "DELETE",
        "authorized": true,
        "params": { "id": "string" },
        "response": { "success": { "status": 204 } }
    },
    "listItems": {
        "path": "/items/:page",
        "method": "GET",
        "params": { "page": { "required": false } },
        "response": { "success": { "status": 200, "body": [{ "id": "" }] } }
    },
    "createItem": {
        "path": "/item",
        "method": "POST",
        "params": { "itemName": "string", "ownerId": { "required": false } },
        "response": {
            "success": { "status": 201, "msg": "created {itemName}", "body": { "id": "", "itemName": "" } }
        }
    },
    "lost": {
        "path": "/lost",
        "method": "GET",
        "response": { "success": { "status": 200 } }
    },
    "explode": {
        "path": "/explode",
        "method": "GET",
        "response": { "success": { "status": 200 } }
    }
}"#;

pub fn items_protocol() -> Arc<Protocol> {
    Arc::new(parse_json("items", ITEMS_PROTOCOL).unwrap())
}

async fn get_item(ctx: RequestContext) {
    let id = ctx.params().str("id").unwrap_or_default().to_string();
    match id.as_str() {
        "42" => ctx.success(json!({ "id": id, "name": "widget" })),
        "partial" => ctx.success(json!({ "id": id })),
        _ => ctx.error("notFound", json!({ "id": id })),
    }
}

async fn list_items(ctx: RequestContext) {
    if ctx.params().str("page") == Some("broken") {
        ctx.success(json!({ "id": "1" }));
    } else {
        ctx.success(json!([{ "id": "1" }, { "id": "2" }]));
    }
}

async fn create_item(ctx: RequestContext) {
    let name = ctx.params().get("itemName").cloned().unwrap_or(Value::Null);
    let owner = ctx.params().get("ownerId").cloned().unwrap_or(Value::Null);
    ctx.success(json!({ "id": "new", "itemName": name, "ownerId": owner }));
}

async fn explode(ctx: RequestContext) {
    let _held = ctx;
    panic!("handler exploded");
}

pub fn items_handlers() -> HandlerMap {
    HandlerMap::new()
        .on("getItem", get_item)
        .on("deleteItem", |ctx: RequestContext| async move { ctx.success(Value::Null) })
        .on("listItems", list_items)
        .on("createItem", create_item)
        .on("lost", |ctx: RequestContext| async move { drop(ctx) })
        .on("explode", explode)
        .on("unknownThing", |ctx: RequestContext| async move { ctx.success(Value::Null) })
}

pub fn items_config(port: u16) -> ModuleConfig {
    ModuleConfig::new("items", port)
        .with_host("127.0.0.1")
        .with_api_key(API_KEY)
}

pub fn items_builder(port: u16) -> ModuleBuilder {
    Module::builder(items_config(port))
        .protocol(items_protocol())
        .handlers(items_handlers())
}

pub fn items_module(port: u16) -> Module {
    items_builder(port).build()
}

/// Client without connection reuse, so a stopped listener is observed at once.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

pub fn request(method: &str, uri: &str, auth: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Status and parsed body; an empty body reads as `Value::Null`.
pub async fn read(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        (status, Value::Null)
    } else {
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}
