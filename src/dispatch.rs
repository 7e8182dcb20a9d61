//! Dispatcher/binder: registers every controller action on an axum router and runs
//! the per-request cycle (authorize, decode, validate, invoke, respond). All errors
//! leave through one translator.

use crate::action::{Action, ActionMeta, Method};
use crate::controller::Controller;
use crate::error::{ActionError, BindError, ErrorTranslator, Issue};
use crate::response::ResponsePlan;
use crate::schema::{ObjectSchema, SchemaKind};
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Uri},
    response::{IntoResponse, Response},
    routing::MethodRouter,
    Json, Router,
};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;

/// Resolves the caller identity from the raw `Authorization` header value.
/// `Ok(None)` means "no valid credential"; errors are reserved for internal failures.
#[async_trait]
pub trait AuthValidator: Send + Sync {
    async fn validate(&self, credential: Option<&str>) -> Result<Option<String>, ActionError>;
}

/// Never yields an identity: only public actions are reachable.
#[derive(Clone, Copy, Debug, Default)]
pub struct DenyAll;

#[async_trait]
impl AuthValidator for DenyAll {
    async fn validate(&self, _credential: Option<&str>) -> Result<Option<String>, ActionError> {
        Ok(None)
    }
}

/// Adapts an async closure to [`AuthValidator`]. Built with [`auth_fn`].
pub struct FnAuthValidator<F>(F);

pub fn auth_fn<F, Fut>(f: F) -> FnAuthValidator<F>
where
    F: Fn(Option<String>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<String>, ActionError>> + Send,
{
    FnAuthValidator(f)
}

#[async_trait]
impl<F, Fut> AuthValidator for FnAuthValidator<F>
where
    F: Fn(Option<String>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<String>, ActionError>> + Send,
{
    async fn validate(&self, credential: Option<&str>) -> Result<Option<String>, ActionError> {
        (self.0)(credential.map(str::to_string)).await
    }
}

/// Token part of a `Bearer <token>` credential.
pub fn bearer_token(credential: Option<&str>) -> Option<&str> {
    credential
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// One `(method, route)` binding created at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisteredRoute {
    pub method: Method,
    pub route: String,
    pub controller: String,
    pub action: String,
    pub is_public: bool,
}

/// Route table built once by [`bind`]; read-only afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<RegisteredRoute>,
}

impl RouteTable {
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredRoute> {
        self.routes.iter()
    }

    pub fn find(&self, method: Method, route: &str) -> Option<&RegisteredRoute> {
        self.routes.iter().find(|r| r.method == method && r.route == route)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// An action prepared for serving: response plan decided up front.
struct BoundAction {
    name: String,
    action: Action,
    plan: ResponsePlan,
}

impl BoundAction {
    fn compile(controller: &str, name: &str, action: &Action) -> Self {
        BoundAction {
            name: bound_name(controller, name),
            action: action.clone(),
            plan: ResponsePlan::for_output(&action.meta().output),
        }
    }
}

fn bound_name(controller: &str, action: &str) -> String {
    format!("{}.{}", controller, action)
}

/// Per-request machinery shared by all routes. Holds no per-request state.
#[derive(Clone)]
pub struct Dispatcher {
    auth: Arc<dyn AuthValidator>,
    translate: ErrorTranslator,
}

impl Dispatcher {
    pub fn new(auth: Arc<dyn AuthValidator>, translate: ErrorTranslator) -> Self {
        Dispatcher { auth, translate }
    }

    async fn dispatch(&self, bound: &BoundAction, request: Request) -> Response {
        let span = tracing::info_span!(
            "action",
            method = %bound.action.method(),
            route = %bound.action.route(),
            name = %bound.name,
        );
        async move {
            match self.run(bound, request).await {
                Ok(response) => response,
                Err(err) => self.error_response(&err),
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, bound: &BoundAction, request: Request) -> Result<Response, ActionError> {
        let (parts, body) = request.into_parts();
        let credential = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        let caller = self.auth.validate(credential).await?;
        let meta = bound.action.meta();
        if !meta.is_public && caller.is_none() {
            return Err(ActionError::unauthorized());
        }

        let input = decode(meta, parts, body).await?;
        let output = bound.action.invoke(caller, Value::Object(input)).await?;
        Ok(bound.plan.render(output))
    }

    /// Single exit point for failures: logs by kind, then translates.
    pub fn error_response(&self, err: &ActionError) -> Response {
        match err {
            ActionError::Validation(_) => tracing::debug!(error = %err, "validation failed"),
            ActionError::Unauthorized(_) => tracing::debug!(error = %err, "unauthorized"),
            ActionError::NotFound(_) | ActionError::InvalidToken(_) | ActionError::Request { .. } => {
                tracing::info!(error = %err, "request failed")
            }
            ActionError::Unexpected(inner) => tracing::error!(error = ?inner, "unexpected error"),
        }
        let (status, body) = (self.translate)(err);
        (status, Json(body)).into_response()
    }

    fn not_found(&self, method: &axum::http::Method, uri: &Uri) -> Response {
        self.error_response(&ActionError::not_found(format!("Route {}:{} not found", method, uri.path())))
    }
}

/// Decodes every declared source and merges them: headers, then params, then query,
/// then body, later sources overwriting same-named fields. Undeclared sources are ignored.
async fn decode(meta: &ActionMeta, mut parts: Parts, body: Body) -> Result<Map<String, Value>, ActionError> {
    let mut merged = Map::new();
    let mut issues = Vec::new();

    if let Some(schema) = meta.headers.as_object() {
        let raw = header_object(schema, &parts.headers);
        collect("headers", schema.parse(Some(&Value::Object(raw))), &mut merged, &mut issues);
    }
    if let Some(schema) = meta.params.as_object() {
        match Path::<HashMap<String, String>>::from_request_parts(&mut parts, &()).await {
            Ok(Path(raw)) => {
                let raw = raw.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
                collect("params", schema.parse(Some(&Value::Object(raw))), &mut merged, &mut issues);
            }
            Err(rejection) => issues.push(Issue::new("params", rejection.body_text())),
        }
    }
    if let Some(schema) = meta.query.as_object() {
        match query_object(schema, &parts.uri) {
            Ok(raw) => collect("query", schema.parse(Some(&Value::Object(raw))), &mut merged, &mut issues),
            Err(issue) => issues.push(issue),
        }
    }
    if let Some(schema) = meta.body.as_object() {
        let request = Request::from_parts(parts, body);
        let bytes = Bytes::from_request(request, &())
            .await
            .map_err(|rejection| ActionError::request(rejection.status(), rejection.body_text()))?;
        match body_value(&bytes) {
            Ok(raw) => collect("body", schema.parse(raw.as_ref()), &mut merged, &mut issues),
            Err(issue) => issues.push(issue),
        }
    }

    if issues.is_empty() {
        Ok(merged)
    } else {
        Err(ActionError::Validation(issues))
    }
}

fn collect(
    source: &str,
    parsed: Result<Map<String, Value>, Vec<Issue>>,
    merged: &mut Map<String, Value>,
    issues: &mut Vec<Issue>,
) {
    match parsed {
        Ok(fields) => merged.extend(fields),
        Err(found) => issues.extend(found.into_iter().map(|issue| issue.prefixed(source))),
    }
}

/// Declared header fields only, matched case-insensitively.
fn header_object(schema: &ObjectSchema, headers: &HeaderMap) -> Map<String, Value> {
    schema
        .shape()
        .iter()
        .filter_map(|(name, _)| {
            let value = headers.get(name)?.to_str().ok()?;
            Some((name.to_string(), Value::String(value.to_string())))
        })
        .collect()
}

/// Repeated keys become arrays; a single value is wrapped when the field is declared as an array.
fn query_object(schema: &ObjectSchema, uri: &Uri) -> Result<Map<String, Value>, Issue> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map_err(|rejection| Issue::new("query", rejection.body_text()))?;
    let mut map = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match map.get_mut(&key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                let is_array = matches!(
                    schema.shape().get(&key).map(|field| field.kind()),
                    Some(SchemaKind::Array(_))
                );
                let value = if is_array { Value::Array(vec![value]) } else { value };
                map.insert(key, value);
            }
        }
    }
    Ok(map)
}

/// Empty body means "no value".
fn body_value(bytes: &[u8]) -> Result<Option<Value>, Issue> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|e| Issue::new("body", format!("Invalid JSON: {}", e)))
}

/// Registers one route per action on `router` and installs the not-found fallback.
/// Fails before anything is served if a route is malformed or bound twice.
pub fn bind<'a, I>(router: Router, controllers: I, dispatcher: Dispatcher) -> Result<(Router, RouteTable), BindError>
where
    I: IntoIterator<Item = (&'a str, &'a Controller)>,
{
    let mut table = RouteTable::default();
    let mut seen = HashSet::new();
    let mut paths: Vec<(String, MethodRouter)> = Vec::new();
    // Same matcher axum routes with; a rejected insert would otherwise panic inside `Router::route`.
    let mut matcher = matchit::Router::<()>::new();

    for (controller_name, controller) in controllers {
        for (action_name, action) in controller.iter() {
            let route = action.route().to_string();
            if !route.starts_with('/') {
                return Err(BindError::InvalidRoute {
                    controller: controller_name.to_string(),
                    action: action_name.to_string(),
                    route,
                });
            }
            if !seen.insert((action.method(), route.clone())) {
                return Err(BindError::DuplicateRoute {
                    method: action.method(),
                    route,
                    controller: controller_name.to_string(),
                    action: action_name.to_string(),
                });
            }

            let existing_path = paths.iter().position(|(path, _)| *path == route);
            if existing_path.is_none() {
                if let Err(err) = matcher.insert(route.as_str(), ()) {
                    return Err(BindError::ConflictingRoute {
                        existing: match err {
                            matchit::InsertError::Conflict { with } => with,
                            other => other.to_string(),
                        },
                        route,
                        controller: controller_name.to_string(),
                        action: action_name.to_string(),
                    });
                }
            }

            let bound = Arc::new(BoundAction::compile(controller_name, action_name, action));
            let handler = {
                let dispatcher = dispatcher.clone();
                move |request: Request| {
                    let dispatcher = dispatcher.clone();
                    let bound = Arc::clone(&bound);
                    async move { dispatcher.dispatch(&bound, request).await }
                }
            };
            let filter = action.method().filter();
            let methods = match existing_path {
                Some(i) => paths.remove(i).1,
                None => MethodRouter::new(),
            };
            paths.push((route.clone(), methods.on(filter, handler)));

            tracing::info!(method = %action.method(), route = %route, action = %bound_name(controller_name, action_name), "route registered");
            table.routes.push(RegisteredRoute {
                method: action.method(),
                route,
                controller: controller_name.to_string(),
                action: action_name.to_string(),
                is_public: action.is_public(),
            });
        }
    }

    let mut router = router;
    for (path, methods) in paths {
        router = router.route(&path, methods.fallback(not_found_handler(dispatcher.clone())));
    }
    Ok((router.fallback(not_found_handler(dispatcher)), table))
}

fn not_found_handler(dispatcher: Dispatcher) -> impl Fn(axum::http::Method, Uri) -> std::future::Ready<Response> + Clone + Send + Sync + 'static {
    move |method, uri| std::future::ready(dispatcher.not_found(&method, &uri))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionSettings, NoInput};
    use crate::schema::{Shape, ValueSchema};
    use axum::http::HeaderValue;
    use serde_json::json;

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        assert_eq!(bearer_token(Some("Bearer good-token")), Some("good-token"));
        assert_eq!(bearer_token(Some("Bearer   ")), None);
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[tokio::test]
    async fn closure_validators_and_deny_all() {
        let validator = auth_fn(|credential: Option<String>| async move {
            Ok(match credential.as_deref() {
                Some("Bearer good-token") => Some("u1".to_string()),
                _ => None,
            })
        });
        assert_eq!(validator.validate(Some("Bearer good-token")).await.unwrap(), Some("u1".into()));
        assert_eq!(validator.validate(Some("Bearer bad")).await.unwrap(), None);
        assert_eq!(DenyAll.validate(Some("Bearer good-token")).await.unwrap(), None);
    }

    #[test]
    fn query_repeats_and_declared_arrays_become_lists() {
        let schema = ObjectSchema::new(
            Shape::new()
                .field("tag", ValueSchema::array(ValueSchema::string()))
                .field("page", ValueSchema::number().coerce()),
        );
        let uri: Uri = "/items?tag=a&page=2&ids=1&ids=2".parse().unwrap();
        let map = query_object(&schema, &uri).unwrap();
        assert_eq!(Value::Object(map), json!({"tag": ["a"], "page": "2", "ids": ["1", "2"]}));
    }

    #[test]
    fn headers_are_matched_case_insensitively() {
        let schema = ObjectSchema::new(Shape::new().field("X-Request-Id", ValueSchema::string()));
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("r1"));
        headers.insert("x-other", HeaderValue::from_static("ignored"));
        assert_eq!(Value::Object(header_object(&schema, &headers)), json!({"X-Request-Id": "r1"}));
    }

    #[test]
    fn empty_body_is_no_value_and_garbage_is_an_issue() {
        assert_eq!(body_value(b""), Ok(None));
        assert_eq!(body_value(b" \n"), Ok(None));
        assert_eq!(body_value(br#"{"a":1}"#), Ok(Some(json!({"a": 1}))));
        assert_eq!(body_value(b"{nope").unwrap_err().path, "body");
    }

    fn noop_at(path: &str) -> Action {
        Action::public_get(ActionSettings::new().route(path), |_, _: NoInput| async { Ok::<_, ActionError>(()) })
    }

    #[test]
    fn conflicting_parameter_names_are_a_bind_error() {
        let dispatcher = Dispatcher::new(Arc::new(DenyAll), crate::error::translate_error);
        let users = Controller::new("/users", [("byId", noop_at("/:id")), ("byName", noop_at("/:name/x"))]);
        let err = bind(Router::new(), [("users", &users)], dispatcher.clone()).unwrap_err();
        match err {
            BindError::ConflictingRoute {
                route,
                existing,
                controller,
                action,
            } => {
                assert_eq!((route.as_str(), controller.as_str(), action.as_str()), ("/users/:name/x", "users", "byName"));
                assert!(existing.contains(":id"), "{existing}");
            }
            other => panic!("unexpected {other:?}"),
        }

        let static_and_param = Controller::new("/users", [("byId", noop_at("/:id")), ("me", noop_at("/me"))]);
        assert!(bind(Router::new(), [("users", &static_and_param)], dispatcher).is_ok());
    }

    #[test]
    fn later_sources_overwrite_and_issues_are_prefixed() {
        let mut merged = Map::new();
        let mut issues = Vec::new();
        collect("params", Ok(json!({"id": "p"}).as_object().cloned().unwrap()), &mut merged, &mut issues);
        collect("body", Ok(json!({"id": "b"}).as_object().cloned().unwrap()), &mut merged, &mut issues);
        collect("query", Err(vec![Issue::new("page", "Required")]), &mut merged, &mut issues);
        assert_eq!(merged["id"], "b");
        assert_eq!(issues, vec![Issue::new("query.page", "Required")]);
    }
}
