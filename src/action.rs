//! Action descriptors: one endpoint's contract (method, route, schemas, visibility)
//! paired with the handler that implements it.

use crate::error::{ActionError, Issue};
use crate::schema::{InputSchema, OutputSchema, Shape, ValueSchema};
use async_trait::async_trait;
use axum::routing::MethodFilter;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Put,
    Patch,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }

    pub fn filter(self) -> MethodFilter {
        match self {
            Method::Get => MethodFilter::GET,
            Method::Put => MethodFilter::PUT,
            Method::Patch => MethodFilter::PATCH,
            Method::Post => MethodFilter::POST,
            Method::Delete => MethodFilter::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input type for handlers of actions that declare no inputs.
pub type NoInput = serde::de::IgnoredAny;

/// Everything about an action except its method and visibility.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionSettings {
    pub route: Option<String>,
    pub params: Option<Shape>,
    pub query: Option<Shape>,
    pub body: Option<Shape>,
    pub headers: Option<Shape>,
    pub output: Option<ValueSchema>,
    pub summary: Option<String>,
    pub description: Option<String>,
}

impl ActionSettings {
    pub fn new() -> Self {
        ActionSettings::default()
    }

    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn params(mut self, shape: Shape) -> Self {
        self.params = Some(shape);
        self
    }

    pub fn query(mut self, shape: Shape) -> Self {
        self.query = Some(shape);
        self
    }

    pub fn body(mut self, shape: Shape) -> Self {
        self.body = Some(shape);
        self
    }

    pub fn headers(mut self, shape: Shape) -> Self {
        self.headers = Some(shape);
        self
    }

    pub fn output(mut self, schema: ValueSchema) -> Self {
        self.output = Some(schema);
        self
    }

    pub fn summary(mut self, text: impl Into<String>) -> Self {
        self.summary = Some(text.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// Full set of options accepted by [`Action::define`].
#[derive(Clone, Debug, PartialEq)]
pub struct ActionOptions {
    pub method: Method,
    pub is_public: bool,
    pub settings: ActionSettings,
}

impl ActionOptions {
    pub fn new(method: Method, settings: ActionSettings) -> Self {
        ActionOptions {
            method,
            is_public: false,
            settings,
        }
    }

    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }
}

/// Normalized descriptor metadata. Plain data: cloneable, comparable, never shared mutably.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionMeta {
    pub method: Method,
    pub route: String,
    pub is_public: bool,
    pub params: InputSchema,
    pub query: InputSchema,
    pub body: InputSchema,
    pub headers: InputSchema,
    pub output: OutputSchema,
    pub summary: Option<String>,
    pub description: Option<String>,
}

impl ActionMeta {
    pub fn from_options(options: ActionOptions) -> Self {
        let ActionOptions {
            method,
            is_public,
            settings,
        } = options;
        ActionMeta {
            method,
            route: settings.route.unwrap_or_else(|| "/".to_string()),
            is_public,
            params: InputSchema::from_shape(settings.params),
            query: InputSchema::from_shape(settings.query),
            body: InputSchema::from_shape(settings.body),
            headers: InputSchema::from_shape(settings.headers),
            output: OutputSchema::from_schema(settings.output),
            summary: settings.summary,
            description: settings.description,
        }
    }
}

/// Type-erased handler: merged JSON input in, JSON output out.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, caller: Option<String>, input: Value) -> Result<Value, ActionError>;
}

/// Adapts a typed `Fn(caller, I) -> Future<Result<O>>` to [`Handler`].
pub struct TypedHandler<F, I, O> {
    f: F,
    _io: PhantomData<fn(I) -> O>,
}

impl<F, I, O> TypedHandler<F, I, O> {
    pub fn new(f: F) -> Self {
        TypedHandler { f, _io: PhantomData }
    }
}

#[async_trait]
impl<F, Fut, I, O> Handler for TypedHandler<F, I, O>
where
    F: Fn(Option<String>, I) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, ActionError>> + Send,
    I: DeserializeOwned + Send,
    O: Serialize + Send,
{
    async fn call(&self, caller: Option<String>, input: Value) -> Result<Value, ActionError> {
        let input: I = serde_json::from_value(input)
            .map_err(|e| ActionError::Validation(vec![Issue::new("", e.to_string())]))?;
        let output = (self.f)(caller, input).await?;
        serde_json::to_value(output).map_err(ActionError::unexpected)
    }
}

/// An endpoint: descriptor metadata plus its handler.
#[derive(Clone)]
pub struct Action {
    meta: ActionMeta,
    handler: Arc<dyn Handler>,
}

macro_rules! method_wrappers {
    ($($private:ident, $public:ident => $method:expr;)*) => {
        $(
            pub fn $private<F, Fut, I, O>(settings: ActionSettings, handler: F) -> Action
            where
                F: Fn(Option<String>, I) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = Result<O, ActionError>> + Send + 'static,
                I: DeserializeOwned + Send + 'static,
                O: Serialize + Send + 'static,
            {
                Action::define(ActionOptions::new($method, settings), handler)
            }

            pub fn $public<F, Fut, I, O>(settings: ActionSettings, handler: F) -> Action
            where
                F: Fn(Option<String>, I) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = Result<O, ActionError>> + Send + 'static,
                I: DeserializeOwned + Send + 'static,
                O: Serialize + Send + 'static,
            {
                Action::define(ActionOptions::new($method, settings).public(), handler)
            }
        )*
    };
}

impl Action {
    pub fn define<F, Fut, I, O>(options: ActionOptions, handler: F) -> Action
    where
        F: Fn(Option<String>, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, ActionError>> + Send + 'static,
        I: DeserializeOwned + Send + 'static,
        O: Serialize + Send + 'static,
    {
        Action::from_handler(ActionMeta::from_options(options), Arc::new(TypedHandler::new(handler)))
    }

    pub fn from_handler(meta: ActionMeta, handler: Arc<dyn Handler>) -> Action {
        Action { meta, handler }
    }

    method_wrappers! {
        get, public_get => Method::Get;
        put, public_put => Method::Put;
        patch, public_patch => Method::Patch;
        post, public_post => Method::Post;
        delete, public_delete => Method::Delete;
    }

    pub fn meta(&self) -> &ActionMeta {
        &self.meta
    }

    pub fn method(&self) -> Method {
        self.meta.method
    }

    pub fn route(&self) -> &str {
        &self.meta.route
    }

    pub fn is_public(&self) -> bool {
        self.meta.is_public
    }

    pub fn summary(&self) -> Option<&str> {
        self.meta.summary.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    /// Calls the handler directly, bypassing transport, auth and schema checks.
    pub async fn invoke(&self, caller: Option<String>, input: Value) -> Result<Value, ActionError> {
        self.handler.call(caller, input).await
    }

    /// New action sharing this handler, with `prefix` literally prepended to the route.
    pub(crate) fn prefixed(&self, prefix: &str) -> Action {
        let mut meta = self.meta.clone();
        meta.route = format!("{}{}", prefix, meta.route);
        Action {
            meta,
            handler: Arc::clone(&self.handler),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("meta", &self.meta).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Text {
        text: String,
    }

    async fn to_upper(_caller: Option<String>, data: Text) -> Result<String, ActionError> {
        Ok(data.text.to_uppercase())
    }

    fn text_shape() -> Shape {
        Shape::new().field("text", ValueSchema::string())
    }

    #[tokio::test]
    async fn creates_get_action_with_params() {
        let action = Action::get(
            ActionSettings::new().route("/toUpper/:text").params(text_shape()),
            to_upper,
        );
        assert_eq!(action.method(), Method::Get);
        assert_eq!(action.route(), "/toUpper/:text");
        assert!(action.meta().params.is_present());
        assert_eq!(action.invoke(None, json!({"text": "John"})).await.unwrap(), json!("JOHN"));
    }

    #[tokio::test]
    async fn creates_body_actions_for_each_method() {
        let settings = || ActionSettings::new().route("/toUpper").body(text_shape());
        let actions = [
            (Action::post(settings(), to_upper), Method::Post),
            (Action::put(settings(), to_upper), Method::Put),
            (Action::delete(settings(), to_upper), Method::Delete),
        ];
        for (action, method) in actions {
            assert_eq!(action.method(), method);
            assert_eq!(action.route(), "/toUpper");
            assert_eq!(action.invoke(None, json!({"text": "John"})).await.unwrap(), json!("JOHN"));
        }
    }

    #[tokio::test]
    async fn passes_query_and_header_inputs() {
        let query = Action::get(ActionSettings::new().route("/toUpper").query(text_shape()), to_upper);
        assert!(query.meta().query.is_present());
        assert_eq!(query.invoke(None, json!({"text": "John"})).await.unwrap(), json!("JOHN"));

        let headers = Action::post(ActionSettings::new().route("/toUpper").headers(text_shape()), to_upper);
        assert!(headers.meta().headers.is_present());
        assert!(!headers.meta().body.is_present());
        assert_eq!(headers.invoke(None, json!({"text": "John"})).await.unwrap(), json!("JOHN"));
    }

    #[test]
    fn wrappers_match_general_constructor() {
        let settings = ActionSettings::new()
            .route("/:id")
            .params(Shape::new().field("id", ValueSchema::string().uuid()))
            .summary("Get by id");
        let noop = |_: Option<String>, _: NoInput| async { Ok::<_, ActionError>(()) };

        let pairs = [
            (Action::get(settings.clone(), noop), ActionOptions::new(Method::Get, settings.clone())),
            (Action::patch(settings.clone(), noop), ActionOptions::new(Method::Patch, settings.clone())),
            (
                Action::public_post(settings.clone(), noop),
                ActionOptions::new(Method::Post, settings.clone()).public(),
            ),
            (
                Action::public_delete(settings.clone(), noop),
                ActionOptions::new(Method::Delete, settings.clone()).public(),
            ),
        ];
        for (wrapped, options) in pairs {
            assert_eq!(wrapped.meta(), Action::define(options, noop).meta());
        }
    }

    #[test]
    fn defaults_are_normalized() {
        let action = Action::get(ActionSettings::new(), |_, _: NoInput| async { Ok::<_, ActionError>(()) });
        let meta = action.meta();
        assert_eq!(meta.route, "/");
        assert!(!meta.is_public);
        assert_eq!(meta.params, InputSchema::Absent);
        assert_eq!(meta.body, InputSchema::Absent);
        assert!(meta.output.is_default());
        assert_eq!(meta.summary, None);
    }

    #[test]
    fn descriptors_built_from_shared_settings_are_independent() {
        let settings = ActionSettings::new().route("/x");
        let noop = |_: Option<String>, _: NoInput| async { Ok::<_, ActionError>(()) };
        let first = Action::get(settings.clone(), noop);
        let second = Action::get(settings, noop);
        let moved = first.prefixed("/a");
        assert_eq!(moved.route(), "/a/x");
        assert_eq!(first.route(), "/x");
        assert_eq!(second.route(), "/x");
    }

    #[tokio::test]
    async fn handler_receives_caller_identity() {
        let whoami = Action::get(ActionSettings::new(), |caller: Option<String>, _: NoInput| async move {
            Ok::<_, ActionError>(caller.unwrap_or_default())
        });
        assert_eq!(whoami.invoke(Some("u1".into()), Value::Null).await.unwrap(), json!("u1"));
    }

    #[tokio::test]
    async fn undeserializable_input_is_a_validation_error() {
        let action = Action::get(ActionSettings::new().params(text_shape()), to_upper);
        let err = action.invoke(None, json!({"text": 5})).await.unwrap_err();
        assert!(matches!(err, ActionError::Validation(_)));
    }
}
