//! OpenAPI document generated from bound action descriptors, and the controller serving it.

use crate::action::{Action, ActionSettings, Method, NoInput};
use crate::controller::Controller;
use crate::error::{ActionError, BindError};
use crate::response::ResponsePlan;
use crate::schema::{InputSchema, ObjectSchema, SchemaKind, StringFormat, ValueSchema};
use serde_json::Value;
use std::sync::Arc;
use utoipa::openapi::{
    content::ContentBuilder,
    info::InfoBuilder,
    path::{HttpMethod, Operation, OperationBuilder, ParameterBuilder, ParameterIn, PathItem, PathsBuilder},
    request_body::RequestBodyBuilder,
    response::ResponseBuilder,
    schema::{ArrayBuilder, ComponentsBuilder, ObjectBuilder, Schema, SchemaFormat, SchemaType, Type},
    security::{HttpAuthScheme, HttpBuilder, SecurityRequirement, SecurityScheme},
    OpenApi, OpenApiBuilder, RefOr, Required,
};

pub const BEARER_SCHEME: &str = "bearerAuth";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocsInfo {
    pub title: String,
    pub version: String,
}

impl Default for DocsInfo {
    fn default() -> Self {
        DocsInfo {
            title: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Builds the document. Only reads the descriptors.
pub fn openapi<'a, I>(info: &DocsInfo, controllers: I) -> OpenApi
where
    I: IntoIterator<Item = (&'a str, &'a Controller)>,
{
    let mut paths = PathsBuilder::new();
    for (controller_name, controller) in controllers {
        for (action_name, action) in controller.iter() {
            paths = paths.path(
                openapi_path(action.route()),
                PathItem::new(http_method(action.method()), operation(controller_name, action_name, action)),
            );
        }
    }

    let components = ComponentsBuilder::new()
        .security_scheme(
            BEARER_SCHEME,
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        )
        .build();

    OpenApiBuilder::new()
        .info(InfoBuilder::new().title(info.title.clone()).version(info.version.clone()).build())
        .paths(paths.build())
        .components(Some(components))
        .build()
}

fn operation(controller: &str, name: &str, action: &Action) -> Operation {
    let meta = action.meta();
    let mut op = OperationBuilder::new()
        .operation_id(Some(format!("{}.{}", controller, name)))
        .tag(controller)
        .summary(meta.summary.clone())
        .description(meta.description.clone());

    for (location, input) in [
        (ParameterIn::Path, &meta.params),
        (ParameterIn::Query, &meta.query),
        (ParameterIn::Header, &meta.headers),
    ] {
        let Some(object) = input.as_object() else { continue };
        for (field, schema) in object.shape().iter() {
            let required = matches!(location, ParameterIn::Path) || !schema.is_optional();
            op = op.parameter(
                ParameterBuilder::new()
                    .name(field)
                    .parameter_in(location.clone())
                    .required(if required { Required::True } else { Required::False })
                    .description(schema.description())
                    .schema(Some(value_schema(schema)))
                    .build(),
            );
        }
    }

    if let InputSchema::Present(body) = &meta.body {
        op = op.request_body(Some(
            RequestBodyBuilder::new()
                .content(
                    "application/json",
                    ContentBuilder::new().schema(Some(object_schema(body, None))).build(),
                )
                .required(Some(Required::True))
                .build(),
        ));
    }

    let plan = ResponsePlan::for_output(&meta.output);
    let output = plan.schema();
    let content_type = match plan {
        ResponsePlan::Constant(_) => "text/plain",
        ResponsePlan::Serialize(_) => "application/json",
    };
    op = op.response(
        "200",
        ResponseBuilder::new()
            .description(output.description().unwrap_or("Success"))
            .content(content_type, ContentBuilder::new().schema(Some(value_schema(&output))).build())
            .build(),
    );

    if !meta.is_public {
        op = op.security(SecurityRequirement::new(BEARER_SCHEME, Vec::<String>::new()));
    }
    op.build()
}

fn http_method(method: Method) -> HttpMethod {
    match method {
        Method::Get => HttpMethod::Get,
        Method::Put => HttpMethod::Put,
        Method::Patch => HttpMethod::Patch,
        Method::Post => HttpMethod::Post,
        Method::Delete => HttpMethod::Delete,
    }
}

/// `/users/:id` becomes `/users/{id}`.
pub fn openapi_path(route: &str) -> String {
    route
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn value_schema(schema: &ValueSchema) -> RefOr<Schema> {
    let description = schema.description();
    let default = schema.default_ref().cloned();
    let built = match schema.kind() {
        SchemaKind::String(rules) => Schema::Object(
            ObjectBuilder::new()
                .schema_type(Type::String)
                .min_length(rules.min_length)
                .max_length(rules.max_length)
                .pattern(rules.pattern.as_ref().map(|p| p.as_str()))
                .format(rules.format.map(string_format))
                .description(description)
                .default(default)
                .build(),
        ),
        SchemaKind::Number(rules) => Schema::Object(
            ObjectBuilder::new()
                .schema_type(if rules.integer { Type::Integer } else { Type::Number })
                .minimum(rules.minimum)
                .maximum(rules.maximum)
                .exclusive_minimum(rules.exclusive_minimum)
                .description(description)
                .default(default)
                .build(),
        ),
        SchemaKind::Boolean { .. } => Schema::Object(
            ObjectBuilder::new()
                .schema_type(Type::Boolean)
                .description(description)
                .default(default)
                .build(),
        ),
        SchemaKind::Literal(value) => Schema::Object(
            ObjectBuilder::new()
                .schema_type(literal_type(value))
                .enum_values(Some([value.clone()]))
                .description(description)
                .build(),
        ),
        SchemaKind::Array(item) => Schema::Array(
            ArrayBuilder::new()
                .items(value_schema(item))
                .description(description)
                .build(),
        ),
        SchemaKind::Object(object) => return object_schema(object, description),
        SchemaKind::Any => Schema::Object(
            ObjectBuilder::new()
                .schema_type(SchemaType::AnyValue)
                .description(description)
                .build(),
        ),
    };
    RefOr::T(built)
}

fn object_schema(object: &ObjectSchema, description: Option<&str>) -> RefOr<Schema> {
    let mut builder = ObjectBuilder::new().schema_type(Type::Object).description(description);
    for (name, field) in object.shape().iter() {
        builder = builder.property(name, value_schema(field));
        if !field.is_optional() {
            builder = builder.required(name);
        }
    }
    RefOr::T(Schema::Object(builder.build()))
}

fn string_format(format: StringFormat) -> SchemaFormat {
    let name = match format {
        StringFormat::Email => "email",
        StringFormat::Uuid => "uuid",
        StringFormat::DateTime => "date-time",
    };
    SchemaFormat::Custom(name.to_string())
}

fn literal_type(value: &Value) -> SchemaType {
    match value {
        Value::String(_) => SchemaType::Type(Type::String),
        Value::Number(_) => SchemaType::Type(Type::Number),
        Value::Bool(_) => SchemaType::Type(Type::Boolean),
        _ => SchemaType::AnyValue,
    }
}

/// Controller exposing the document at `{route}/json`. The document is rendered once.
pub fn documentation_controller(route: &str, document: &OpenApi) -> Result<Controller, BindError> {
    let rendered = serde_json::to_value(document).map_err(|e| BindError::Documentation(e.to_string()))?;
    let rendered = Arc::new(rendered);
    let json = Action::public_get(
        ActionSettings::new()
            .route("/json")
            .summary("OpenAPI document")
            .output(ValueSchema::any().describe("OpenAPI 3 document")),
        move |_, _: NoInput| {
            let rendered = Arc::clone(&rendered);
            async move { Ok::<_, ActionError>(Value::clone(&rendered)) }
        },
    );
    Ok(Controller::new(route, [("json", json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Shape;
    use serde_json::json;

    fn users() -> Controller {
        let user = ValueSchema::object(
            Shape::new()
                .field("id", ValueSchema::string().uuid())
                .field("name", ValueSchema::string().non_empty()),
        )
        .describe("User");
        Controller::new(
            "/users",
            [
                (
                    "getById",
                    Action::get(
                        ActionSettings::new()
                            .route("/:id")
                            .summary("Get users by id")
                            .params(Shape::new().field("id", ValueSchema::string().uuid()))
                            .output(user),
                        |_, _: NoInput| async { Ok::<_, ActionError>(Value::Null) },
                    ),
                ),
                (
                    "create",
                    Action::public_post(
                        ActionSettings::new().body(Shape::new().field("name", ValueSchema::string())),
                        |_, _: NoInput| async { Ok::<_, ActionError>(()) },
                    ),
                ),
            ],
        )
    }

    #[test]
    fn converts_route_params() {
        assert_eq!(openapi_path("/users/:id"), "/users/{id}");
        assert_eq!(openapi_path("/users/"), "/users/");
    }

    #[test]
    fn documents_every_descriptor() {
        let controller = users();
        let doc = serde_json::to_value(openapi(&DocsInfo::default(), [("users", &controller)])).unwrap();

        let get = &doc["paths"]["/users/{id}"]["get"];
        assert_eq!(get["summary"], "Get users by id");
        assert_eq!(get["parameters"][0]["name"], "id");
        assert_eq!(get["parameters"][0]["in"], "path");
        assert_eq!(get["security"][0], json!({"bearerAuth": []}));
        assert_eq!(get["responses"]["200"]["description"], "User");

        let create = &doc["paths"]["/users/"]["post"];
        assert!(create.get("security").is_none());
        assert_eq!(
            create["requestBody"]["content"]["application/json"]["schema"]["required"],
            json!(["name"])
        );
        assert_eq!(
            create["responses"]["200"]["content"]["text/plain"]["schema"]["enum"],
            json!(["OK"])
        );
        assert_eq!(doc["components"]["securitySchemes"]["bearerAuth"]["scheme"], "bearer");
    }

    #[tokio::test]
    async fn serves_rendered_document() {
        let controller = users();
        let doc = openapi(&DocsInfo::default(), [("users", &controller)]);
        let docs = documentation_controller("/documentation", &doc).unwrap();
        let action = &docs["json"];
        assert_eq!(action.route(), "/documentation/json");
        assert!(action.is_public());
        let served = action.invoke(None, json!({})).await.unwrap();
        assert_eq!(served["info"]["title"], env!("CARGO_PKG_NAME"));
    }
}
