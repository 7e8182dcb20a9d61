//! Server lifecycle: build (bind controllers), listen, stop.

use crate::config::ServerConfig;
use crate::controller::Controller;
use crate::dispatch::{bind, AuthValidator, DenyAll, Dispatcher, RouteTable};
use crate::docs::{documentation_controller, openapi, DocsInfo};
use crate::error::{translate_error, BindError, ErrorTranslator, ServerError};
use crate::system::system_controller;
use axum::{extract::DefaultBodyLimit, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

pub struct ServerBuilder {
    config: ServerConfig,
    controllers: Vec<(String, Controller)>,
    auth: Arc<dyn AuthValidator>,
    translate: ErrorTranslator,
    docs: Option<DocsInfo>,
}

impl ServerBuilder {
    pub fn controller(mut self, name: impl Into<String>, controller: Controller) -> Self {
        self.controllers.push((name.into(), controller));
        self
    }

    pub fn auth_validator<A>(mut self, validator: A) -> Self
    where
        A: AuthValidator + 'static,
    {
        self.auth = Arc::new(validator);
        self
    }

    pub fn error_translator(mut self, translate: ErrorTranslator) -> Self {
        self.translate = translate;
        self
    }

    /// Serves the OpenAPI document at `{DOCUMENTATION_ROUTE}/json`.
    pub fn documentation(mut self, title: impl Into<String>, version: impl Into<String>) -> Self {
        self.docs = Some(DocsInfo {
            title: title.into(),
            version: version.into(),
        });
        self
    }

    /// Binds every controller. Nothing is served yet.
    pub fn build(self) -> Result<Server, BindError> {
        let mut controllers = vec![("system".to_string(), system_controller())];
        controllers.extend(self.controllers);
        if let Some(info) = &self.docs {
            let document = openapi(info, controllers.iter().map(|(name, c)| (name.as_str(), c)));
            let docs = documentation_controller(&self.config.documentation_route, &document)?;
            controllers.push(("documentation".to_string(), docs));
        }

        let dispatcher = Dispatcher::new(self.auth, self.translate);
        let (router, routes) = bind(
            Router::new(),
            controllers.iter().map(|(name, c)| (name.as_str(), c)),
            dispatcher,
        )?;
        let router = router.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(self.config.body_limit))
                .layer(DefaultBodyLimit::disable()),
        );

        Ok(Server {
            config: self.config,
            router,
            routes,
        })
    }
}

/// Bound, not yet listening.
pub struct Server {
    config: ServerConfig,
    router: Router,
    routes: RouteTable,
}

impl Server {
    pub fn builder(config: ServerConfig) -> ServerBuilder {
        ServerBuilder {
            config,
            controllers: Vec::new(),
            auth: Arc::new(DenyAll),
            translate: translate_error,
            docs: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The bound router, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Listens on the configured host and port.
    pub async fn listen(self) -> Result<RunningServer, ServerError> {
        let host = self.config.host.clone();
        let port = self.config.port;
        self.listen_on(&host, port).await
    }

    pub async fn listen_on(self, host: &str, port: u16) -> Result<RunningServer, ServerError> {
        let listener = TcpListener::bind((host, port)).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("listening on http://{}", local_addr);

        let (shutdown, signal) = oneshot::channel::<()>();
        let router = self.router;
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    signal.await.ok();
                })
                .await
        });
        Ok(RunningServer {
            local_addr,
            shutdown,
            task,
        })
    }
}

pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting, lets in-flight requests finish, then returns.
    pub async fn stop(self) -> Result<(), ServerError> {
        let _ = self.shutdown.send(());
        self.task.await??;
        tracing::info!("server stopped");
        Ok(())
    }
}
