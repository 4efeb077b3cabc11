//! Application assembly and lifecycle.
//!
//! An [`Application`] is only ever produced fully wired: resources
//! provisioned, handler built, address derived. From there it is either
//! started (bind, serve, tear down) or shut down explicitly. Every path
//! releases the resource set exactly once.

pub mod error;

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{Instrument, Span};

use crate::config::Settings;
use crate::http::{self, Server};
use crate::lifecycle::shutdown_signal;
use crate::resources::{Provisioner, ReleaseLedger, ResourceSet};
use crate::routes;

pub use error::{ApplicationError, BindError, ServeError};

/// Builds the request handler from settings and the provisioned resources.
pub type HandlerFactory = Box<dyn FnOnce(&Settings, &ResourceSet) -> Router + Send>;

/// A fully wired, not yet serving web application.
pub struct Application {
    address: String,
    resources: ResourceSet,
    handler: Router,
    span: Span,
}

impl Application {
    /// Build with the default handler and an `application` span.
    pub async fn build(settings: Settings) -> Result<Self, ApplicationError> {
        Self::builder(settings).build().await
    }

    pub fn builder(settings: Settings) -> ApplicationBuilder {
        ApplicationBuilder {
            settings,
            handler: None,
            span: None,
        }
    }

    /// Bind address, `0.0.0.0:<port>`.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    /// Shared view of the teardown records.
    pub fn ledger(&self) -> ReleaseLedger {
        self.resources.ledger()
    }

    /// Serve until SIGINT/SIGTERM, then release all resources.
    pub async fn start(self) -> Result<(), ApplicationError> {
        self.start_with_shutdown(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves or the listener fails, then release all resources.
    pub async fn start_with_shutdown<F>(self, shutdown: F) -> Result<(), ApplicationError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.bind().await?.run_until_stopped(shutdown).await
    }

    /// Bind the listener without serving yet.
    ///
    /// On failure the resource set is released before the error is returned.
    pub async fn bind(self) -> Result<Server, ApplicationError> {
        let Application {
            address,
            resources,
            handler,
            span,
        } = self;

        let bound_span = span.clone();
        async move {
            let bound = match TcpListener::bind(&address).await {
                Ok(listener) => listener.local_addr().map(|addr| (listener, addr)),
                Err(e) => Err(e),
            };

            match bound {
                Ok((listener, local_addr)) => {
                    tracing::info!(address = %local_addr, "Listener bound");
                    Ok(Server::new(listener, local_addr, handler, resources, span))
                }
                Err(source) => {
                    tracing::error!(address = %address, error = %source, "Failed to bind listener");
                    resources.close().await;
                    Err(BindError { address, source }.into())
                }
            }
        }
        .instrument(bound_span)
        .await
    }

    /// Release all resources of an application that will not be started.
    pub async fn shutdown(self) {
        let Application {
            resources, span, ..
        } = self;

        async move {
            tracing::info!("Application shut down before serving, releasing resources");
            resources.close().await;
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("address", &self.address)
            .field("resources", &self.resources)
            .finish()
    }
}

/// Configures how an [`Application`] is assembled.
pub struct ApplicationBuilder {
    settings: Settings,
    handler: Option<HandlerFactory>,
    span: Option<Span>,
}

impl ApplicationBuilder {
    /// Replace the default handler collaborator.
    pub fn handler<F>(mut self, factory: F) -> Self
    where
        F: FnOnce(&Settings, &ResourceSet) -> Router + Send + 'static,
    {
        self.handler = Some(Box::new(factory));
        self
    }

    /// Span every lifecycle event of this application is recorded under.
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Provision resources, build the handler and derive the bind address.
    ///
    /// Nothing escapes on failure: a provisioning error leaves no open handles.
    pub async fn build(self) -> Result<Application, ApplicationError> {
        let ApplicationBuilder {
            settings,
            handler,
            span,
        } = self;
        let span = span.unwrap_or_else(|| tracing::info_span!("application"));

        let build_span = span.clone();
        async move {
            let address = format!("0.0.0.0:{}", settings.application.port);

            let resources = Provisioner::new(&settings).provision().await?;

            let factory = handler.unwrap_or_else(|| Box::new(routes::create_router) as HandlerFactory);
            let handler = http::with_middleware(factory(&settings, &resources), &settings.application);

            tracing::info!(
                address = %address,
                backends = ?resources.backends(),
                "Application built"
            );

            Ok(Application {
                address,
                resources,
                handler,
                span,
            })
        }
        .instrument(build_span)
        .await
    }
}
