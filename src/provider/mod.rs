mod handlers;

use crate::{
    config::ProviderConfig,
    consts::{FUNCTIONS_ENDPOINT, FUNCTION_ENDPOINT, HEALTHZ_ENDPOINT},
    function::{secrets::SecretResolver, store::FunctionStore, FunctionReader, Reconciler},
};
use axum::{routing::get, Router};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;

pub struct Provider {
    config: ProviderConfig,
    reconciler: Reconciler,
    reader: FunctionReader,
}

impl Provider {
    pub fn new(
        config: ProviderConfig,
        store: Arc<dyn FunctionStore>,
        secret_resolver: Arc<dyn SecretResolver>,
    ) -> Self {
        let reconciler = Reconciler::new(&config, store.clone(), secret_resolver);
        let reader = FunctionReader::new(&config, store);

        Self {
            config,
            reconciler,
            reader,
        }
    }

    pub fn router(self) -> Router {
        Router::new()
            .route(
                FUNCTIONS_ENDPOINT,
                get(handlers::list_functions).put(handlers::update_function),
            )
            .route(
                &format!("{FUNCTION_ENDPOINT}/:name"),
                get(handlers::get_function),
            )
            .route(HEALTHZ_ENDPOINT, get(handlers::healthz))
            .with_state(Arc::new(self))
    }

    pub async fn serve(self, address: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(address).await?;

        tracing::info!(%address, "Listening.");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Terminated.");

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal.");
    }

    tracing::info!("Shutting down.");
}
