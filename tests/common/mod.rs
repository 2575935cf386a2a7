//! In-process stand-in for the Daana backend.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use daana_client::auth::AuthFlow;
use daana_client::{ClientConfig, Gateway, MemoryStorage};
use tokio::net::TcpListener;
use url::Url;

pub struct Backend {
    pub origin: Url,
    hits: Arc<AtomicUsize>,
}

impl Backend {
    /// Serves `routes` on an ephemeral loopback port, counting every request.
    pub async fn start(routes: Router) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = routes.layer(middleware::from_fn_with_state(hits.clone(), count));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            origin: format!("http://{address}").parse().unwrap(),
            hits,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn gateway(&self) -> Gateway {
        gateway_for(&self.origin)
    }

    pub fn auth_flow(&self) -> AuthFlow<MemoryStorage> {
        AuthFlow::with_storage(self.gateway(), MemoryStorage::new())
    }
}

pub fn gateway_for(origin: &Url) -> Gateway {
    Gateway::new(ClientConfig::production(origin).unwrap())
}

/// Origin of a port nothing listens on.
pub async fn closed_origin() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{address}").parse().unwrap()
}

async fn count(State(hits): State<Arc<AtomicUsize>>, request: Request, next: Next) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    next.run(request).await
}
