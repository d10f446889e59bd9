use crate::{
    api::{
        self,
        handlers::auth::{AuthConfig, AuthState},
    },
    cli::telemetry,
    store,
};
use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, sync::Arc};
use tracing::info;

pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub max_connections: u32,
    pub jwt_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub frontend_base_url: String,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("jwt_secret", &"[REDACTED]")
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("frontend_base_url", &self.frontend_base_url)
            .finish()
    }
}

impl Args {
    #[must_use]
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.jwt_secret.clone())
            .with_frontend_base_url(self.frontend_base_url.clone())
            .with_session_ttl_seconds(self.session_ttl_seconds)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store cannot be opened or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store = store::connect(args.dsn.expose_secret(), args.max_connections).await?;
    let auth_state = Arc::new(AuthState::new(args.auth_config()));

    info!(
        port = args.port,
        frontend = %args.frontend_base_url,
        session_ttl_seconds = args.session_ttl_seconds,
        "Starting inkpost"
    );

    let result = api::new(args.port, store, auth_state).await;
    telemetry::shutdown_tracer();
    result
}
