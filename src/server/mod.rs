pub mod api;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod rate_limit;

use crate::cli::Args;
use api::AppState;
use log::warn;
use std::error::Error;

pub struct Server {
    addr: String,
    state: AppState,
    args: Args,
}

impl Server {
    pub fn new(addr: String, state: AppState, args: Args) -> Self {
        Self { addr, state, args }
    }

    fn tls_paths(&self) -> Option<(String, String)> {
        if !self.args.enable_tls {
            return None;
        }
        match (&self.args.tls_cert_path, &self.args.tls_key_path) {
            (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
            _ => {
                warn!("ENABLE_TLS is set but TLS_CERT_PATH/TLS_KEY_PATH are missing, serving plain HTTP");
                None
            }
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(&self.addr, self.state.clone(), self.tls_paths()).await
    }
}
