pub mod api;
pub mod websocket;

use crate::agent::{ ChatAgent, SessionSettings };
use crate::cli::Args;
use crate::websocket::SessionDefaults;
use log::{ info, warn };
use std::error::Error;
use std::sync::Arc;

pub struct Server {
    addr: String,
    agent: Arc<ChatAgent>,
    api_key: Option<String>,
    http_port: Option<u16>,
    defaults: SessionDefaults,
}

impl Server {
    pub fn new(args: &Args, agent: Arc<ChatAgent>) -> Self {
        let api_key = args.server_api_key.clone().filter(|k| !k.trim().is_empty());
        if api_key.is_some() {
            info!("Server configured with API Key authentication.");
        } else {
            warn!("Server configured WITHOUT API Key authentication. Connections are open.");
        }

        Self {
            addr: args.server_addr.clone(),
            agent,
            api_key,
            http_port: args.http_port,
            defaults: SessionDefaults {
                settings: SessionSettings::from_args(args),
                user_name: args.default_user_name.clone(),
            },
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Some(http_port) = self.http_port {
            api::start_http_server(http_port, self.agent.clone()).await?;
        }

        websocket::start_ws_server(
            &self.addr,
            self.agent.clone(),
            self.api_key.clone(),
            self.defaults.clone(),
        ).await
    }
}
