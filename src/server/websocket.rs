use crate::agent::ChatAgent;
use crate::websocket::{ handle_connection, SessionDefaults };

use std::error::Error;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use tokio::io::{ AsyncRead, AsyncWrite };
use tokio::net::TcpListener;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ ErrorResponse, Request, Response };
use tokio_tungstenite::tungstenite::http::StatusCode;

use url::form_urlencoded;
use governor::{ clock::DefaultClock, state::{ InMemoryState, NotKeyed }, Quota, RateLimiter };
use lazy_static::lazy_static;
use log::{ debug, error, info, warn };

const CONNECTIONS_PER_SECOND: NonZeroU32 = NonZeroU32::MIN.saturating_add(9);

lazy_static! {
    static ref CONNECTION_LIMITER: RateLimiter<NotKeyed, InMemoryState, DefaultClock> =
        RateLimiter::direct(Quota::per_second(CONNECTIONS_PER_SECOND));
}

pub async fn start_ws_server(
    addr: &str,
    agent: Arc<ChatAgent>,
    api_key: Option<String>,
    defaults: SessionDefaults,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!("WS server listening on: {}", addr);

    loop {
        let (stream, peer) = listener.accept().await?;

        if CONNECTION_LIMITER.check().is_err() {
            warn!("Global connection rate limit exceeded for {}. Dropping connection.", peer);
            continue;
        }

        info!("Incoming connection from: {}", peer);
        let agent = Arc::clone(&agent);
        let required_api_key = api_key.clone();
        let defaults = defaults.clone();

        tokio::spawn(async move {
            if let Err(e) = process_connection(peer, stream, agent, required_api_key, defaults).await {
                error!("Failed to process connection for {}: {}", peer, e);
            }
        });
    }
}

/// Key sent by the client, from the `X-API-Key` header or the `api_key`
/// query parameter.
fn provided_api_key(req: &Request) -> Option<String> {
    let from_header = req
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    from_header.or_else(|| {
        let query = req.uri().query()?;
        form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .find(|(key, _)| key == "api_key")
            .map(|(_, value)| value)
    })
}

fn unauthorized() -> ErrorResponse {
    let mut resp = ErrorResponse::new(Some("Unauthorized".into()));
    *resp.status_mut() = StatusCode::UNAUTHORIZED;
    resp
}

async fn process_connection<S>(
    peer: SocketAddr,
    stream: S,
    agent: Arc<ChatAgent>,
    required_api_key: Option<String>,
    defaults: SessionDefaults,
) -> Result<(), Box<dyn Error + Send + Sync>>
    where S: AsyncRead + AsyncWrite + Unpin + Send + 'static
{
    let auth_callback = |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let Some(required) = required_api_key.as_deref() else {
            debug!("{} no API key required", peer);
            return Ok(response);
        };

        if provided_api_key(req).as_deref() != Some(required) {
            warn!("{}: bad or missing API key", peer);
            return Err(unauthorized());
        }
        info!("{} authenticated", peer);
        Ok(response)
    };

    match accept_hdr_async(stream, auth_callback).await {
        Ok(ws) => {
            handle_connection(peer, ws, agent, defaults).await;
            Ok(())
        }
        Err(e) => {
            error!("Handshake failed for {}: {}", peer, e);
            Err(Box::new(e) as _)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, header: Option<&str>) -> Request {
        let mut builder = Request::builder().uri(uri);
        if let Some(key) = header {
            builder = builder.header("X-API-Key", key);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn reads_key_from_header_first() {
        let req = request("ws://localhost:4000/?api_key=query", Some("header"));
        assert_eq!(provided_api_key(&req).as_deref(), Some("header"));
    }

    #[test]
    fn falls_back_to_query_parameter() {
        let req = request("ws://localhost:4000/chat?foo=1&api_key=secret", None);
        assert_eq!(provided_api_key(&req).as_deref(), Some("secret"));
    }

    #[test]
    fn query_key_is_percent_decoded() {
        let req = request("ws://localhost:4000/?api_key=s3cr%2Bt%3D%3D", None);
        assert_eq!(provided_api_key(&req).as_deref(), Some("s3cr+t=="));
    }

    #[test]
    fn missing_key_is_none() {
        let req = request("ws://localhost:4000/chat?foo=1", None);
        assert_eq!(provided_api_key(&req), None);
    }

    #[test]
    fn rejection_is_401() {
        assert_eq!(unauthorized().status(), StatusCode::UNAUTHORIZED);
    }
}
