use std::{
    net::SocketAddr,
    sync::Arc,
};

use anyhow::Result;
use axum::{
    extract::{
        FromRequest,
        Multipart,
        Request,
        State,
    },
    http::{
        header::CONTENT_TYPE,
        StatusCode,
    },
    response::{
        IntoResponse,
        Response,
    },
    routing::post,
    Form,
    Json,
    Router,
};
use psa_services::{
    Relay,
    Webhook,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{
    debug,
    error,
    info,
};

#[derive(Deserialize)]
struct WebhookForm {
    payload: String,
}


/// Pulls the `payload` field out of a urlencoded or multipart form.
/// Plex itself sends multipart, with a thumbnail next to the payload.
async fn read_payload(request: Request) -> Option<String> {
    let multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if multipart {
        let mut multipart = Multipart::from_request(request, &()).await.ok()?;
        while let Ok(Some(field)) = multipart.next_field().await {
            if field.name() == Some("payload") {
                return field.text().await.ok();
            }
        }
        None
    } else {
        Form::<WebhookForm>::from_request(request, &()).await.ok().map(|Form(form)| form.payload)
    }
}

async fn receive_webhook(State(relay): State<Arc<Relay>>, request: Request) -> Response {
    let Some(payload) = read_payload(request).await else {
        error!("Webhook request has no payload field");
        return StatusCode::BAD_REQUEST.into_response();
    };

    let webhook = match Webhook::parse(&payload) {
        Ok(webhook) => webhook,
        Err(e) => {
            error!("CRITICAL: Failed to convert Plex webhook into JSON: {e}");
            return StatusCode::BAD_REQUEST.into_response();
        },
    };

    let outcome = relay.handle(&webhook).await;
    debug!(?outcome, "Webhook handled");
    Json(json!({ "status": 200 })).into_response()
}

pub fn make_app(relay: Relay) -> Router {
    Router::new()
        .route("/", post(receive_webhook))
        .with_state(Arc::new(relay))
}

pub async fn run_server(relay: Relay, addr: SocketAddr) -> Result<()> {
    let app = make_app(relay);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening for Plex webhooks on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use axum::body::{
        to_bytes,
        Body,
    };
    use psa_services::{
        enrich::NoEnrichment,
        service::Dispatcher,
        RelayConfig,
    };
    use tower::ServiceExt;

    use super::*;

    const WEBHOOK: &str = r#"{"event":"media.scrobble","Account":{"title":"alice"},"Metadata":{"type":"track","title":"Song","index":3}}"#;

    fn app() -> Router {
        let config = RelayConfig {
            tracked_user: "alice".to_owned(),
        };
        make_app(Relay::new(config, Box::new(NoEnrichment), Dispatcher::default()))
    }

    fn urlencoded(body: String) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn acknowledges_urlencoded_webhook() {
        let response = app().oneshot(urlencoded(format!("payload={WEBHOOK}"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({ "status": 200 }));
    }

    #[tokio::test]
    async fn acknowledges_ignored_webhook() {
        let other_user = WEBHOOK.replace("alice", "bob");
        let response = app().oneshot(urlencoded(format!("payload={other_user}"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn acknowledges_multipart_webhook() {
        let body = format!(
            "--XBOUNDARY\r\n\
             Content-Disposition: form-data; name=\"payload\"\r\n\
             Content-Type: application/json\r\n\r\n\
             {WEBHOOK}\r\n\
             --XBOUNDARY\r\n\
             Content-Disposition: form-data; name=\"thumb\"; filename=\"thumb.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\n\
             not really a jpeg\r\n\
             --XBOUNDARY--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_malformed_json() {
        let response = app().oneshot(urlencoded("payload=not-json".to_owned())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_missing_payload() {
        let response = app().oneshot(urlencoded("something=else".to_owned())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn only_accepts_post() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
