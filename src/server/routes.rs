//! Client-facing HTTP routes.
//!
//! - `GET /configs/{appId}/{cluster}/{namespace}` → 200 config, 304, 404
//! - `GET /notifications/v2` → 200 changed namespaces, 304 on timeout

use std::convert::Infallible;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use tracing::error;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

use crate::model::ConfigNotification;
use crate::model::NotificationMessages;
use crate::service::ConfigQuery;
use crate::service::ConfigQueryResult;
use crate::service::ConfigService;
use crate::watch::NotificationService;
use crate::watch::PollOutcome;
use crate::watch::PollRequest;
use crate::Error;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigQueryParams {
    env: String,
    data_center: Option<String>,
    release_key: Option<String>,
    /// JSON encoded [`NotificationMessages`]
    messages: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationParams {
    app_id: String,
    cluster: String,
    env: String,
    data_center: Option<String>,
    /// JSON array of `{namespaceName, notificationId}`
    notifications: String,
    timeout_ms: Option<u64>,
}

pub fn routes(
    config_service: ConfigService,
    notification_service: NotificationService,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let configs = warp::get()
        .and(warp::path!("configs" / String / String / String))
        .and(warp::query::<ConfigQueryParams>())
        .and(warp::any().map(move || config_service.clone()))
        .and_then(query_config_handler);

    let notifications = warp::get()
        .and(warp::path!("notifications" / "v2"))
        .and(warp::query::<NotificationParams>())
        .and(warp::any().map(move || notification_service.clone()))
        .and_then(poll_notifications_handler);

    configs.or(notifications).unify()
}

async fn query_config_handler(
    app_id: String,
    cluster: String,
    namespace: String,
    params: ConfigQueryParams,
    service: ConfigService,
) -> Result<Response, Infallible> {
    let query = ConfigQuery {
        app_id,
        cluster,
        env: params.env,
        namespace,
        data_center: params.data_center.filter(|dc| !dc.is_empty()),
        client_release_key: params.release_key,
        messages: params.messages.as_deref().and_then(parse_messages),
    };

    let response = match service.query_config(&query).await {
        Ok(ConfigQueryResult::Found(config)) => warp::reply::json(&config).into_response(),
        Ok(ConfigQueryResult::NotModified) => StatusCode::NOT_MODIFIED.into_response(),
        Ok(ConfigQueryResult::NotFound) => warp::reply::with_status(
            format!(
                "Could not load configurations with appId: {}, clusterName: {}, namespace: {}",
                query.app_id, query.cluster, query.namespace
            ),
            StatusCode::NOT_FOUND,
        )
        .into_response(),
        Err(e) => error_response(e),
    };
    Ok(response)
}

async fn poll_notifications_handler(
    params: NotificationParams,
    service: NotificationService,
) -> Result<Response, Infallible> {
    let notifications: Vec<ConfigNotification> = match serde_json::from_str(&params.notifications) {
        Ok(notifications) => notifications,
        Err(e) => return Ok(error_response(Error::Json(e))),
    };

    let request = PollRequest {
        app_id: params.app_id,
        cluster: params.cluster,
        env: params.env,
        data_center: params.data_center.filter(|dc| !dc.is_empty()),
        notifications,
        timeout: params.timeout_ms.map(Duration::from_millis),
    };

    let response = match service.poll_notifications(request).await {
        Ok(PollOutcome::Changed(notifications)) => warp::reply::json(&notifications).into_response(),
        Ok(PollOutcome::NotModified) => StatusCode::NOT_MODIFIED.into_response(),
        Err(e) => error_response(e),
    };
    Ok(response)
}

/// Malformed messages are ignored; the read then trusts the cache as is
fn parse_messages(raw: &str) -> Option<NotificationMessages> {
    match serde_json::from_str(raw) {
        Ok(messages) => Some(messages),
        Err(e) => {
            debug!(error = %e, "ignoring malformed notification messages");
            None
        }
    }
}

fn error_response(e: Error) -> Response {
    match e {
        Error::InvalidRequest(message) => warp::reply::with_status(message, StatusCode::BAD_REQUEST).into_response(),
        Error::Json(e) => warp::reply::with_status(e.to_string(), StatusCode::BAD_REQUEST).into_response(),
        other => {
            error!(error = %other, "request failed");
            warp::reply::with_status(other.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
        }
    }
}
