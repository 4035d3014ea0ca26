//! Authentication middleware.
//!
//! Two guards protect the API:
//! - [`admin_auth`]: device administration routes, `Authorization: Bearer <ADMIN_TOKEN>`
//! - [`device_auth`]: device-facing routes, `Authorization: Bearer <apiKey>`

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{error::AppError, models::device::HrmDevice, state::AppState};

/// Authentication context attached to device-authenticated requests.
///
/// Inserted into the request's extension map; handlers extract it with
/// `Extension<DeviceContext>`.
#[derive(Debug, Clone)]
pub struct DeviceContext {
    pub device_id: Uuid,
    pub organization: Uuid,
    pub name: String,
}

/// Extract the bearer token from the `Authorization` header.
fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Whether `peer` may authenticate as `device`.
///
/// An empty allow-list admits every address. Entries that are not valid IP
/// addresses never match.
fn ip_allowed(device: &HrmDevice, peer: Option<IpAddr>) -> bool {
    if device.allowed_ips.is_empty() {
        return true;
    }
    let Some(peer) = peer else {
        return false;
    };
    device
        .allowed_ips
        .iter()
        .filter_map(|entry| entry.trim().parse::<IpAddr>().ok())
        .any(|allowed| allowed == peer)
}

/// Administration guard.
///
/// When no admin token is configured every request passes through.
pub async fn admin_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = state.admin_token.as_deref() {
        match bearer_token(&request) {
            Some(token) if token == expected => {}
            _ => {
                tracing::debug!("Rejected administration request");
                return Err(AppError::Unauthorized);
            }
        }
    }

    Ok(next.run(request).await)
}

/// Device API key guard.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <apiKey>` header from request
/// 2. Look up the device owning the key
/// 3. Reject inactive devices
/// 4. Reject peers outside the device's `allowedIps`
/// 5. Inject `DeviceContext` into the request and call the next handler
pub async fn device_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let api_key = bearer_token(&request)
        .map(str::to_owned)
        .ok_or(AppError::InvalidApiKey)?;

    let device = state
        .store
        .find_by_api_key(&api_key)
        .await?
        .ok_or(AppError::InvalidApiKey)?;

    if !device.active {
        tracing::info!(device_id = %device.id, "Rejected inactive device");
        return Err(AppError::DeviceInactive);
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    if !ip_allowed(&device, peer) {
        tracing::warn!(device_id = %device.id, peer = ?peer, "Rejected device request from disallowed address");
        return Err(AppError::IpNotAllowed);
    }

    request.extensions_mut().insert(DeviceContext {
        device_id: device.id,
        organization: device.organization,
        name: device.name,
    });

    Ok(next.run(request).await)
}
