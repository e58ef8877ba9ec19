//! Registry HTTP Surface (§4.D, §6).

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::dto::{
    HeartbeatRequest, HeartbeatResponse, InstancesResponse, QueryRequest, QueryResponse, RegisterRequest,
    RegisterResponse, RotateTokenRequest, RotateTokenResponse, ServiceInstanceDto,
};
use crate::error::{CoreError, ErrorBuilder, ErrorCode, Result};
use crate::registry::{InstanceFilter, RegisterInput};

use super::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/heartbeat", post(heartbeat))
        .route("/registry/token/rotate", post(rotate_token))
        .route("/services/{service_name}", get(get_service))
        .route("/services/{service_name}/{instance_id}", get(get_instance))
        .route("/services", post(query))
        .route("/ping", get(ping))
}

async fn ping() -> &'static str {
    "pong"
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let input = RegisterInput {
        service_name: body.name,
        instance_id: body.instance_id,
        ip: body.address,
        port: crate::registry::validate_port(body.port)?,
        protocol: body.protocol.unwrap_or_default(),
        env: body.env,
        role: body.role,
        metadata: body.metadata,
    };
    let (instance, token) = state.registry.register(input).await?;
    let lease_expires_at = instance.last_heartbeat + chrono::Duration::milliseconds(instance.ttl_ms as i64);
    Ok((
        StatusCode::OK,
        Json(RegisterResponse {
            instance_id: instance.instance_id,
            service: instance.service_name,
            lease_expires_at,
            ttl: instance.ttl_ms,
            token: token.to_string(),
            message: "registered".into(),
        }),
    ))
}

async fn heartbeat(State(state): State<Arc<AppState>>, Json(body): Json<HeartbeatRequest>) -> Result<Json<HeartbeatResponse>> {
    if !state.registry.validate_token(&body.instance_id, &body.auth_token).await {
        return Err(ErrorBuilder::new(ErrorCode::InvalidToken, "token does not match current instance token").build());
    }
    let ttl = state.registry.heartbeat(&body.service_name, &body.instance_id).await?;
    let token = state.registry.rotate_token(&body.instance_id).await?;
    Ok(Json(HeartbeatResponse { status: "ok".into(), token: token.to_string(), ttl, message: "heartbeat accepted".into() }))
}

async fn rotate_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<RotateTokenRequest>,
) -> Result<Json<RotateTokenResponse>> {
    let presented = current_token_header(&headers)?;
    if !state.registry.validate_token(&body.instance_id, &presented).await {
        return Err(ErrorBuilder::new(ErrorCode::InvalidToken, "token does not match current instance token").build());
    }
    let token = state.registry.rotate_token(&body.instance_id).await?;
    Ok(Json(RotateTokenResponse { token: token.to_string() }))
}

async fn get_service(State(state): State<Arc<AppState>>, Path(service_name): Path<String>) -> Result<Json<InstancesResponse>> {
    let instances = state.registry.resolve(&service_name).await?;
    Ok(Json(InstancesResponse { instances: instances.into_iter().map(ServiceInstanceDto::from).collect() }))
}

async fn get_instance(
    State(state): State<Arc<AppState>>,
    Path((service_name, instance_id)): Path<(String, String)>,
) -> Result<Json<ServiceInstanceDto>> {
    state
        .registry
        .get(&service_name, &instance_id)
        .await
        .map(|instance| Json(ServiceInstanceDto::from(instance)))
        .ok_or_else(|| ErrorBuilder::new(ErrorCode::NotFound, "unknown service instance").build())
}

async fn query(State(state): State<Arc<AppState>>, Json(body): Json<QueryRequest>) -> Result<Json<QueryResponse>> {
    let mut names = body.service_names.unwrap_or_default();
    if let Some(name) = body.service_name {
        names.push(name);
    }
    if names.is_empty() {
        return Err(ErrorBuilder::new(ErrorCode::BadRequest, "serviceName or serviceNames required").build());
    }
    let filter = InstanceFilter { role: None, env: None, metadata: body.metadata };
    let results = state.registry.query(&names, &filter, body.only_alive).await;
    let services: HashMap<String, Vec<ServiceInstanceDto>> =
        results.into_iter().map(|(name, instances)| (name, instances.into_iter().map(ServiceInstanceDto::from).collect())).collect();
    Ok(Json(QueryResponse { services }))
}

fn current_token_header(headers: &HeaderMap) -> Result<String, CoreError> {
    if let Some(value) = headers.get("x-instance-token").and_then(|v| v.to_str().ok()) {
        return Ok(value.to_string());
    }
    if let Some(value) = headers.get(axum::http::header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Ok(token.to_string());
        }
    }
    Err(ErrorBuilder::new(ErrorCode::Unauthorized, "missing instance token").build())
}
