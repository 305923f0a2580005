use axum::{
    extract::{FromRequest, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    connect::{
        ConnectErrorResponse, Result,
        interaction_log::{InteractionLog, InteractionSpan},
        status::{req, res},
    },
    flow::{FlowEvent, FlowState, transition},
    gateway::{mask, payin::PaymentOrder, status::map_status},
    state::AppState,
};

#[instrument(skip_all)]
pub async fn initiate(
    State(AppState { gateway, flows, .. }): State<AppState>,
    Json(request): Json<req::InitiateRequest>,
) -> Result<ConnectResponse<res::Initiated>> {
    let order = PaymentOrder::from(request);
    let mut span = InteractionSpan::enter();
    match gateway.initiate_payment(&order, &mut span).await {
        Ok(payment) => {
            let log = span.interaction_log("payment");
            let payment_id = payment.payment_id.clone();
            let ref_id = payment.ref_id.clone();
            let redirect_url = payment.redirect_url.to_string();
            let provider_status = payment.status.clone();

            let flow = transition(
                FlowState::new(order.environment),
                FlowEvent::Initiated(payment),
            );
            let flow_id = flows.insert(flow).await;
            tracing::info!(%flow_id, %ref_id, %payment_id, "Created payment");
            Ok(ConnectResponse::new(
                res::Initiated {
                    flow_id,
                    payment_id,
                    ref_id,
                    redirect_url,
                    provider_status,
                },
                vec![log],
            ))
        }
        Err(e) => {
            tracing::error!("Failed to create a payment: {e}");
            let log = span.interaction_log("payment");
            Err(ConnectErrorResponse::gateway(&e, vec![log]))
        }
    }
}

#[instrument(skip_all)]
pub async fn payment_status(
    State(AppState { gateway, .. }): State<AppState>,
    Path(payment_id): Path<String>,
    Query(query): Query<req::StatusQuery>,
) -> Result<ConnectResponse<res::Status>> {
    let mut span = InteractionSpan::enter();
    match gateway
        .payment_status(&payment_id, query.environment, &mut span)
        .await
    {
        Ok(details) => {
            let log = span.interaction_log("status");
            let mapping = map_status(&details.status);
            tracing::info!(%payment_id, status = ?mapping.status, "Dispatched payment status");
            Ok(ConnectResponse::new(
                res::Status::new(mapping, details),
                vec![log],
            ))
        }
        Err(e) => {
            tracing::error!(%payment_id, "Failed to fetch payment status: {e}");
            let log = span.interaction_log("status");
            Err(ConnectErrorResponse::gateway(&e, vec![log]))
        }
    }
}

#[instrument(skip_all)]
pub async fn flow_snapshot(
    State(AppState { flows, .. }): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> Result<ConnectResponse<res::Flow>> {
    let flow = flows
        .get(&flow_id)
        .await
        .ok_or_else(|| ConnectErrorResponse::flow_not_found(flow_id))?;
    Ok(ConnectResponse::new(res::Flow { flow_id, flow }, vec![]))
}

#[instrument(skip_all)]
pub async fn callback(
    State(AppState {
        flows,
        callback_parser,
        ..
    }): State<AppState>,
    Path(flow_id): Path<Uuid>,
    Json(request): Json<req::CallbackRequest>,
) -> Result<ConnectResponse<res::Flow>> {
    tracing::debug!(%flow_id, uri = %mask::secure_uri(&request.url), "Callback delivered");
    let outcome = callback_parser.parse(&request.url);
    let flow = flows
        .update(&flow_id, |flow| {
            let next = transition(flow, FlowEvent::Callback(outcome));
            (next.clone(), next)
        })
        .await
        .ok_or_else(|| ConnectErrorResponse::flow_not_found(flow_id))?;
    tracing::info!(%flow_id, phase = ?flow.phase, status = ?flow.status, "Callback processed");
    Ok(ConnectResponse::new(res::Flow { flow_id, flow }, vec![]))
}

#[instrument(skip_all)]
pub async fn poll(
    State(state): State<AppState>,
    Path(flow_id): Path<Uuid>,
    Query(query): Query<req::PollQuery>,
) -> Result<ConnectResponse<res::Poll>> {
    let flow = state
        .flows
        .update(&flow_id, |flow| {
            if flow.is_checking {
                return (flow, None);
            }
            let snapshot = flow.clone();
            (transition(flow, FlowEvent::PollStarted), Some(snapshot))
        })
        .await
        .ok_or_else(|| ConnectErrorResponse::flow_not_found(flow_id))?
        .ok_or_else(|| {
            ConnectErrorResponse::new(
                StatusCode::CONFLICT,
                "payment status check already in progress".into(),
                vec![],
            )
        })?;

    // The poll runs detached so the flow is written back even when the
    // client goes away. Dropping the guard stops a bounded poll early.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let flows = state.flows.clone();
    let task = tokio::spawn(run_poll(state, flow_id, flow, query.until_terminal, cancel));
    match task.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Status poll task failed: {e}");
            flows
                .update(&flow_id, |mut flow| {
                    flow.is_checking = false;
                    (flow, ())
                })
                .await;
            Err(ConnectErrorResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "status poll failed".into(),
                vec![],
            ))
        }
    }
}

async fn run_poll(
    state: AppState,
    flow_id: Uuid,
    flow: FlowState,
    until_terminal: bool,
    cancel: CancellationToken,
) -> Result<ConnectResponse<res::Poll>> {
    let outcome = if until_terminal {
        state
            .poller
            .poll_until_terminal(flow.clone(), &state.poll_policy, &cancel)
            .await
            .map(|report| (report.flow, report.logs, report.attempts, Some(report.stop)))
    } else {
        let mut logs = Vec::new();
        let polled = state.poller.poll(flow.clone(), &mut logs).await;
        polled.map(|next| (next, logs, 1, None))
    };

    match outcome {
        Ok((next, logs, attempts, stop)) => {
            if !state.flows.put(&flow_id, next.clone()).await {
                tracing::warn!("Flow was reset while its status was being checked");
                return Err(ConnectErrorResponse::new(
                    StatusCode::GONE,
                    format!("payment flow {flow_id} was reset"),
                    logs,
                ));
            }
            tracing::info!(%flow_id, status = ?next.status, attempts, "Payment status checked");
            Ok(ConnectResponse::new(
                res::Poll {
                    flow: res::Flow {
                        flow_id,
                        flow: next,
                    },
                    attempts,
                    stop,
                },
                logs,
            ))
        }
        Err(refused) => {
            state.flows.put(&flow_id, flow).await;
            tracing::warn!("Refused to poll payment status: {refused}");
            Err(ConnectErrorResponse::new(
                StatusCode::CONFLICT,
                refused.to_string(),
                vec![],
            ))
        }
    }
}

#[instrument(skip_all)]
pub async fn reset(
    State(AppState { flows, .. }): State<AppState>,
    Path(flow_id): Path<Uuid>,
) -> Result<ConnectResponse<res::Flow>> {
    let flow = flows
        .remove(&flow_id)
        .await
        .ok_or_else(|| ConnectErrorResponse::flow_not_found(flow_id))?;
    tracing::info!(%flow_id, "Payment flow discarded");
    Ok(ConnectResponse::new(
        res::Flow {
            flow_id,
            flow: transition(flow, FlowEvent::Reset),
        },
        vec![],
    ))
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse<T> {
    result: bool,
    logs: Vec<InteractionLog>,
    #[serde(flatten)]
    data: T,
}

impl<T> ConnectResponse<T> {
    pub fn new(data: T, logs: Vec<InteractionLog>) -> Self {
        Self {
            result: true,
            logs,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ConnectResponse<T> {
    fn into_response(self) -> axum::response::Response {
        tracing::debug!(data = %mask::secure_serializable(&self), "Connect API response payload");
        axum::Json(self).into_response()
    }
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/payments", post(initiate))
        .route("/payments/{payment_id}/status", get(payment_status))
        .route("/flows/{flow_id}", get(flow_snapshot).delete(reset))
        .route("/flows/{flow_id}/callback", post(callback))
        .route("/flows/{flow_id}/poll", post(poll))
}

/// `Json` extractor wrapper that customizes the error from `axum::extract::Json`
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: serde::de::DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ConnectErrorResponse;

    async fn from_request(
        req: axum::http::Request<axum::body::Body>,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(e) => Err(ConnectErrorResponse::new(
                e.status(),
                e.body_text(),
                vec![],
            )),
        }
    }
}
