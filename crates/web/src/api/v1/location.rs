use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, State},
    http::Method,
    routing::{get, on},
    Extension, Json, Router,
};
use model::position::{PositionReport, VehiclePosition};
use serde_json::Value;
use tracking::database::Database;
use utility::{id::Id, let_also::LetAlso};

use crate::{
    common::{
        route_not_found, schema, HateoasResult, RouteErrorResponse, VecResponse,
        METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::base_url::BaseUrl,
    WebState,
};

use super::{realtime, vehicles};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/location{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/schema", get(schema::<PositionReport>))
        .route("/ws", get(realtime::websocket::<D>))
        .route("/stream", get(realtime::event_stream::<D>))
        .route("/:vehicle_id", get(get_location::<D>))
        .route("/", get(get_locations::<D>).post(report_location::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn report_location<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { tracking_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    body: Result<Json<Value>, JsonRejection>,
) -> HateoasResult<VehiclePosition> {
    let error = |why: RouteErrorResponse| {
        why.with_method(&Method::POST)
            .with_uri(original_uri.path())
    };

    let Json(body) = body.map_err(|why| error(why.into()))?;
    tracking_client
        .report_position(&body)
        .await
        .map(|position| position_hateoas(position, base_url).json())
        .map_err(|why| error(why.into()))
}

async fn get_location<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    Path(vehicle_id): Path<String>,
    State(WebState { tracking_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VehiclePosition> {
    tracking_client
        .get_position(Id::new(vehicle_id))
        .await
        .map(|position| position_hateoas(position, base_url).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn get_locations<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { tracking_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<VehiclePosition>>> {
    tracking_client
        .get_positions()
        .await
        .map(|positions| {
            positions
                .into_iter()
                .map(|position| position_hateoas(position, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::non_paginated(data).hateoas().json())
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

pub(crate) fn position_hateoas(
    position: VehiclePosition,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<VehiclePosition> {
    let id = position.vehicle_id.clone();
    hateoas::Response::builder(position, base_url)
        .link("self", resource!("/{}", id))
        .link("vehicle", vehicles::resource!("/{}", id))
        .link("updates", resource!("/stream?vehicleId={}", id))
        .build()
}
