use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, State},
    http::{Method, StatusCode},
    routing::{get, on},
    Extension, Json, Router,
};
use model::{position::Position, vehicle::Vehicle, WithId};
use serde::{Deserialize, Serialize};
use tracking::{database::Database, not_found_to_none};
use utility::{id::Id, let_also::LetAlso};

use crate::{
    common::{
        route_not_found, schema, HateoasResult, RouteErrorResponse, RouteResult,
        VecResponse, METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::base_url::BaseUrl,
    WebState,
};

use super::location;

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/vehicles{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/schema", get(schema::<Vehicle>))
        .route("/:id", get(get_vehicle::<D>))
        .route("/", get(get_vehicles::<D>).post(create_vehicle::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

/// A vehicle together with its last reported position, if any.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VehicleDto {
    #[serde(flatten)]
    vehicle: WithId<Vehicle>,
    current_location: Option<Position>,
}

#[derive(Debug, Deserialize)]
struct NewVehicle {
    id: Option<String>,
    #[serde(flatten)]
    vehicle: Vehicle,
}

async fn get_vehicles<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { tracking_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<VehicleDto>>> {
    let error = |why: RouteErrorResponse| {
        why.with_method(&Method::GET)
            .with_uri(original_uri.path())
    };

    let mut positions = tracking_client
        .get_positions()
        .await
        .map_err(|why| error(why.into()))?
        .into_iter()
        .map(|position| (position.vehicle_id, position.location))
        .collect::<HashMap<_, _>>();
    tracking_client
        .get_vehicles()
        .await
        .map(|vehicles| {
            vehicles
                .into_iter()
                .map(|vehicle| {
                    let current_location = positions.remove(&vehicle.id);
                    vehicle_hateoas(
                        VehicleDto {
                            vehicle,
                            current_location,
                        },
                        base_url.clone(),
                    )
                })
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::non_paginated(data).hateoas().json())
        })
        .map_err(|why| error(why.into()))
}

async fn get_vehicle<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { tracking_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VehicleDto> {
    let error = |why: RouteErrorResponse| {
        why.with_method(&Method::GET)
            .with_uri(original_uri.path())
    };

    let id = Id::new(id);
    let vehicle = tracking_client
        .get_vehicle(&id)
        .await
        .map_err(|why| error(why.into()))?;
    let current_location = not_found_to_none(tracking_client.get_position(id).await)
        .map_err(|why| error(why.into()))?
        .map(|position| position.location);
    Ok(vehicle_hateoas(
        VehicleDto {
            vehicle,
            current_location,
        },
        base_url,
    )
    .json())
}

async fn create_vehicle<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { tracking_client }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    body: Result<Json<NewVehicle>, JsonRejection>,
) -> RouteResult<(StatusCode, Json<hateoas::Response<VehicleDto>>)> {
    let error = |why: RouteErrorResponse| {
        why.with_method(&Method::POST)
            .with_uri(original_uri.path())
    };

    let Json(NewVehicle { id, vehicle }) = body.map_err(|why| error(why.into()))?;
    let vehicle = tracking_client
        .create_vehicle(id.map(Id::new), vehicle)
        .await
        .map_err(|why| error(why.into()))?;
    Ok((
        StatusCode::CREATED,
        vehicle_hateoas(
            VehicleDto {
                vehicle,
                current_location: None,
            },
            base_url,
        )
        .json(),
    ))
}

pub(crate) fn vehicle_hateoas(
    dto: VehicleDto,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<VehicleDto> {
    let id = dto.vehicle.id.clone();
    let located = dto.current_location.is_some();
    hateoas::Response::builder(dto, base_url)
        .link("self", resource!("/{}", id))
        .link_if(located, "location", location::resource!("/{}", id))
        .link("updates", location::resource!("/stream?vehicleId={}", id))
        .build()
}
