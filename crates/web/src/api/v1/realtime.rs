//! Push transports for location updates.
//!
//! `GET /location/ws` upgrades to a WebSocket carrying JSON frames:
//!
//! * server to client: `{"event": "locationUpdate", "data": {..}}` and
//!   `{"event": "error", "data": {"message": ".."}}`
//! * client to server: `{"action": "subscribe", "vehicleId": ".."}` and
//!   `{"action": "unsubscribe", "vehicleId": ".."}`. Without a `vehicleId`
//!   the action applies to every vehicle.
//!
//! `GET /location/stream` is a read-only Server-Sent-Events variant.
//!
//! Both accept `?vehicleId=` to start scoped to a single vehicle. Otherwise the
//! connection starts out receiving every vehicle until the client subscribes
//! to a specific one.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        OriginalUri, Query, State,
    },
    http::Method,
    response::{
        sse::{Event, KeepAlive, Sse},
        Response,
    },
};
use axum_extra::TypedHeader;
use futures::stream::{self, Stream, StreamExt};
use model::{position::LocationUpdate, topic::Topic};
use serde::{Deserialize, Serialize};
use tracking::{client::Client, database::Database, registry::Session, RequestError};

use crate::{
    common::{RouteErrorResponse, RouteResult},
    WebState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscriptionQuery {
    vehicle_id: Option<String>,
}

impl SubscriptionQuery {
    fn topic(&self) -> Option<Topic> {
        self.vehicle_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(Topic::vehicle)
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
enum ServerEvent {
    LocationUpdate(LocationUpdate),
    Error { message: String },
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum ClientCommand {
    Subscribe {
        #[serde(rename = "vehicleId", default)]
        vehicle_id: Option<String>,
    },
    Unsubscribe {
        #[serde(rename = "vehicleId", default)]
        vehicle_id: Option<String>,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum Change {
    Join(Topic),
    Leave(Topic),
}

/// Tracks whether a socket still listens to every vehicle only because it
/// never asked for a specific one.
#[derive(Debug)]
struct Scope {
    implicit_all: bool,
}

impl Scope {
    /// Returns the scope and the topic to join first.
    fn new(topic: Option<Topic>) -> (Self, Topic) {
        match topic {
            Some(topic) => (Self { implicit_all: false }, topic),
            None => (Self { implicit_all: true }, Topic::All),
        }
    }

    fn apply(&mut self, command: ClientCommand) -> Result<Vec<Change>, String> {
        let (subscribe, vehicle_id) = match command {
            ClientCommand::Subscribe { vehicle_id } => (true, vehicle_id),
            ClientCommand::Unsubscribe { vehicle_id } => (false, vehicle_id),
        };
        let topic = match vehicle_id.as_deref().map(str::trim) {
            None => Topic::All,
            Some("") => return Err("`vehicleId` must not be empty.".to_owned()),
            Some(id) => Topic::vehicle(id),
        };

        let mut changes = vec![];
        if topic.is_all() {
            self.implicit_all = false;
            changes.push(if subscribe {
                Change::Join(topic)
            } else {
                Change::Leave(topic)
            });
        } else if subscribe {
            changes.push(Change::Join(topic));
            // join first, so no update slips through in between
            if std::mem::take(&mut self.implicit_all) {
                changes.push(Change::Leave(Topic::All));
            }
        } else {
            changes.push(Change::Leave(topic));
        }
        Ok(changes)
    }
}

pub(crate) async fn websocket<D: Database>(
    ws: WebSocketUpgrade,
    State(WebState { tracking_client }): State<WebState<D>>,
    Query(query): Query<SubscriptionQuery>,
) -> Response {
    let topic = query.topic();
    ws.on_upgrade(move |socket| handle_socket(socket, tracking_client, topic))
}

async fn handle_socket<D: Database>(
    mut socket: WebSocket,
    client: Client<D>,
    topic: Option<Topic>,
) {
    let mut session = match client.connect().await {
        Ok(session) => session,
        Err(why) => {
            log::error!("could not register websocket: {}", why);
            return;
        }
    };
    let (mut scope, initial) = Scope::new(topic);
    if let Err(why) = session.subscribe(initial).await {
        log::error!("could not subscribe websocket {}: {}", session.id(), why);
        return;
    }
    log::info!("websocket {} opened", session.id());

    loop {
        tokio::select! {
            update = session.recv() => {
                let Some(update) = update else {
                    break;
                };
                if send(&mut socket, &ServerEvent::LocationUpdate(update)).await.is_err() {
                    break;
                }
            }
            message = socket.recv() => match message {
                Some(Ok(Message::Text(text))) => {
                    if !handle_command(&text, &mut scope, &session, &mut socket).await {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(why)) => {
                    log::debug!("websocket {} failed: {}", session.id(), why);
                    break;
                }
            },
        }
    }

    let id = session.id();
    session.close().await;
    match client.registry_stats().await {
        Ok(stats) => log::info!(
            "websocket {} closed, {} connections left",
            id,
            stats.connections
        ),
        Err(why) => log::info!("websocket {} closed ({})", id, why),
    }
}

/// Returns `false` if the socket should be closed.
async fn handle_command(
    text: &str,
    scope: &mut Scope,
    session: &Session,
    socket: &mut WebSocket,
) -> bool {
    let changes = serde_json::from_str::<ClientCommand>(text)
        .map_err(|why| format!("Unknown command: {}", why))
        .and_then(|command| scope.apply(command));
    let changes = match changes {
        Ok(changes) => changes,
        Err(message) => return send(socket, &ServerEvent::Error { message }).await.is_ok(),
    };
    for change in changes {
        let result = match change {
            Change::Join(topic) => session.subscribe(topic).await,
            Change::Leave(topic) => session.unsubscribe(topic).await,
        };
        if let Err(why) = result {
            log::error!("websocket {} lost its registry: {}", session.id(), why);
            return false;
        }
    }
    true
}

async fn send(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(text) => socket.send(Message::Text(text)).await,
        Err(why) => {
            log::error!("could not serialize {:?}: {}", event, why);
            Ok(())
        }
    }
}

pub(crate) async fn event_stream<D: Database>(
    user_agent: Option<TypedHeader<headers::UserAgent>>,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { tracking_client }): State<WebState<D>>,
    Query(query): Query<SubscriptionQuery>,
) -> RouteResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let error = |why: RequestError| {
        RouteErrorResponse::from(why)
            .with_method(&Method::GET)
            .with_uri(original_uri.path())
    };

    let session = tracking_client.connect().await.map_err(error)?;
    let topic = query.topic().unwrap_or(Topic::All);
    session
        .subscribe(topic.clone())
        .await
        .map_err(|why| error(why.into()))?;
    log::info!(
        "`{}` listens to {} as {}",
        user_agent
            .as_ref()
            .map(|TypedHeader(agent)| agent.as_str())
            .unwrap_or("unknown client"),
        topic,
        session.id()
    );

    // dropping the stream drops the session, which disconnects it
    let updates = stream::unfold(session, |mut session| async move {
        session.recv().await.map(|update| (update, session))
    })
    .map(|update| {
        Event::default()
            .event(LocationUpdate::EVENT_NAME)
            .json_data(update)
    });

    Ok(Sse::new(updates).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use model::{position::LocationUpdate, topic::Topic};
    use serde_json::json;
    use utility::id::Id;

    use super::{Change, ClientCommand, Scope, ServerEvent, SubscriptionQuery};

    fn command(value: serde_json::Value) -> ClientCommand {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_client_commands() {
        assert_eq!(
            command(json!({ "action": "subscribe", "vehicleId": "B1" })),
            ClientCommand::Subscribe {
                vehicle_id: Some("B1".to_owned())
            }
        );
        assert_eq!(
            command(json!({ "action": "unsubscribe" })),
            ClientCommand::Unsubscribe { vehicle_id: None }
        );
        assert!(
            serde_json::from_value::<ClientCommand>(json!({ "action": "shout" })).is_err()
        );
    }

    #[test]
    fn location_update_frame() {
        let event = ServerEvent::LocationUpdate(LocationUpdate {
            vehicle_id: Id::from("B1"),
            latitude: 13.08,
            longitude: 80.27,
            observed_at: Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap(),
        });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "locationUpdate",
                "data": {
                    "vehicleId": "B1",
                    "latitude": 13.08,
                    "longitude": 80.27,
                    "observedAt": "2024-07-01T08:00:00Z"
                }
            })
        );
    }

    #[test]
    fn first_vehicle_subscription_drops_implicit_all() {
        let (mut scope, initial) = Scope::new(None);
        assert_eq!(initial, Topic::All);

        let changes = scope
            .apply(ClientCommand::Subscribe {
                vehicle_id: Some("B1".to_owned()),
            })
            .unwrap();
        assert_eq!(
            changes,
            vec![Change::Join(Topic::vehicle("B1")), Change::Leave(Topic::All)]
        );

        let changes = scope
            .apply(ClientCommand::Subscribe {
                vehicle_id: Some("B2".to_owned()),
            })
            .unwrap();
        assert_eq!(changes, vec![Change::Join(Topic::vehicle("B2"))]);
    }

    #[test]
    fn explicit_all_subscription_is_kept() {
        let (mut scope, _) = Scope::new(None);
        scope
            .apply(ClientCommand::Subscribe { vehicle_id: None })
            .unwrap();
        let changes = scope
            .apply(ClientCommand::Subscribe {
                vehicle_id: Some("B1".to_owned()),
            })
            .unwrap();
        assert_eq!(changes, vec![Change::Join(Topic::vehicle("B1"))]);
    }

    #[test]
    fn scoped_connections_start_on_their_vehicle() {
        let query = SubscriptionQuery {
            vehicle_id: Some(" B7 ".to_owned()),
        };
        let (mut scope, initial) = Scope::new(query.topic());
        assert_eq!(initial, Topic::vehicle("B7"));
        assert!(scope
            .apply(ClientCommand::Subscribe {
                vehicle_id: Some(" ".to_owned())
            })
            .is_err());
        assert_eq!(SubscriptionQuery::default().topic(), None);
    }
}
