//! Live sale feed.
//!
//! ```text
//! ingest ──► broadcast::Sender<SaleEvent> ──► /ws/sales subscriber ──► JSON text frames
//! ```
//!
//! The feed is push-only. Client frames other than Close are ignored.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::state::AppState;
use tally_core::SaleEvent;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws/sales", get(sales_feed))
}

/// GET /ws/sales
async fn sales_feed(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let rx = state.subscribe();
    ws.on_upgrade(move |socket| stream_sales(socket, rx))
}

async fn stream_sales(socket: WebSocket, mut rx: broadcast::Receiver<SaleEvent>) {
    info!("Live feed subscriber connected");
    let (mut sender, mut receiver) = socket.split();

    let forward = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let Some(frame) = sale_frame(&event) else {
                        continue;
                    };
                    if sender.send(frame).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Live feed subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(?e, "Live feed socket error");
                break;
            }
        }
    }

    forward.abort();
    info!("Live feed subscriber disconnected");
}

/// One sale as a JSON text frame.
fn sale_frame(event: &SaleEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!(sale_id = event.id, error = %e, "Failed to encode live feed frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Asia::Kolkata;
    use serde_json::Value;
    use tally_core::{Money, OccurredAt, PaymentMode};

    #[test]
    fn test_sale_frame_is_camel_case_json() {
        let event = SaleEvent {
            id: 7,
            amount: Money::from_cents(9900),
            mode: PaymentMode::Electronic,
            occurred_at: OccurredAt::new(Utc.with_ymd_and_hms(2024, 6, 3, 4, 30, 0).unwrap(), Kolkata),
        };

        let Some(Message::Text(text)) = sale_frame(&event) else {
            panic!("expected a text frame");
        };
        let json: Value = serde_json::from_str(text.as_str()).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["mode"], "electronic");
        assert_eq!(json["occurredAt"]["date"], "2024-06-03");
        assert_eq!(json["occurredAt"]["time"], "10:00:00");
    }
}
