use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

use crate::accounts::Accounts;
use crate::auth::Credentials;
use crate::status::{Prober, ServerStatus};

/// Events a client may emit. Each frame is `{ "event": ..., "data": ... }`.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    Signup(Credentials),
    Login(Credentials),
    CheckServerStatus,
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    SignupError(String),
    SignupSuccess(String),
    LoginRes(LoginRes),
    ServerStatus(ServerStatus),
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct LoginRes {
    success: bool,
    message: String,
}

pub struct Gateway {
    accounts: Accounts,
    prober: Prober,
}

impl Gateway {
    pub fn new(accounts: Accounts, prober: Prober) -> Self {
        Self { accounts, prober }
    }

    /// Runs one event to completion. Every event gets exactly one reply.
    pub async fn handle(&self, event: ClientEvent) -> ServerEvent {
        match event {
            ClientEvent::Signup(creds) => match self.accounts.signup(&creds).await {
                Ok(()) => ServerEvent::SignupSuccess("User registered successfully".into()),
                Err(e) => ServerEvent::SignupError(e.message().into()),
            },
            ClientEvent::Login(creds) => {
                let res = match self.accounts.login(&creds).await {
                    Ok(()) => LoginRes {
                        success: true,
                        message: "Login successful".into(),
                    },
                    Err(e) => LoginRes {
                        success: false,
                        message: e.message().into(),
                    },
                };
                ServerEvent::LoginRes(res)
            }
            ClientEvent::CheckServerStatus => ServerEvent::ServerStatus(self.prober.check().await),
        }
    }

    /// Serves one websocket until the client goes away. Nothing is kept
    /// between events, so there's nothing to clean up afterwards.
    pub async fn connection(self: Arc<Self>, socket: WebSocket) {
        let id = Uuid::new_v4();
        let (mut tx, mut rx) = socket.split();

        info!("[{id}] connected");

        while let Some(msg) = rx.next().await {
            let msg = match msg {
                Ok(m) => m,
                Err(e) => {
                    warn!("[{id}] websocket error: {e}");
                    break;
                }
            };

            if msg.is_close() {
                break;
            }
            let Ok(text) = msg.to_str() else {
                trace!("[{id}] ignoring non-text frame");
                continue;
            };

            let event: ClientEvent = match serde_json::from_str(text) {
                Ok(ev) => ev,
                Err(e) => {
                    debug!("[{id}] ignoring unrecognised event: {e}");
                    continue;
                }
            };
            debug!("[{id}] {event:?}");

            let reply = self.handle(event).await;
            let json = match serde_json::to_string(&reply) {
                Ok(j) => j,
                Err(e) => {
                    error!("[{id}] couldn't serialise {reply:?}: {e:?}");
                    continue;
                }
            };

            if let Err(e) = tx.send(Message::text(json)).await {
                warn!("[{id}] send failed: {e}");
                break;
            }
        }

        info!("[{id}] disconnected");
    }
}
