use std::sync::atomic::{AtomicU32, Ordering};

use actix::{Actor, ActorContext, AsyncContext, Handler, Message, Running, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tokio::sync::mpsc::Receiver;

use lobby_system::{serde_json, ConnectionId, ServerMessage};

use crate::dispatch::Dispatcher;
use crate::registry::SessionRegistry;

const EGRESS_CAPACITY: usize = 32;

/// Hands out connection ids, starting at 1.
pub struct ConnectionIdSource(AtomicU32);

impl ConnectionIdSource {
    pub fn new() -> Self {
        Self(AtomicU32::new(1))
    }

    /// Wraps around after `u32::MAX` ids.
    pub fn next(&self) -> ConnectionId {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for ConnectionIdSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionActorMessage(ServerMessage);

struct ConnectionActor {
    dispatcher: Dispatcher,
    egress_rx: Option<Receiver<ServerMessage>>,
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let connection_id = self.dispatcher.connection_id();
        let addr = ctx.address().recipient();

        if let Some(mut rx) = self.egress_rx.take() {
            tokio::spawn(async move {
                log::debug!("Egress of connection {} started", connection_id);
                while let Some(message) = rx.recv().await {
                    if addr.do_send(ConnectionActorMessage(message)).is_err() {
                        break;
                    }
                }
                log::debug!("Egress of connection {} terminated", connection_id);
            });
        }
        log::info!("Connection {} opened", connection_id);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        self.dispatcher.leave();
        log::info!("Connection {} closed", self.dispatcher.connection_id());
        Running::Stop
    }
}

/// Ingress
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Text(text)) => {
                log::debug!("Ingress {}", text);
                self.dispatcher.dispatch_text(&text);
            }
            Ok(ws::Message::Binary(bin)) => {
                log::warn!(
                    "Ignoring binary frame of {} bytes from {}",
                    bin.len(),
                    self.dispatcher.connection_id()
                );
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => (),
            Err(e) => {
                log::warn!(
                    "Protocol error on connection {}: {}",
                    self.dispatcher.connection_id(),
                    e
                );
                ctx.stop();
            }
        }
    }
}

/// Egress
impl Handler<ConnectionActorMessage> for ConnectionActor {
    type Result = ();

    fn handle(
        &mut self,
        msg: ConnectionActorMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> Self::Result {
        match serde_json::to_string(&msg.0) {
            Ok(text) => {
                log::debug!("Egress {}", text);
                ctx.text(text);
            }
            Err(e) => log::error!("Could not encode {:?}: {}", msg.0, e),
        }
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    registry: web::Data<SessionRegistry>,
    ids: web::Data<ConnectionIdSource>,
) -> Result<HttpResponse, Error> {
    let (tx, rx) = tokio::sync::mpsc::channel(EGRESS_CAPACITY);
    let dispatcher = Dispatcher::new(ids.next(), tx, registry.into_inner());
    ws::start(
        ConnectionActor {
            dispatcher,
            egress_rx: Some(rx),
        },
        &req,
        stream,
    )
}
