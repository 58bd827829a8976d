use crate::registry::SessionRegistry;
use crate::session::SessionMessage;
use actix_web::error;
use actix_web::web::{self, HttpResponse};
use actix_web::Result;
use lobby_system::serde::Deserialize;
use lobby_system::SessionSummary;

pub fn configure_session_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/sessions/{session_id}/")
            .name("session")
            .route(web::get().to(show_session)),
    );
}

#[derive(Deserialize)]
pub struct ShowSessionParam {
    session_id: String,
}

/// Summary of a live session. Unknown ids are not created.
pub async fn show_session(
    path: web::Path<ShowSessionParam>,
    registry: web::Data<SessionRegistry>,
) -> Result<HttpResponse> {
    let mut session_tx = registry
        .get(&path.session_id)
        .ok_or_else(|| error::ErrorNotFound("no such session"))?;

    let (tx, rx) = tokio::sync::oneshot::channel::<SessionSummary>();

    session_tx
        .send(SessionMessage::Describe { tx })
        .await
        .map_err(|_| error::ErrorInternalServerError("Internal Server Error"))?;

    let summary = rx
        .await
        .map_err(|_| error::ErrorInternalServerError("Receiver await error"))?;

    Ok(HttpResponse::Ok().json(summary))
}
