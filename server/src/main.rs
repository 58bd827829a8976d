use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use clap::Parser;

use lobby_server::config::ServerConfig;
use lobby_server::connection::ConnectionIdSource;
use lobby_server::handlers::root;
use lobby_server::registry::SessionRegistry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = ServerConfig::parse();
    let registry = web::Data::new(SessionRegistry::new(
        config.policy(),
        config.mailbox_capacity,
    ));
    let ids = web::Data::new(ConnectionIdSource::new());

    log::info!("Listening on {} with {:?}", config.address(), config.policy());

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(registry.clone())
            .app_data(ids.clone())
            .configure(root)
    })
    .bind(config.address())?
    .run()
    .await
}
