use std::env;

use actix_web::{App, HttpServer};
use actix_web::middleware::Logger;
use log::{debug, info};

use sitecam::api;
use sitecam::config::Config;
use sitecam::db::Database;
use sitecam::logging;
use sitecam::recover::RecoverPanic;
use sitecam::Result;


#[actix_web::main]
async fn main() -> Result<()> {

    logging::init();

    debug!("loading configuration");
    let config = Config::load(env::args().nth(1))?;

    let db = Database::connect(&config)?;

    let listen = config.listen.clone();
    let api = api::configure(db, config);

    info!("listening on {}", listen);
    HttpServer::new(move || {
            App::new()
                .wrap(RecoverPanic)
                .wrap(Logger::default())
                .configure(api.clone())
        })
        .bind(&listen)?
        .run()
        .await?;

    info!("server stopped");
    Ok(())
}
