use actix_web::{middleware::Logger, web, App, HttpServer};

use examgen_server::{
    app_state::AppState,
    config::Config,
    handlers::{generate_question_set, get_question_set},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    let host = config.web_server_host.clone();
    let port = config.web_server_port;

    let state = AppState::new(config)
        .await
        .map_err(|err| std::io::Error::other(err.to_string()))?;

    log::info!("starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .service(generate_question_set)
            .service(get_question_set)
    })
    .bind((host, port))?
    .run()
    .await
}
