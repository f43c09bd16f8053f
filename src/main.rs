use std::sync::Arc;

use dotenvy::dotenv;
use snafu::ResultExt;

use coursegate::app::App;
use coursegate::error::{ApplicationError, HttpClientSnafu, ReplSnafu};
use coursegate::service::gateway::Gateway;
use coursegate::service::session::{FileStore, Profile, SessionStore};
use coursegate::{config, logger, repl};

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = config::load()?;

    let _guard = logger::init(&config)?;

    let gateway = Gateway::connect(config.endpoint.clone()).context(HttpClientSnafu)?;
    tracing::info!(endpoint = %gateway.endpoint(), "using backend");

    let store = FileStore::new(&config.profile_path);
    tracing::info!(path = %store.path().display(), "using profile store");

    let profile = Profile::open(SessionStore::new(Arc::new(store)));
    let mut app = App::new(Arc::new(gateway), profile);

    let mut repl = repl::Repl::new().context(ReplSnafu)?;
    repl::start(&mut repl, &mut app).await.context(ReplSnafu)
}
