use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::graphql::{build_schema, RendezveuxSchema};
use crate::posts::{sqlite_actions, PostActions};
use crate::revalidate::PathRevalidator;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub posts: PostActions,
    pub revalidator: Arc<PathRevalidator>,
    pub graphql_schema: RendezveuxSchema,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let revalidator = Arc::new(PathRevalidator::new());
        let posts = sqlite_actions(db.clone(), revalidator.clone(), config.feed);

        Self {
            db,
            config,
            posts,
            revalidator,
            graphql_schema: build_schema(),
        }
    }
}
