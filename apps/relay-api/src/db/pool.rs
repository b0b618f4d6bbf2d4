use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;

pub type DbPool = Pool<AsyncPgConnection>;

const POOL_MAX_SIZE: usize = 16;

/// Build the diesel-async connection pool for the primary store.
pub async fn connect(database_url: &str) -> DbPool {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder(manager)
        .max_size(POOL_MAX_SIZE)
        .build()
        .expect("failed to build connection pool");

    tracing::info!(max_size = POOL_MAX_SIZE, "primary store pool ready");

    pool
}
