//! Common test infrastructure for cache integration tests.

use strata_cache::{create_pool, Pool, RedisCacheConfig};
use strata_core::AppContext;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::Redis;

/// Test Redis container wrapper.
///
/// Manages a Redis testcontainer lifecycle and provides a connection
/// pool pointed at it.
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    config: RedisCacheConfig,
    pool: Pool,
}

impl TestRedis {
    /// Starts a fresh Redis container and connects a pool to it.
    pub async fn new() -> Self {
        let container = Redis::default()
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let config = RedisCacheConfig {
            dsn: format!("redis://127.0.0.1:{port}"),
            pool_size: 5,
            connect_timeout_secs: 5,
            key_prefix: "strata".to_string(),
        };

        let pool = create_pool(&config).await.expect("Failed to create pool");

        Self {
            _container: container,
            config,
            pool,
        }
    }

    /// Returns a handle to the connection pool.
    #[allow(dead_code)]
    pub fn pool(&self) -> Pool {
        self.pool.clone()
    }

    /// Returns the connection configuration for this container.
    #[allow(dead_code)]
    pub fn config(&self) -> &RedisCacheConfig {
        &self.config
    }

    /// Application context used across cache tests.
    #[allow(dead_code)]
    pub fn context() -> AppContext {
        AppContext::new("test", "strata")
    }
}
