//! `serve` command.

use anyhow::{Context, Result};

use tola_resources::cache::ResourceSetCache;
use tola_resources::config::Config;
use tola_resources::log;
use tola_resources::middleware::ResourceMiddleware;
use tola_resources::serve::bind_server;

/// Build the configured set, mount it on a cache-backed middleware and serve
/// it until Ctrl+C.
pub fn serve(config: &Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let cache = ResourceSetCache::new(&config.cache);
    let middleware = ResourceMiddleware::with_cache(&config.serve.context_path, cache.clone());

    runtime.block_on(async {
        cache.spawn_sweeper();
        let set = config.build_set().await?;
        middleware.mount(&set).await;
        log!("serve"; "mounted {} resources", set.len());
        anyhow::Ok(())
    })?;

    let server = bind_server(&config.serve)?;
    server.run(middleware, runtime.handle().clone())?;
    cache.dispose();
    Ok(())
}
