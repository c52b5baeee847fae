//! `serialize` command.

use anyhow::{Context, Result};

use tola_resources::config::Config;

/// Print the configured set's wire format to stdout.
pub fn serialize(config: &Config, pretty: bool) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let data = runtime.block_on(async {
        let set = config.build_set().await?;
        set.serialize()
            .await
            .context("Failed to serialize resource set")
    })?;

    let json = if pretty {
        serde_json::to_string_pretty(&data)?
    } else {
        serde_json::to_string(&data)?
    };
    println!("{json}");
    Ok(())
}
