//! Index commands.

use std::time::Duration;

use jukebox::Jukebox;

/// Show configured indexes
pub fn cmd_indexes(jukebox: &Jukebox) -> anyhow::Result<()> {
    let sources = jukebox.configured_indexes();
    if sources.is_empty() {
        println!("No indexes configured.");
        return Ok(());
    }
    for source in sources {
        let state = if source.enabled { "enabled" } else { "disabled" };
        println!("{:<9} {}", state, source.url);
    }
    Ok(())
}

/// Run a full sync pass and report the loaded indexes
pub fn cmd_sync(jukebox: &mut Jukebox, timeout: Duration) -> anyhow::Result<()> {
    // init already started a pass unless this is the first run
    if !jukebox.is_busy() {
        jukebox.synchronize();
    }
    if !jukebox.wait_idle(timeout) {
        anyhow::bail!("Index sync did not finish within {:?}", timeout);
    }

    let loaded = jukebox.loaded_indexes();
    println!("Loaded {} index(es):", loaded.len());
    for index in loaded {
        println!("  {} ({}) - {}", index.name, index.id, index.url);
        if let Some(description) = &index.description {
            println!("    {}", description);
        }
    }
    Ok(())
}
