//! Drive a coordinator against the in-memory fakes and print what it does.
//!
//! `RUST_LOG=vizij_playback_core=debug cargo run -p vizij-playback-core --example headless`

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use vizij_playback_core::{OwnerQueue, PlayerConfig};
use vizij_playback_test_fixtures::{FakeSource, Rig};

fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = PlayerConfig::from_json(r#"{ "auto_play": false }"#)?;
    let queue = Arc::new(OwnerQueue::new());
    let rig = Rig::with_dispatcher(config, queue.clone());
    rig.player.subscribe(|event| info!(?event, "player event"));

    rig.player.set_source(Some(FakeSource::new(1000)));
    info!(duration = ?rig.player.duration(), "content ready");

    // Wrap-around: 0.8 -> 1.0 -> 0.0 -> 0.1 over 900ms.
    let wrap = rig.player.play(0.2, 0.1, false);
    info!(animation = ?rig.engine.animation(0), "engine animation");

    // The compositor signals completion on its own thread.
    if let Some(signal) = rig.engine.complete_on_thread(0) {
        signal
            .join()
            .map_err(|_| anyhow::anyhow!("compositor thread panicked"))?;
    }
    info!(pending = queue.len(), playing = rig.player.is_playing(), "before drain");
    queue.run_pending();
    futures::executor::block_on(wrap);
    info!(playing = rig.player.is_playing(), "wrap play finished");

    let looped = rig.player.play(0.0, 1.0, true);
    rig.player.app_suspending();
    rig.player.app_resuming();
    rig.player.set_progress(0.5);
    futures::executor::block_on(looped);
    info!(progress = rig.player.progress(), "looped play stopped by set_progress");
    Ok(())
}
