use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use cricd_ingest::config::Config;
use cricd_ingest::logging::{self, log, obj, v_int, v_str, Domain, Level};
use cricd_ingest::pipeline::{failed_path, pending_scoresheets, Pipeline};
use cricd_ingest::publish::HttpEventStore;
use cricd_ingest::resolver::EntityResolver;
use cricd_ingest::store::HttpEntityStore;
use cricd_ingest::translate::DeliveryTranslator;
use tokio::time::{interval, Duration, MissedTickBehavior};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    logging::init(Level::from_env());
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("entity_store", v_str(&format!("{}:{}", cfg.entity_store_host, cfg.entity_store_port))),
            ("event_store", v_str(&format!("{}:{}", cfg.event_store_host, cfg.event_store_port))),
            ("game_path", v_str(&cfg.game_path)),
            ("poll_secs", v_int(cfg.poll_secs)),
        ]),
    );

    let store = Arc::new(HttpEntityStore::new(&cfg)?);
    let sink = Arc::new(HttpEventStore::new(&cfg)?);
    let resolver = Arc::new(EntityResolver::from_config(store, &cfg));
    let _sweepers = resolver.spawn_sweepers(cfg.cache_sweep_interval);
    let pipeline = Pipeline::new(DeliveryTranslator::new(resolver), sink);

    let game_path = PathBuf::from(&cfg.game_path);
    let mut ticker = interval(Duration::from_secs(cfg.poll_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                log(Level::Info, Domain::System, "shutdown", obj(&[]));
                return Ok(());
            }
        }
        let files = pending_scoresheets(&game_path)
            .await
            .with_context(|| format!("cannot read game directory {}", game_path.display()))?;
        for path in files {
            handle_file(&pipeline, &path).await;
        }
    }
}

async fn handle_file(pipeline: &Pipeline<HttpEntityStore, HttpEventStore>, path: &Path) {
    let file = path.display().to_string();
    match pipeline.process_file(path).await {
        Ok(_) => {
            if let Err(e) = tokio::fs::remove_file(path).await {
                log(
                    Level::Error,
                    Domain::Scoresheet,
                    "remove_failed",
                    obj(&[("file", v_str(&file)), ("error", v_str(&e.to_string()))]),
                );
            }
        }
        Err(e) => {
            let target = failed_path(path);
            log(
                Level::Error,
                Domain::Scoresheet,
                "file_rejected",
                obj(&[
                    ("file", v_str(&file)),
                    ("error_kind", v_str(e.kind())),
                    ("error", v_str(&e.to_string())),
                    ("moved_to", v_str(&target.display().to_string())),
                ]),
            );
            if let Err(e) = tokio::fs::rename(path, &target).await {
                log(
                    Level::Error,
                    Domain::Scoresheet,
                    "rename_failed",
                    obj(&[("file", v_str(&file)), ("error", v_str(&e.to_string()))]),
                );
            }
        }
    }
}
