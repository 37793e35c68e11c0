use std::sync::Arc;
use tokio::sync::{watch, RwLock};

use toolwatch_core::alerts::{AlertBroadcaster, AlertStore};
use toolwatch_core::baseline::BaselineLearner;
use toolwatch_core::monitor::RiskMonitor;
use toolwatch_core::scorer::RiskScorer;
use toolwatch_core::tool_call::{JsonlFileSource, ToolCallSource};

use crate::cli::{Args, ScanArgs};
use crate::config;
use crate::notify;
use crate::server::{self, ApiState};

/// Wire the engine together and run until interrupted.
pub async fn run(args: Args) -> anyhow::Result<()> {
    let mut cfg = config::load(args.config.as_deref())?;
    if let Some(source) = &args.source {
        cfg.source_path = source.clone();
    }
    if let Some(listen) = &args.listen {
        cfg.server.listen = listen.clone();
    }

    let learner = Arc::new(RwLock::new(BaselineLearner::from_path(
        cfg.baseline_path(),
        cfg.baseline.clone(),
    )));
    let store = Arc::new(RwLock::new(AlertStore::new(cfg.alerts.max_alerts)));
    let broadcaster = AlertBroadcaster::new(cfg.alerts.broadcast_capacity);
    let source: Arc<dyn ToolCallSource> = Arc::new(JsonlFileSource::new(cfg.source_file()));

    let monitor = Arc::new(RiskMonitor::new(
        cfg.monitor.clone(),
        source,
        learner.clone(),
        store.clone(),
        broadcaster.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor_task = {
        let monitor = monitor.clone();
        tokio::spawn(async move { monitor.run(shutdown_rx).await })
    };

    let notifier_task = if cfg.notify.enabled {
        Some(notify::spawn(cfg.notify.clone(), broadcaster.clone()))
    } else {
        None
    };

    let server_task = if cfg.server.enabled {
        let state = ApiState {
            store,
            learner,
            broadcaster,
        };
        let app = server::router(state);
        let listener = tokio::net::TcpListener::bind(&cfg.server.listen).await?;
        tracing::info!(
            target: "toolwatch.server",
            listen = %cfg.server.listen,
            "alert feed listening"
        );
        Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(target: "toolwatch.server", error = %e, "server stopped");
            }
        }))
    } else {
        None
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!(target: "toolwatch", "shutting down");

    // Stop the timer loop; an in-flight baseline save completes before the
    // monitor task returns.
    let _ = shutdown_tx.send(true);
    let _ = monitor_task.await;
    if let Some(task) = server_task {
        task.abort();
    }
    if let Some(task) = notifier_task {
        task.abort();
    }

    Ok(())
}

/// Offline assessment of a recorded session: score every call in the file
/// and print the session-level reduction.
pub async fn scan(args: &ScanArgs) -> anyhow::Result<()> {
    let source = JsonlFileSource::new(shellexpand::tilde(&args.file).to_string());
    let calls = source.recent(usize::MAX).await?;
    let assessment = RiskScorer::new().session_risk(&calls);

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
    } else {
        println!(
            "session risk: {} ({} findings, {} critical, {} high, {} calls)",
            assessment.level,
            assessment.total_risks,
            assessment.critical_count,
            assessment.high_count,
            calls.len()
        );
        for risk in assessment.risks.iter().take(10) {
            println!("  [{}] {} — {}", risk.level, risk.category, risk.matched);
        }
    }
    Ok(())
}
