//! Supervisor (C7): selects transport, drives the chosen engine,
//! honors shutdown, commits batches. Purges retention once at
//! startup, dispatches to the poll or push loop for the configured
//! transport, and closes the link before the store on the way out.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::link::datagram::UdpLink;
use crate::link::serial::SerialLink;
use crate::poll::PollEngine;
use crate::push::PushListener;
use crate::shutdown::ShutdownToken;
use crate::store::Store;

const RETENTION_DAYS: i64 = 365;
const PUSH_POLL_TIMEOUT_S: f64 = 0.5;

pub async fn run(config: Config, shutdown: ShutdownToken) -> Result<()> {
    let mut store = Store::open(config.db_path())
        .await
        .context("failed to open store")?;
    store
        .purge(RETENTION_DAYS)
        .await
        .context("failed to purge old readings at startup")?;

    match config {
        Config::Rs485 {
            port,
            baudrate,
            interval_secs,
            devices,
            ..
        } => {
            info!(
                port = %port,
                baudrate,
                devices = ?devices,
                interval_secs,
                "starting: transport=rs485"
            );
            let link = SerialLink::open(&port, baudrate)
                .with_context(|| format!("failed to open serial port {port}"))?;
            let mut engine = PollEngine::new(link, devices);

            let result = run_poll_loop(&mut engine, &mut store, Duration::from_secs(interval_secs), &shutdown).await;

            engine.close().await;
            store.close().await.context("failed to close store")?;
            info!("shutting down");
            result
        }
        Config::Udp { port, .. } => {
            info!(port, "starting: transport=udp");
            let link = UdpLink::bind(port)
                .await
                .with_context(|| format!("failed to bind udp port {port}"))?;
            let mut listener = PushListener::new(link);

            let result = run_push_loop(&mut listener, &mut store, &shutdown).await;

            listener.close().await;
            store.close().await.context("failed to close store")?;
            info!("shutting down");
            result
        }
    }
}

async fn run_poll_loop(
    engine: &mut PollEngine<SerialLink>,
    store: &mut Store,
    interval: Duration,
    shutdown: &ShutdownToken,
) -> Result<()> {
    let mut cycle = 0u64;
    while !shutdown.is_set() {
        let results = engine
            .poll_all(store)
            .await
            .context("fatal store error during poll cycle")?;
        cycle += 1;
        info!(
            cycle,
            responded = results.len(),
            devices = engine.device_count(),
            "cycle complete"
        );

        if !interval.is_zero() {
            shutdown.wait(interval).await;
        }
    }
    Ok(())
}

async fn run_push_loop(
    listener: &mut PushListener<UdpLink>,
    store: &mut Store,
    shutdown: &ShutdownToken,
) -> Result<()> {
    while !shutdown.is_set() {
        listener
            .receive(PUSH_POLL_TIMEOUT_S, store)
            .await
            .context("fatal store error during push receive")?;
    }
    Ok(())
}
