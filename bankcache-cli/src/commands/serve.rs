//! Serve command - run the JSON API until interrupted

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};

use super::get_context;
use crate::server;

pub fn run(host: &str, port: u16) -> Result<()> {
    let ctx = get_context()?;
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("Invalid listen address {host}:{port}"))?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        server::serve(Arc::new(ctx), listener).await?;
        Ok::<(), anyhow::Error>(())
    })
}
