use std::sync::Arc;

use anyhow::Context as _;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nfs_gateway::config::Config;
use nfs_gateway::filetable::FileTable;
use nfs_gateway::server::{NfsServer, ServerState};
use nfs_gateway::tcp::NfsTcpListener;
use nfs_gateway::udp::NfsUdpSocket;
use nfs_gateway::vfs::Vfs;

/// Binds TCP and UDP on `addr` and serves both in the background.
async fn serve(addr: &str, server: &Arc<NfsServer>) -> anyhow::Result<()> {
    let tcp = NfsTcpListener::bind(addr, Arc::clone(server))
        .await
        .with_context(|| format!("cannot bind tcp {addr}"))?;
    let udp = NfsUdpSocket::bind(addr, Arc::clone(server))
        .await
        .with_context(|| format!("cannot bind udp {addr}"))?;
    tokio::spawn(async move {
        if let Err(e) = tcp.handle_forever().await {
            error!("tcp listener stopped: {:?}", e);
        }
    });
    tokio::spawn(async move {
        if let Err(e) = udp.handle_forever().await {
            error!("udp socket stopped: {:?}", e);
        }
    });
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    let filter = EnvFilter::try_new(config.logging.effective_level()).unwrap_or_else(|e| {
        eprintln!("Warning: invalid log filter ({e}), falling back to 'info'");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let export_name = config.export.mount_path();
    let files = FileTable::new(&config.export.path, config.device_table())
        .with_context(|| format!("cannot export {}", config.export.path.display()))?;
    info!(
        "exporting {} as {}{}",
        files.root().display(),
        export_name,
        if config.export.read_only { " (read-only)" } else { "" }
    );
    let vfs = Vfs::new(files, config.export.read_only);
    let bootparams = config.bootparam.to_params(&export_name);
    let state = ServerState::new(vfs, export_name.clone(), bootparams);
    let server = Arc::new(NfsServer::new(
        state,
        config.server.nfs_port,
        config.server.portmap_port,
    )?);

    serve(&config.server.nfs_addr(), &server).await?;
    if config.server.portmap_port != config.server.nfs_port {
        serve(&config.server.portmap_addr(), &server).await?;
    }
    let flush = server.spawn_flush_task(config.server.flush_interval());

    tokio::signal::ctrl_c().await.context("cannot wait for ctrl-c")?;
    info!("shutting down");
    flush.abort();
    server.shutdown().await;
    Ok(())
}
