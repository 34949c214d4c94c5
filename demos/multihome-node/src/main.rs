mod console;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tracing::{info, warn};

use castmesh_core::parse_peer_list;
use castmesh_runtime::logging::{self, LogFormat};
use castmesh_runtime::{FanoutHandle, MeshConfig, MultihomeBackend, SecurityConfig};

use console::{Command, Console, HELP};

#[derive(Parser, Debug)]
#[command(name = "multihome-node")]
#[command(author, version, about = "Console node joined to a castmesh cluster", long_about = None)]
struct Args {
    /// TLS key used for peer links
    #[arg(long, default_value = "./keys/snakeoil.key")]
    key: PathBuf,

    /// TLS certificate used for peer links
    #[arg(long, default_value = "./keys/snakeoil.crt")]
    cert: PathBuf,

    /// Comma-separated `[peerCN@]host:port` list; the CN defaults to the host
    #[arg(long, default_value = "")]
    peers: String,

    /// Secret signing peer tokens; must match on every instance
    #[arg(long, default_value = "insecuresharedkeystring")]
    sharedkey: String,

    /// Listen address for peer links
    #[arg(long, default_value = "0.0.0.0:30001")]
    grpchostport: SocketAddr,

    /// Plaintext, unauthenticated peer links. Never in production.
    #[arg(long)]
    insecure: bool,

    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn mesh_config(&self) -> Result<MeshConfig> {
        let peers = parse_peer_list(&self.peers);
        if peers.is_empty() {
            bail!("must provide peers to connect to (--peers)");
        }
        let security = if self.insecure {
            SecurityConfig::Insecure
        } else {
            SecurityConfig::Secure {
                cert_path: self.cert.clone(),
                key_path: self.key.clone(),
                shared_secret: self.sharedkey.as_bytes().to_vec(),
            }
        };
        Ok(MeshConfig::default()
            .with_listen_addr(self.grpchostport)
            .with_peers(peers)
            .with_security(security))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(if args.log_json { LogFormat::Json } else { LogFormat::Pretty })?;

    let console = Arc::new(Console::new(format!("console-{}", args.grpchostport.port())));
    let backend = Arc::new(
        MultihomeBackend::new(args.mesh_config()?, console.clone()).context("cannot start multihome backend")?,
    );
    info!(socket = console.socket_id(), peers = ?backend.peers(), "node started");
    println!("{HELP}");

    let (stop, stopped) = oneshot::channel::<()>();
    let mut server = {
        let backend = backend.clone();
        tokio::spawn(async move {
            backend
                .listen(async move {
                    let _ = stopped.await;
                })
                .await
        })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received shutdown signal");
                break;
            }
            result = &mut server => {
                result.context("listener task failed")??;
                bail!("listener stopped unexpectedly");
            }
            line = lines.next_line() => {
                let Some(line) = line.context("cannot read stdin")? else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => run(&backend, &console, command),
                    Ok(None) => {}
                    Err(e) => println!("{e}"),
                }
            }
        }
    }

    let _ = stop.send(());
    server.await.context("listener task failed")??;
    info!(stats = ?backend.stats(), "node stopped");
    Ok(())
}

fn run(backend: &MultihomeBackend, console: &Console, command: Command) {
    let sent = match command {
        Command::Join(room) => {
            console.join(&room);
            println!("joined room:{room}");
            return;
        }
        Command::Leave(room) => {
            console.leave(&room);
            println!("left room:{room}");
            return;
        }
        Command::Peers => {
            for peer in backend.peers() {
                println!("{peer}");
            }
            return;
        }
        Command::Stats => {
            match serde_json::to_string_pretty(&backend.stats()) {
                Ok(json) => println!("{json}"),
                Err(e) => warn!(error = %e, "cannot render stats"),
            }
            return;
        }
        Command::Help => {
            println!("{HELP}");
            return;
        }
        Command::Quit => return,
        Command::Broadcast { event, data } => backend.broadcast(&event, data),
        Command::Roomcast { room, event, data } => backend.roomcast(&room, &event, data),
        Command::Socketcast { socket_id, event, data } => backend.socketcast(&socket_id, &event, data),
    };

    match sent {
        Ok(handle) => report_in_background(handle),
        Err(e) => println!("{e}"),
    }
}

fn report_in_background(handle: FanoutHandle) {
    tokio::spawn(async move {
        let report = handle.report().await;
        if !report.is_complete() {
            println!(
                "delivered to {} peer(s), {} failed",
                report.delivered.len(),
                report.failed.len()
            );
        }
    });
}
