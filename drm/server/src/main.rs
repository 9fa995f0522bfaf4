use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use drm_chinadrm::{KeyDeriver, LicenseIssuer, RsaSigner};
use tokio::{signal, sync::watch};

mod server;

#[derive(Parser, Debug)]
#[command(name = "drm-server")]
#[command(about = "GY/T 277 DRM license issuing server")]
struct Args {
    /// HTTP server port
    #[arg(short, long, default_value = "8090")]
    port: u16,

    /// PKCS#1 RSA private key used to sign licenses
    #[arg(long)]
    pem_file: PathBuf,

    /// Certificate id embedded in license Signature units
    #[arg(long)]
    cert_id: String,

    /// Override the built-in key-derivation seed (at least 30 bytes)
    #[arg(long)]
    seed: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Parse the signing key once, before serving anything.
    let signer = RsaSigner::from_pem_file(&args.pem_file)?;
    let issuer = match &args.seed {
        Some(seed) => LicenseIssuer::with_deriver(signer, KeyDeriver::new(seed.as_bytes())?),
        None => LicenseIssuer::new(signer),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let issuer = Arc::new(issuer);
    let cert_id = args.cert_id.clone();

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::run_server(addr, issuer, cert_id, shutdown_rx).await {
            eprintln!("[server] Error: {}", e);
        }
    });

    println!("Key endpoint:     http://localhost:{}/genkey", args.port);
    println!("License endpoint: http://localhost:{}/acquirelicense", args.port);

    // Wait for Ctrl+C
    signal::ctrl_c().await?;
    println!("\nShutting down...");
    let _ = shutdown_tx.send(true);
    let _ = server_handle.await;

    Ok(())
}
