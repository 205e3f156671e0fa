//! TLS termination for the mutate endpoint
//!
//! The API server only calls admission webhooks over HTTPS. Certificates are
//! read once at startup from PEM files (typically a mounted Secret).

use anyhow::{Context, Result};
use axum::Router;
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use rustls::{Certificate, PrivateKey, ServerConfig};
use rustls_pemfile::Item;
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tower::Service;
use tracing::{debug, info, warn};

/// Build a rustls server config from PEM certificate chain and key files
pub fn load_server_config(cert_path: &Path, key_path: &Path) -> Result<ServerConfig> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let mut config = ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("Invalid TLS certificate or key")?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(config)
}

fn load_certs(path: &Path) -> Result<Vec<Certificate>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open TLS certificate {:?}", path))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .with_context(|| format!("Failed to parse TLS certificate {:?}", path))?;

    if certs.is_empty() {
        anyhow::bail!("No certificates found in {:?}", path);
    }
    Ok(certs.into_iter().map(Certificate).collect())
}

fn load_private_key(path: &Path) -> Result<PrivateKey> {
    let file =
        File::open(path).with_context(|| format!("Failed to open TLS key {:?}", path))?;
    let mut reader = BufReader::new(file);

    while let Some(item) = rustls_pemfile::read_one(&mut reader)
        .with_context(|| format!("Failed to parse TLS key {:?}", path))?
    {
        match item {
            Item::PKCS8Key(key) | Item::RSAKey(key) | Item::ECKey(key) => {
                return Ok(PrivateKey(key))
            }
            _ => continue,
        }
    }

    anyhow::bail!("No private key found in {:?}", path)
}

/// Serve `router` over TLS until the listener fails
pub async fn serve_tls(addr: SocketAddr, router: Router, config: ServerConfig) -> Result<()> {
    let acceptor = TlsAcceptor::from(Arc::new(config));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %addr, "Serving webhook over TLS");

    loop {
        let (stream, peer_addr) = listener.accept().await.context("accept failed")?;
        let acceptor = acceptor.clone();
        let router = router.clone();

        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(err) => {
                    debug!(%peer_addr, error = %err, "TLS handshake failed");
                    return;
                }
            };

            let service = hyper::service::service_fn(move |request: Request<Incoming>| {
                router.clone().call(request)
            });

            if let Err(err) = Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                warn!(%peer_addr, error = %err, "connection error");
            }
        });
    }
}
