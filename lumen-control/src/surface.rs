//! Opening the projector: optional process launch plus TCP accept.

use std::net::SocketAddr;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use lumen_core::{Connection, LumenError, SurfaceOpener, Transport};
use tokio::net::TcpListener;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::ControlConfig;

/// Program and arguments used to start the projector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub command: String,
    pub args: Vec<String>,
}

/// Opens the remote surface by accepting the projector's connection on
/// a listener bound at start-up, launching the projector first when
/// configured to.
#[derive(Debug)]
pub struct ProcessOpener {
    listener: TcpListener,
    launch: Option<LaunchSpec>,
    timeout: Duration,
    child: Option<Child>,
}

impl ProcessOpener {
    pub async fn bind(config: &ControlConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.network.listen_address).await?;
        info!("listening for projector on {}", listener.local_addr()?);
        let launch = config.projector.auto_launch.then(|| LaunchSpec {
            command: config.projector.command.clone(),
            args: config.projector_args(),
        });
        Ok(Self {
            listener,
            launch,
            timeout: Duration::from_millis(config.network.connect_timeout_ms),
            child: None,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    fn child_running(&mut self) -> bool {
        match self.child.as_mut().map(|c| c.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                debug!(%status, "previous projector process exited");
                false
            }
            Some(Err(e)) => {
                warn!("cannot poll projector process: {e}");
                false
            }
            None => false,
        }
    }

    fn launch(&mut self) -> Result<(), LumenError> {
        let Some(launch) = self.launch.clone() else {
            return Ok(());
        };
        if self.child_running() {
            return Ok(());
        }
        let child = Command::new(&launch.command)
            .args(&launch.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LumenError::Other(format!("cannot launch '{}': {e}", launch.command)))?;
        info!(pid = ?child.id(), "projector launched");
        self.child = Some(child);
        Ok(())
    }
}

#[async_trait]
impl SurfaceOpener for ProcessOpener {
    async fn open(&mut self) -> Result<Box<dyn Transport>, LumenError> {
        self.launch()?;
        let accepted = tokio::time::timeout(self.timeout, self.listener.accept()).await;
        let (stream, peer) = match accepted {
            Ok(result) => result?,
            Err(_) => {
                return Err(LumenError::Other(format!(
                    "no projector connected within {} ms",
                    self.timeout.as_millis()
                )));
            }
        };
        info!(%peer, "projector connected");
        Ok(Box::new(Connection::new(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::ConnectionInfo;

    fn config(timeout_ms: u64) -> ControlConfig {
        let mut cfg = ControlConfig::default();
        cfg.network.listen_address = "127.0.0.1:0".into();
        cfg.network.connect_timeout_ms = timeout_ms;
        cfg
    }

    #[tokio::test]
    async fn accepts_a_connecting_projector() {
        let mut opener = ProcessOpener::bind(&config(5_000)).await.unwrap();
        let addr = opener.local_addr().unwrap();
        let info = ConnectionInfo::new(addr.ip().to_string(), addr.port());
        let client = tokio::spawn(async move { Connection::connect(&info).await.unwrap() });

        let transport = opener.open().await.unwrap();
        assert!(transport.is_open());
        drop(client.await.unwrap());
    }

    #[tokio::test]
    async fn times_out_without_projector() {
        let mut opener = ProcessOpener::bind(&config(50)).await.unwrap();
        let err = opener.open().await.err().unwrap();
        assert!(err.to_string().contains("no projector"));
    }

    #[tokio::test]
    async fn launch_failure_is_reported() {
        let mut cfg = config(50);
        cfg.projector.auto_launch = true;
        cfg.projector.command = "/nonexistent/lumen-projector".into();
        let mut opener = ProcessOpener::bind(&cfg).await.unwrap();
        let err = opener.open().await.err().unwrap();
        assert!(err.to_string().contains("cannot launch"));
    }
}
