//! Supervisor for a local `ollama serve` process.

use crate::client::OllamaClient;
use crate::config::SupervisorConfig;
use crate::traits::{InferenceServer, ModelManager, ServerLauncher};
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use velatura_error::{ServerError, ServerErrorKind};

/// Launches `ollama serve`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OllamaLauncher;

impl ServerLauncher for OllamaLauncher {
    type Server = OllamaServer;
    type Config = SupervisorConfig;

    #[instrument(skip_all, fields(binary = %config.binary(), port = config.port()))]
    fn start(config: &SupervisorConfig) -> Result<OllamaServer, ServerError> {
        let child = Command::new(config.binary())
            .arg("serve")
            .env("OLLAMA_HOST", format!("0.0.0.0:{}", config.port()))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                error!(error = %e, "Failed to spawn Ollama");
                ServerError::new(ServerErrorKind::Spawn(format!(
                    "{} serve: {}",
                    config.binary(),
                    e
                )))
            })?;

        info!(pid = ?child.id(), "Ollama process started");
        let port = *config.port();
        Ok(OllamaServer {
            child: Mutex::new(child),
            port,
            client: OllamaClient::new(format!("http://localhost:{}", port)),
            poll_interval: *config.poll_interval(),
        })
    }
}

/// A running `ollama serve` child process.
#[derive(Debug)]
pub struct OllamaServer {
    child: Mutex<Child>,
    port: u16,
    client: OllamaClient,
    poll_interval: Duration,
}

#[async_trait]
impl InferenceServer for OllamaServer {
    fn port(&self) -> u16 {
        self.port
    }

    fn base_url(&self) -> String {
        self.client.base_url().to_string()
    }

    async fn health_check(&self) -> Result<(), ServerError> {
        let version = self
            .client
            .version()
            .await
            .map_err(|e| ServerError::new(ServerErrorKind::NotReady(e.kind().to_string())))?;
        debug!(version = %version, "Ollama is responding");
        Ok(())
    }

    #[instrument(skip(self), fields(port = self.port))]
    async fn wait_until_ready(&self, timeout: Option<Duration>) -> Result<(), ServerError> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);

        loop {
            if self.health_check().await.is_ok() {
                info!("Ollama is ready");
                return Ok(());
            }

            if let Some(status) = self.child.lock().await.try_wait()? {
                return Err(ServerError::new(ServerErrorKind::NotReady(format!(
                    "Ollama exited during startup with {}",
                    status
                ))));
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(ServerError::new(ServerErrorKind::NotReady(format!(
                    "no answer from {} within {:?}",
                    self.base_url(),
                    timeout.unwrap_or_default()
                ))));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn wait(&mut self) -> Result<ExitStatus, ServerError> {
        Ok(self.child.get_mut().wait().await?)
    }

    #[instrument(skip(self), fields(port = self.port))]
    async fn stop(self) -> Result<ExitStatus, ServerError> {
        let mut child = self.child.into_inner();
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        info!("Stopping Ollama");
        child.start_kill()?;
        Ok(child.wait().await?)
    }
}

/// Model store managed through the `ollama` command line.
#[derive(Debug, Clone)]
pub struct OllamaModels {
    binary: String,
}

impl OllamaModels {
    /// Uses `binary` for `list` and `pull`.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl ModelManager for OllamaModels {
    #[instrument(skip(self))]
    async fn is_downloaded(&self, model: &str) -> Result<bool, ServerError> {
        let output = Command::new(&self.binary)
            .arg("list")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                ServerError::new(ServerErrorKind::Command(format!("{} list: {}", self.binary, e)))
            })?;

        if !output.status.success() {
            warn!(status = %output.status, "ollama list failed; assuming model is missing");
        }
        Ok(list_contains(&String::from_utf8_lossy(&output.stdout), model))
    }

    #[instrument(skip(self))]
    async fn download(&self, model: &str) -> Result<(), ServerError> {
        info!("First-time setup: downloading {}", model);
        let status = Command::new(&self.binary)
            .args(["pull", model])
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                ServerError::new(ServerErrorKind::Command(format!("{} pull: {}", self.binary, e)))
            })?;

        if !status.success() {
            return Err(ServerError::new(ServerErrorKind::Command(format!(
                "{} pull {} exited with {}",
                self.binary, model, status
            ))));
        }
        info!("Model ready");
        Ok(())
    }
}

/// Whether `ollama list` output has a line for `model`.
pub fn list_contains(listing: &str, model: &str) -> bool {
    listing.lines().any(|line| line.starts_with(model))
}

/// Best-guess LAN address of this host, for log messages.
///
/// Connecting a UDP socket sends nothing; it only selects the outbound
/// interface.
pub fn lan_ip() -> IpAddr {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect(("8.8.8.8", 80))?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Starts Ollama, pulls the model on first run, and blocks until the server
/// exits or Ctrl+C arrives.
///
/// Returns the server's exit code, or 0 when it has none.
#[instrument(skip_all, fields(model = %config.model(), port = config.port()))]
pub async fn supervise(config: &SupervisorConfig) -> Result<i32, ServerError> {
    let mut server = OllamaLauncher::start(config)?;
    let models = OllamaModels::new(config.binary().clone());

    let prepared = async {
        server.wait_until_ready(*config.ready_timeout()).await?;
        models.ensure_model(config.model()).await
    }
    .await;

    if let Err(e) = prepared {
        error!(error = %e, "Ollama setup failed");
        if let Err(stop_err) = server.stop().await {
            warn!(error = %stop_err, "Failed to stop Ollama after setup error");
        }
        return Err(e);
    }

    info!(
        "Ollama API is ready at http://{}:{}/api/generate",
        lan_ip(),
        config.port()
    );

    let status = tokio::select! {
        status = server.wait() => status?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Interrupted");
            server.stop().await?
        }
    };

    info!(status = %status, "Ollama exited");
    Ok(status.code().unwrap_or(0))
}
