//! Docker Swarm as replica state provider and scale executor.

use std::time::Duration;

use tracing::{debug, info, warn};

use swarmscale_core::*;

use crate::runner::{CommandRunner, Invocation, RunError};

const DOCKER: &str = "docker";
const AWS: &str = "aws";

/// Settings resolved from the daemon config at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct SwarmSettings {
    pub dry_run: bool,
    /// Region passed to `aws ecr get-login-password`.
    pub registry_region: String,
    /// `(access_key_id, secret_access_key)` for registry login.
    pub registry_credentials: Option<(String, String)>,
    pub update_parallelism: u32,
    pub update_delay: Duration,
    /// Upper bound on each CLI invocation. The child is killed on expiry.
    pub command_timeout: Duration,
}

impl Default for SwarmSettings {
    fn default() -> Self {
        Self {
            dry_run: false,
            registry_region: "eu-central-1".to_string(),
            registry_credentials: None,
            update_parallelism: 1,
            update_delay: Duration::from_secs(10),
            command_timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for SwarmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwarmSettings")
            .field("dry_run", &self.dry_run)
            .field("registry_region", &self.registry_region)
            .field("registry_credentials", &self.registry_credentials.as_ref().map(|_| "<redacted>"))
            .field("update_parallelism", &self.update_parallelism)
            .field("update_delay", &self.update_delay)
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

/// Docker Swarm backed by the local `docker` CLI.
pub struct DockerSwarm<R> {
    runner: R,
    settings: SwarmSettings,
}

impl<R: CommandRunner> DockerSwarm<R> {
    pub fn new(runner: R, settings: SwarmSettings) -> Self {
        if settings.dry_run {
            info!("docker swarm executor in dry-run mode, mutating commands are skipped");
        }
        Self { runner, settings }
    }

    pub fn settings(&self) -> &SwarmSettings {
        &self.settings
    }

    async fn run(&self, invocation: &Invocation) -> Result<String, RunError> {
        let after = self.settings.command_timeout;
        match tokio::time::timeout(after, self.runner.run(invocation)).await {
            Ok(output) => Ok(output?.stdout),
            Err(_) => Err(RunError::TimedOut {
                command: invocation.to_string(),
                after,
            }),
        }
    }

    /// Run a read-only command and return its stdout.
    async fn read(&self, invocation: Invocation) -> Result<String, RunError> {
        self.run(&invocation).await
    }

    /// Run a command that changes cluster or host state, unless dry-run.
    async fn mutate(&self, invocation: Invocation) -> Result<String, RunError> {
        if self.settings.dry_run {
            info!(command = %invocation, "dry run, command skipped");
            return Ok(String::new());
        }
        self.run(&invocation).await
    }

    async fn replicas(&self, service: &ServiceName) -> Result<ReplicaState, StateUnavailable> {
        let listing = self
            .read(
                Invocation::new(DOCKER)
                    .args(["service", "ls", "--filter"])
                    .arg(format!("name={service}"))
                    .args(["--format", "{{.Name}} {{.Replicas}}"]),
            )
            .await
            .map_err(|e| StateUnavailable::new(service.as_str(), e.to_string()))?;

        parse_replicas(&listing, service.as_str()).ok_or_else(|| {
            StateUnavailable::new(
                service.as_str(),
                format!("no replica listing for service (got {:?})", listing.trim()),
            )
        })
    }

    async fn scale(&self, service: &ServiceName, replicas: u32) -> Result<(), RunError> {
        self.mutate(
            Invocation::new(DOCKER)
                .args(["service", "scale", "--detach"])
                .arg(format!("{service}={replicas}")),
        )
        .await?;
        Ok(())
    }

    async fn image(&self, service: &ServiceName) -> Result<String, RunError> {
        let out = self
            .read(
                Invocation::new(DOCKER)
                    .args(["service", "inspect", "--format"])
                    .arg("{{.Spec.TaskTemplate.ContainerSpec.Image}}")
                    .arg(service.as_str()),
            )
            .await?;
        Ok(out.trim().to_string())
    }

    /// Authenticate docker against the image's registry.
    async fn login(&self, image: &str) -> Result<(), RunError> {
        let Some(registry) = registry_host(image) else {
            debug!(image, "image has no registry host, skipping login");
            return Ok(());
        };
        let Some((key_id, secret)) = &self.settings.registry_credentials else {
            debug!(registry, "no registry credentials configured, skipping login");
            return Ok(());
        };
        if self.settings.dry_run {
            info!(registry, "dry run, registry login skipped");
            return Ok(());
        }

        let password = self
            .read(
                Invocation::new(AWS)
                    .args(["ecr", "get-login-password", "--region"])
                    .arg(self.settings.registry_region.as_str())
                    .env("AWS_ACCESS_KEY_ID", key_id)
                    .env("AWS_SECRET_ACCESS_KEY", secret),
            )
            .await?;

        self.mutate(
            Invocation::new(DOCKER)
                .args(["login", "--username", "AWS", "--password-stdin"])
                .arg(registry)
                .stdin(password.trim()),
        )
        .await?;
        debug!(registry, "registry login succeeded");
        Ok(())
    }

    /// Pull the service's current image and roll it out again.
    async fn refresh(&self, service: &ServiceName) -> Result<(), RunError> {
        let image = match self.image(service).await {
            Ok(image) => image,
            Err(e) if self.settings.dry_run => {
                warn!(service = %service, error = %e, "dry run, image lookup failed, refresh skipped");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        if image.is_empty() && self.settings.dry_run {
            warn!(service = %service, "dry run, service image unresolved, refresh skipped");
            return Ok(());
        }
        if image.is_empty() {
            return Err(RunError::Failed {
                command: format!("{DOCKER} service inspect {service}"),
                status: "empty output".to_string(),
                stderr: "could not resolve service image".to_string(),
            });
        }

        self.login(&image).await?;
        self.mutate(Invocation::new(DOCKER).args(["pull", image.as_str()]))
            .await?;
        self.mutate(
            Invocation::new(DOCKER)
                .args(["service", "update", "--detach", "--force", "--update-parallelism"])
                .arg(self.settings.update_parallelism.to_string())
                .arg("--update-delay")
                .arg(format!("{}s", self.settings.update_delay.as_secs()))
                .args(["--with-registry-auth", "--image"])
                .arg(image.as_str())
                .arg(service.as_str()),
        )
        .await?;
        info!(service = %service, image = %image, "rolling update started");
        Ok(())
    }
}

impl<R: CommandRunner> ReplicaStateProvider for DockerSwarm<R> {
    fn fetch<'a>(
        &'a self,
        service: &'a ServiceName,
    ) -> BoxFuture<'a, Result<ReplicaState, StateUnavailable>> {
        Box::pin(self.replicas(service))
    }
}

impl<R: CommandRunner> ScaleCommandExecutor for DockerSwarm<R> {
    fn apply<'a>(
        &'a self,
        service: &'a ServiceName,
        command: ScaleCommand,
    ) -> BoxFuture<'a, Result<(), CommandFailure>> {
        Box::pin(async move {
            self.scale(service, command.replicas)
                .await
                .map_err(|e| CommandFailure::new(service.as_str(), e.to_string()))?;
            if command.refresh_image {
                self.refresh(service).await.map_err(|e| {
                    CommandFailure::after_scale(service.as_str(), command.replicas, e.to_string())
                })?;
            }
            Ok(())
        })
    }

    fn dry_run(&self) -> bool {
        self.settings.dry_run
    }
}

/// Find `service` in `docker service ls` output and parse `current/target`.
///
/// Docker's name filter is a prefix match, so the listing may contain
/// other services; only an exact name match counts. Replicated services
/// with placement limits print a suffix such as `(max 2 per node)`,
/// which is ignored.
fn parse_replicas(listing: &str, service: &str) -> Option<ReplicaState> {
    listing.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        if fields.next()? != service {
            return None;
        }
        let (current, target) = fields.next()?.split_once('/')?;
        Some(ReplicaState::new(current.parse().ok()?, target.parse().ok()?))
    })
}

/// Registry host of an image reference, following docker's rule that the
/// first path component is a host only if it has a `.` or `:` or is
/// `localhost`.
fn registry_host(image: &str) -> Option<&str> {
    let (first, _) = image.split_once('/')?;
    (first.contains('.') || first.contains(':') || first == "localhost").then_some(first)
}
