//! swarmscale-orchestrator — Docker Swarm collaborator implementations.
//!
//! [`DockerSwarm`] implements both `ReplicaStateProvider` and
//! `ScaleCommandExecutor` on top of the `docker` and `aws` CLIs. Every
//! process launch goes through a [`CommandRunner`], so tests script the
//! CLI output instead of needing a swarm.
//!
//! # Commands
//!
//! ```text
//! fetch    docker service ls --filter name=<svc> --format '{{.Name}} {{.Replicas}}'
//! scale    docker service scale <svc>=<n>
//! refresh  docker service inspect --format '{{.Spec.TaskTemplate.ContainerSpec.Image}}' <svc>
//!          aws ecr get-login-password --region <r> | docker login --username AWS --password-stdin <registry>
//!          docker pull <image>
//!          docker service update --force --update-parallelism <p> --update-delay <d>s \
//!              --with-registry-auth --image <image> <svc>
//! ```
//!
//! In dry-run mode the read-only commands (`ls`, `inspect`) still run and
//! every mutating command is logged and skipped.

pub mod runner;
pub mod swarm;

pub use runner::{CommandOutput, CommandRunner, Invocation, RunError, ShellRunner};
pub use swarm::{DockerSwarm, SwarmSettings};
