//! Tracing subscriber setup for castmesh binaries

use tracing_subscriber::EnvFilter;

use castmesh_core::{MeshError, MeshResult};

/// Output format of the log stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Install the global subscriber, writing to stderr.
///
/// The level comes from `RUST_LOG` and falls back to `info`.
pub fn init(format: LogFormat) -> MeshResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| MeshError::Config(format!("cannot install log subscriber: {e}")))
}
