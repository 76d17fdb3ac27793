use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("unparseable probe output: {0}")]
    Probe(String),
}
