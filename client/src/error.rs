use relay_protocol::FrameError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("transport error: {0}")]
    Transport(#[source] tungstenite::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),
}
