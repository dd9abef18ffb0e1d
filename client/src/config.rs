use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "relay-client", version, about = "Terminal client for the relay chat server")]
pub struct ClientConfig {
    /// WebSocket endpoint of the relay server
    #[arg(long, env = "RELAY_URL", default_value = "ws://127.0.0.1:3000/ws")]
    pub url: String,

    /// Delay between reconnect attempts, in milliseconds
    #[arg(long, env = "RELAY_RECONNECT_DELAY_MS", default_value_t = 3000)]
    pub reconnect_delay_ms: u64,

    /// Input idle time before typing is reported as stopped, in milliseconds
    #[arg(long, env = "RELAY_TYPING_IDLE_MS", default_value_t = 2000)]
    pub typing_idle_ms: u64,

    /// Emit logs as JSON
    #[arg(long, env = "RELAY_JSON_LOGS")]
    pub json_logs: bool,
}

impl ClientConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn typing_idle(&self) -> Duration {
        Duration::from_millis(self.typing_idle_ms)
    }
}
