use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

/// Which HTTP surfaces this process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Prediction API only
    Api,
    /// Player-picker dashboard only
    Dashboard,
    /// Both, in one process
    All,
}

/// ATP match winner predictor
#[derive(Parser, Debug, Clone)]
#[command(name = "atp-oracle", version, about)]
pub struct Config {
    /// Which server(s) to run
    #[arg(long, env = "MODE", value_enum, default_value = "all")]
    pub mode: Mode,

    /// Prediction API listen address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8000")]
    pub api_addr: String,

    /// Trained model artifact (JSON)
    #[arg(long, env = "MODEL_PATH", default_value = "models/atp_model.json")]
    pub model_path: String,

    /// Dashboard listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8501")]
    pub dashboard_addr: String,

    /// Historical match table used to build the player list
    #[arg(long, env = "PLAYERS_CSV", default_value = "data/atp_tennis.csv")]
    pub players_csv: String,

    /// Base URL the dashboard uses to reach the prediction API
    #[arg(long, env = "PREDICTOR_API_URL", default_value = "http://127.0.0.1:8000")]
    pub predictor_api_url: String,

    /// Timeout for dashboard -> API requests, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "10")]
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.runs_api() {
            self.api_addr
                .parse::<SocketAddr>()
                .map_err(|e| anyhow::anyhow!("invalid api_addr '{}': {}", self.api_addr, e))?;
        }
        if self.runs_dashboard() {
            self.dashboard_addr.parse::<SocketAddr>().map_err(|e| {
                anyhow::anyhow!("invalid dashboard_addr '{}': {}", self.dashboard_addr, e)
            })?;
            let url = url::Url::parse(&self.predictor_api_url).map_err(|e| {
                anyhow::anyhow!("invalid predictor_api_url '{}': {}", self.predictor_api_url, e)
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                anyhow::bail!("predictor_api_url must use http or https");
            }
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn runs_api(&self) -> bool {
        matches!(self.mode, Mode::Api | Mode::All)
    }

    pub fn runs_dashboard(&self) -> bool {
        matches!(self.mode, Mode::Dashboard | Mode::All)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
