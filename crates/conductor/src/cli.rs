//! Command-line interface definition using clap.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use conductor_api::ApiConfig;
use conductor_rpc::RpcConfig;
use conductor_supervisor::SupervisorConfig;

/// Conductor - agent orchestrator
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Address to bind the HTTP server to
    #[arg(long, env = "CONDUCTOR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind the HTTP server to
    #[arg(short, long, env = "CONDUCTOR_PORT", default_value_t = 4000)]
    pub port: u16,

    /// Directory holding installed agents (default: ~/.conductor/agents)
    #[arg(long, env = "CONDUCTOR_AGENTS_DIR")]
    pub agents_dir: Option<PathBuf>,

    /// URL handed to agents for connecting back (default: derived from host and port)
    #[arg(long, env = "CONDUCTOR_CALLBACK_URL")]
    pub callback_url: Option<String>,

    /// Time an agent gets to exit after a shutdown notification
    #[arg(long, env = "CONDUCTOR_GRACE_PERIOD_MS", default_value_t = 2000)]
    pub grace_period_ms: u64,

    /// Pause between stop and start on restart
    #[arg(long, env = "CONDUCTOR_RESTART_DELAY_MS", default_value_t = 1000)]
    pub restart_delay_ms: u64,

    /// Deadline for a single agent call, 0 waits forever
    #[arg(long, env = "CONDUCTOR_RPC_TIMEOUT_SECS", default_value_t = 30)]
    pub rpc_timeout_secs: u64,

    /// Delete an agent's install directory on uninstall
    #[arg(long, env = "CONDUCTOR_REMOVE_ARTIFACTS")]
    pub remove_artifacts: bool,
}

impl Cli {
    /// Returns the log filter for the verbosity level.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Returns the agents directory, falling back to `~/.conductor/agents`.
    pub fn agents_dir(&self) -> PathBuf {
        self.agents_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".conductor")
                .join("agents")
        })
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(self.host.clone(), self.port)
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        let callback_url = self
            .callback_url
            .clone()
            .unwrap_or_else(|| self.api_config().callback_url());

        SupervisorConfig::new()
            .with_agents_dir(self.agents_dir())
            .with_callback_url(callback_url)
            .with_grace_period(Duration::from_millis(self.grace_period_ms))
            .with_restart_delay(Duration::from_millis(self.restart_delay_ms))
            .with_remove_artifacts(self.remove_artifacts)
    }

    pub fn rpc_config(&self) -> RpcConfig {
        let timeout = match self.rpc_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        RpcConfig::new().with_call_timeout(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["conductor", "--agents-dir", "/tmp/agents"]).unwrap();

        assert_eq!(cli.api_config().bind_address(), "127.0.0.1:4000");
        assert_eq!(cli.log_level(), "info");

        let sup = cli.supervisor_config();
        assert_eq!(sup.agents_dir, PathBuf::from("/tmp/agents"));
        assert_eq!(sup.callback_url, "http://127.0.0.1:4000");
        assert_eq!(sup.grace_period, Duration::from_secs(2));
        assert!(!sup.remove_artifacts);

        assert_eq!(cli.rpc_config().call_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let cli = Cli::try_parse_from(["conductor", "--rpc-timeout-secs", "0"]).unwrap();
        assert!(cli.rpc_config().call_timeout.is_none());
    }

    #[test]
    fn test_wildcard_host_callback() {
        let cli = Cli::try_parse_from(["conductor", "--host", "0.0.0.0", "-p", "8080", "-vv"]).unwrap();

        assert_eq!(cli.supervisor_config().callback_url, "http://localhost:8080");
        assert_eq!(cli.log_level(), "trace");
    }

    #[test]
    fn test_explicit_callback_url() {
        let cli = Cli::try_parse_from([
            "conductor",
            "--callback-url",
            "http://conductor.internal:4000",
            "--remove-artifacts",
        ])
        .unwrap();

        let sup = cli.supervisor_config();
        assert_eq!(sup.callback_url, "http://conductor.internal:4000");
        assert!(sup.remove_artifacts);
    }

    #[test]
    fn test_default_agents_dir() {
        let cli = Cli::try_parse_from(["conductor"]).unwrap();
        assert!(cli.agents_dir().ends_with(".conductor/agents"));
    }
}
