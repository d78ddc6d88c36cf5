use clap::Parser;
use std::path::PathBuf;

/// TRON1 launcher: pick the controller from ROBOT_TYPE / RL_TYPE and run it.
#[derive(Parser, Debug)]
#[command(name = "tron1")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Robot IP address; 127.0.0.1 means simulation
    #[arg(value_name = "ROBOT_IP")]
    pub robot_ip: Option<String>,

    /// Controller model directory (default: TRON1_MODEL_DIR, then <executable dir>/controllers/model)
    #[arg(long, value_name = "DIR")]
    pub model_dir: Option<PathBuf>,
}

/// Ability host: load abilities from a system config and serve the remote CLI.
#[derive(Parser, Debug)]
#[command(name = "tron1-ability")]
#[command(author, version, about, long_about = None)]
pub struct AbilityCli {
    /// System config YAML (default: TRON1_ABILITY_CONFIG, then abilities.yaml)
    #[arg(value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Do not start the TCP remote CLI
    #[arg(long)]
    pub no_remote_cli: bool,
}

/// `<executable dir>/controllers/model`, or `controllers/model` if the executable path is unknown.
pub fn default_model_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()))
        .unwrap_or_default()
        .join("controllers")
        .join("model")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_robot_ip_is_optional_positional() {
        let cli = Cli::try_parse_from(["tron1"]).unwrap();
        assert_eq!(cli.robot_ip, None);

        let cli = Cli::try_parse_from(["tron1", "10.192.1.2", "--model-dir", "/opt/model"]).unwrap();
        assert_eq!(cli.robot_ip.as_deref(), Some("10.192.1.2"));
        assert_eq!(cli.model_dir, Some(PathBuf::from("/opt/model")));
    }

    #[test]
    fn test_ability_cli() {
        let cli = AbilityCli::try_parse_from(["tron1-ability", "demo.yaml", "--no-remote-cli"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("demo.yaml")));
        assert!(cli.no_remote_cli);
    }

    #[test]
    fn test_default_model_dir_layout() {
        assert!(default_model_dir().ends_with("controllers/model"));
    }
}
