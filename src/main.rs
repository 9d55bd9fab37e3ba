mod bmc;
mod collectors;
mod config;
mod executor;
mod managers;
mod models;
mod util;

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use config::Config;
use executor::{BoxedExecutor, HostExecutor};
use managers::arcconf::ArcconfHardwareManager;
use managers::mega::MegaHardwareManager;
use managers::HardwareManager;
use models::raid::Node;
use slog::{o, Drain, Level, Logger};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(name = "raidmgr", about = "RAID controller inventory and provisioning", version = "0.1")]
struct Cli {
    /// Config file (default: <config dir>/raidmgr/raidmgr.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Controller family to drive; auto picks the best-supported one
    #[arg(long, value_enum, default_value_t = Vendor::Auto, global = true)]
    vendor: Vendor,

    /// Log level override: trace, debug, info, warn, error, critical
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Vendor {
    Auto,
    Arcconf,
    Megacli,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print each manager's support level for this machine
    Detect,
    /// Print physical disks and host facts
    Inventory {
        /// Print a JSON snapshot instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Build the target RAID config of a node record and print the result
    Create {
        /// Node record as JSON, with a target_raid_config
        node: PathBuf,
    },
    /// Delete every logical drive
    Delete,
    /// Print the cleaning steps the manager offers
    CleanSteps,
    /// Toggle JBOD passthrough (MegaRAID only)
    Jbod {
        #[arg(value_enum)]
        mode: Switch,
    },
    /// Apply the BMC network settings assigned by the inspection service
    SetBmc,
    /// Print config file path and current values
    Config,
    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "raidmgr", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None       => Config::load(),
    };
    if let Commands::Config = cli.command {
        return run_print_config(&cfg, cli.config.as_ref());
    }

    let log = build_logger(&cfg.log, cli.log_level.as_deref())?;
    let exec = HostExecutor::new(log.new(o!("component" => "executor"))).as_executor();

    match cli.command {
        Commands::Detect              => run_detect(&exec, &cfg, &log),
        Commands::Inventory { json }  => run_inventory(&exec, &cfg, cli.vendor, json, &log),
        Commands::Create { node }     => run_create(&exec, &cfg, cli.vendor, &node, &log),
        Commands::Delete              => run_delete(&exec, &cfg, cli.vendor, &log),
        Commands::CleanSteps          => run_clean_steps(&exec, &cfg, cli.vendor, &log),
        Commands::Jbod { mode }       => run_jbod(&exec, &cfg, mode, &log),
        Commands::SetBmc              => run_set_bmc(&exec, &cfg, &log),
        Commands::Config | Commands::Completions { .. } => Ok(()),
    }
}

fn build_logger(cfg: &config::LogConfig, level_override: Option<&str>) -> Result<Logger> {
    let name = level_override.unwrap_or(&cfg.level);
    let level = Level::from_str(name).map_err(|_| anyhow!("unknown log level '{}'", name))?;

    let logger = match &cfg.path {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("error opening log file {}", path.display()))?;
            let decorator = slog_term::PlainDecorator::new(file);
            let drain = slog_term::FullFormat::new(decorator).build().fuse();
            let drain = slog_async::Async::new(drain).build().fuse();
            Logger::root(drain.filter_level(level).fuse(), o!())
        }
        None => {
            let decorator = slog_term::TermDecorator::new().stderr().build();
            let drain = slog_term::FullFormat::new(decorator).build().fuse();
            let drain = slog_async::Async::new(drain).build().fuse();
            Logger::root(drain.filter_level(level).fuse(), o!())
        }
    };
    Ok(logger)
}

fn all_managers(exec: &BoxedExecutor, cfg: &Config, log: &Logger) -> Vec<Box<dyn HardwareManager>> {
    vec![
        Box::new(ArcconfHardwareManager::new(exec.clone(), &cfg.tools, log)),
        Box::new(MegaHardwareManager::new(exec.clone(), &cfg.tools, log)),
    ]
}

/// Run `f` against the chosen manager. `--vendor auto` dispatches.
fn with_manager<T>(
    exec: &BoxedExecutor,
    cfg: &Config,
    vendor: Vendor,
    log: &Logger,
    f: impl FnOnce(&dyn HardwareManager) -> Result<T>,
) -> Result<T> {
    match vendor {
        Vendor::Arcconf => f(&ArcconfHardwareManager::new(exec.clone(), &cfg.tools, log)),
        Vendor::Megacli => f(&MegaHardwareManager::new(exec.clone(), &cfg.tools, log)),
        Vendor::Auto => {
            let managers = all_managers(exec, cfg, log);
            let manager = managers::dispatch(&managers, log)
                .ok_or_else(|| anyhow!("no supported RAID controller found"))?;
            f(manager)
        }
    }
}

fn run_detect(exec: &BoxedExecutor, cfg: &Config, log: &Logger) -> Result<()> {
    for manager in all_managers(exec, cfg, log) {
        println!(
            "{:<24} {:<5} {}",
            manager.name(),
            manager.version(),
            manager.evaluate_hardware_support()
        );
    }
    Ok(())
}

fn run_inventory(exec: &BoxedExecutor, cfg: &Config, vendor: Vendor, json: bool, log: &Logger) -> Result<()> {
    with_manager(exec, cfg, vendor, log, |manager| {
        let inventory = manager
            .list_hardware_info()
            .with_context(|| format!("{} inventory", manager.name()))?;
        if json {
            let snapshot = serde_json::json!({
                "raidmgr_version": "0.1",
                "timestamp":       chrono::Local::now().to_rfc3339(),
                "manager":         manager.name(),
                "manager_version": manager.version(),
                "inventory":       inventory,
            });
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        } else {
            print!("{}", util::report::generate(manager.name(), &inventory));
        }
        Ok(())
    })
}

fn run_create(exec: &BoxedExecutor, cfg: &Config, vendor: Vendor, path: &Path, log: &Logger) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading node record {}", path.display()))?;
    let node: Node = serde_json::from_str(&text)
        .with_context(|| format!("parsing node record {}", path.display()))?;
    with_manager(exec, cfg, vendor, log, |manager| {
        let realized = manager
            .create_configuration(&node, &[])
            .context("creating raid configuration")?;
        println!("{}", serde_json::to_string_pretty(&realized)?);
        Ok(())
    })
}

fn run_delete(exec: &BoxedExecutor, cfg: &Config, vendor: Vendor, log: &Logger) -> Result<()> {
    with_manager(exec, cfg, vendor, log, |manager| {
        manager
            .delete_configuration(&Node::default(), &[])
            .context("deleting raid configuration")?;
        println!("{}: raid configuration deleted", manager.name());
        Ok(())
    })
}

fn run_clean_steps(exec: &BoxedExecutor, cfg: &Config, vendor: Vendor, log: &Logger) -> Result<()> {
    with_manager(exec, cfg, vendor, log, |manager| {
        let steps = manager.get_clean_steps(&Node::default(), &[]);
        println!("{}", serde_json::to_string_pretty(&steps)?);
        Ok(())
    })
}

fn run_jbod(exec: &BoxedExecutor, cfg: &Config, mode: Switch, log: &Logger) -> Result<()> {
    let manager = MegaHardwareManager::new(exec.clone(), &cfg.tools, log);
    manager
        .set_jbod_mode(mode == Switch::On)
        .context("setting JBOD mode")?;
    println!("JBOD mode {}", if mode == Switch::On { "enabled" } else { "disabled" });
    Ok(())
}

fn run_set_bmc(exec: &BoxedExecutor, cfg: &Config, log: &Logger) -> Result<()> {
    use util::failures::AccumulatedFailures;

    if cfg.inspection.callback_url.is_empty() {
        return Err(anyhow!("[inspection] callback_url is not set"));
    }
    let setter = bmc::BmcSetter::new(exec.clone(), &cfg.tools, &cfg.inspection, log);
    let mut data = serde_json::Map::new();
    let mut failures = AccumulatedFailures::new();
    setter.set_bm_ipmi(&mut data, &mut failures);
    println!("{}", serde_json::to_string_pretty(&data)?);
    failures.raise_if_needed()?;
    Ok(())
}

fn run_print_config(cfg: &Config, explicit: Option<&PathBuf>) -> Result<()> {
    let path = explicit
        .cloned()
        .or_else(Config::config_path)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "(unknown)".to_string());
    let callback = if cfg.inspection.callback_url.is_empty() {
        "(not set)"
    } else {
        cfg.inspection.callback_url.as_str()
    };
    println!("Config: {}", path);
    println!();
    println!("[tools]");
    println!("  arcconf   = {}", cfg.tools.arcconf);
    println!("  megacli   = {}", cfg.tools.megacli);
    println!("  ipmitool  = {}", cfg.tools.ipmitool);
    println!("  dmidecode = {}", cfg.tools.dmidecode);
    println!("  lsblk     = {}", cfg.tools.lsblk);
    println!("  curl      = {}", cfg.tools.curl);
    println!();
    println!("[inspection]");
    println!("  callback_url           = {}", callback);
    println!("  bmc_retries            = {}", cfg.inspection.bmc_retries);
    println!("  bmc_retry_interval_sec = {}", cfg.inspection.bmc_retry_interval_sec);
    println!();
    println!("[log]");
    println!("  level = {}", cfg.log.level);
    match &cfg.log.path {
        Some(p) => println!("  path  = {}", p.display()),
        None    => println!("  path  = (terminal)"),
    }
    Ok(())
}
