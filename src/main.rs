use clap::Parser;
use log::{error, info};
use roomwatch::config::{Config, DEFAULT_CONFIG_PATH};
use roomwatch::discord::{
    DiscordApi, DiscordCounterSink, DiscordDisplaySink, DiscordNotificationSink,
};
use roomwatch::probe::{ProcConnectionCounter, ProcStatsProbe, Probes, SystemdProbe};
use roomwatch::sched::{self, Outputs};
use roomwatch::sink::{CounterSink, LogPresenceSink, NotificationSink};
use roomwatch::source::JournalSource;
use roomwatch::{Monitor, StateStore};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::watch;

/// Room membership monitor for a collaboration server.
#[derive(Debug, Parser)]
#[command(name = "roomwatch", version)]
struct Args {
    /// Path to the JSON config file.
    #[arg(long, env = "ROOMWATCH_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the monitored systemd unit.
    #[arg(long)]
    unit: Option<String>,

    /// Override the service port used for connection counting.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let unit = args.unit.unwrap_or_else(|| config.service_unit.clone());
    let port = args.port.unwrap_or(config.service_port);

    let store = match StateStore::open(&config.state_path) {
        Ok(store) => store,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "monitoring unit {unit} (port {port}) for guild {}",
        config.guild_id
    );

    let monitor = Arc::new(
        Monitor::new(JournalSource::new(unit.clone()), store).with_window(config.log_window),
    );

    let api = DiscordApi::new(config.discord_token.clone());
    let outputs = Outputs {
        display: Box::new(DiscordDisplaySink::new(
            api.clone(),
            config.live_status_channel_id,
        )),
        presence: Box::new(LogPresenceSink),
        notify: config.notification_channel_id.map(|id| {
            Box::new(DiscordNotificationSink::new(api.clone(), id)) as Box<dyn NotificationSink>
        }),
        counter: config
            .counter_channel_id
            .map(|id| Box::new(DiscordCounterSink::new(api.clone(), id)) as Box<dyn CounterSink>),
    };
    let probes = Probes {
        service: Box::new(SystemdProbe::new(unit.as_str())),
        connections: Box::new(ProcConnectionCounter::new(port)),
        resources: Box::new(ProcStatsProbe::new()),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = sched::run(monitor, probes, outputs, config.intervals(), shutdown_rx);
    tokio::pin!(scheduler);

    tokio::select! {
        () = &mut scheduler => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            let _ = shutdown_tx.send(true);
            scheduler.await;
        }
    }

    ExitCode::SUCCESS
}
