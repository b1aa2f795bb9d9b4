use rtcm3::logger_runtime::{Config, LoggerRuntime};
use slog::{o, Drain};
use std::path::PathBuf;
use std::process;
use structopt::StructOpt;

/// Record an RTCM3 stream from stdin into daily-rotated log files.
#[derive(Debug, StructOpt)]
#[structopt(name = "rtcmlogger")]
struct Opt {
    /// JSON configuration file.
    #[structopt(short = "c", long = "config")]
    config: PathBuf,
}

fn event_logger(config: &Config) -> std::io::Result<slog::Logger> {
    std::fs::create_dir_all(&config.event_log_directory)?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.event_log_directory.join("events.log"))?;
    let decorator = slog_term::PlainSyncDecorator::new(file);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    Ok(slog::Logger::root(drain, o!()))
}

#[tokio::main]
async fn main() {
    let opt = Opt::from_args();
    let config = match Config::from_file(&opt.config) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{}", error);
            process::exit(-1);
        }
    };
    let logger = match event_logger(&config) {
        Ok(logger) => logger,
        Err(error) => {
            eprintln!("cannot open the event log: {}", error);
            process::exit(-1);
        }
    };

    let (shutdown_trigger, shutdown_signal) = triggered::trigger();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_trigger.trigger();
        }
    });

    if let Err(error) = LoggerRuntime::new(config, logger).run(shutdown_signal).await {
        eprintln!("logger runtime failed: {}", error);
        process::exit(1);
    }
}
