/*
This module wraps the framer so an operator can record a live base
station: a blocking producer frames stdin and an async consumer
appends every outcome, verbatim and in order, to a daily-rotated
message log. The two communicate over a bounded channel and shut down
together on the shared trigger.
*/
use crate::{Decoder, Framer, Outcome};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use slog::{info, o};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;

pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot read config file {path}: {source}")]
    ConfigRead { path: PathBuf, source: io::Error },
    #[error("cannot parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("message log error")]
    Log(#[from] io::Error),
    #[error("byte source error: {0}")]
    Source(#[from] crate::Error),
    #[error("runtime task failed")]
    Join(#[from] tokio::task::JoinError),
}

/// Runtime configuration, read from the JSON file named by
/// `--config`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub log_events: bool,
    pub message_log_directory: PathBuf,
    pub directory_for_old_message_logs: PathBuf,
    pub event_log_directory: PathBuf,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Verbatim daily log of everything the framer saw. Files are named
/// `data.YYYY-MM-DD.rtcm3`; at day rollover every finished file moves
/// to the archive directory.
pub struct MessageLog {
    directory: PathBuf,
    archive: PathBuf,
    current: Option<(NaiveDate, fs::File)>,
}

impl MessageLog {
    pub fn new(directory: PathBuf, archive: PathBuf) -> MessageLog {
        MessageLog {
            directory,
            archive,
            current: None,
        }
    }

    fn file_name(day: NaiveDate) -> String {
        format!("data.{}.rtcm3", day.format("%Y-%m-%d"))
    }

    fn parse_file_name(name: &str) -> Option<NaiveDate> {
        let date = name.strip_prefix("data.")?.strip_suffix(".rtcm3")?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }

    /// Append `bytes` to the log for `day`, rotating first if the day
    /// changed since the last write.
    pub fn write(&mut self, day: NaiveDate, bytes: &[u8]) -> io::Result<()> {
        let rotate = match &self.current {
            Some((current, _)) => *current != day,
            None => true,
        };
        if rotate {
            self.current = None;
            fs::create_dir_all(&self.directory)?;
            self.archive_older_than(day)?;
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.directory.join(Self::file_name(day)))?;
            self.current = Some((day, file));
        }
        if let Some((_, file)) = &mut self.current {
            file.write_all(bytes)?;
        }
        Ok(())
    }

    // Move every message log from a finished day into the archive.
    fn archive_older_than(&self, today: NaiveDate) -> io::Result<()> {
        fs::create_dir_all(&self.archive)?;
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(name) = name.to_str() {
                if let Some(day) = Self::parse_file_name(name) {
                    if day < today {
                        fs::rename(entry.path(), self.archive.join(name))?;
                    }
                }
            }
        }
        Ok(())
    }
}

pub struct LoggerRuntime {
    config: Config,
    logger: slog::Logger,
}

impl LoggerRuntime {
    pub fn new(config: Config, logger: slog::Logger) -> LoggerRuntime {
        LoggerRuntime { config, logger }
    }

    /// Frame stdin and append every outcome to the daily message log
    /// until the source ends or the shutdown signal fires. The
    /// producer runs on a blocking thread; cancellation reaches it at
    /// the next read boundary.
    pub async fn run(self, shutdown_signal: triggered::Listener) -> Result {
        let (sender, receiver) = mpsc::channel(100);
        let decoder = Decoder::new(Utc::now(), self.logger.clone());
        let mut framer = Framer::new(io::stdin(), decoder).stop_on_eof(false);
        let cancellation = framer.cancel_handle();

        let producer = tokio::task::spawn_blocking(move || loop {
            match framer.next() {
                Ok(Outcome::EndOfStream) => break,
                Ok(outcome) => {
                    if sender.blocking_send(Ok(outcome)).is_err() {
                        break;
                    }
                }
                Err(error) => {
                    let _ = sender.blocking_send(Err(error));
                    break;
                }
            }
        });

        let log = MessageLog::new(
            self.config.message_log_directory.clone(),
            self.config.directory_for_old_message_logs.clone(),
        );
        let events = if self.config.log_events {
            self.logger.clone()
        } else {
            slog::Logger::root(slog::Discard, o!())
        };
        let consumer = tokio::spawn(consume(receiver, log, events));

        let outcome = tokio::select!(
            _ = shutdown_signal => {
                cancellation.cancel();
                Ok(())
            }
            finished = consumer => match finished {
                Ok(result) => result,
                Err(join) => Err(Error::Join(join)),
            },
        );
        producer.abort();
        outcome
    }
}

async fn consume(
    mut receiver: mpsc::Receiver<crate::Result<Outcome>>,
    mut log: MessageLog,
    events: slog::Logger,
) -> Result {
    while let Some(next) = receiver.recv().await {
        let today = Utc::now().date_naive();
        match next? {
            Outcome::Message(message) => {
                if !message.valid {
                    info!(events, "invalid frame recorded";
                          "type" => message.message_type,
                          "crc_valid" => message.crc_valid,
                          "bytes" => message.raw.len());
                }
                log.write(today, &message.raw)?;
            }
            Outcome::NonRtcm(bytes) => {
                info!(events, "non-RTCM bytes passed through"; "bytes" => bytes.len());
                log.write(today, &bytes)?;
            }
            Outcome::EndOfStream => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn config_parses_the_documented_fields() {
        let json = r#"{
            "log_events": true,
            "message_log_directory": "./logs",
            "directory_for_old_message_logs": "./logs/old",
            "event_log_directory": "./events"
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.log_events);
        assert_eq!(config.message_log_directory, PathBuf::from("./logs"));
        assert_eq!(
            config.directory_for_old_message_logs,
            PathBuf::from("./logs/old")
        );
        assert_eq!(config.event_log_directory, PathBuf::from("./events"));
    }

    #[test]
    fn malformed_config_is_rejected() {
        let json = r#"{ "log_events": "yes" }"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn log_file_names_round_trip() {
        let day = NaiveDate::from_ymd_opt(2023, 5, 14).unwrap();
        let name = MessageLog::file_name(day);
        assert_eq!(name, "data.2023-05-14.rtcm3");
        assert_eq!(MessageLog::parse_file_name(&name), Some(day));
        assert_eq!(MessageLog::parse_file_name("data.nonsense.rtcm3"), None);
        assert_eq!(MessageLog::parse_file_name("events.log"), None);
    }
}
