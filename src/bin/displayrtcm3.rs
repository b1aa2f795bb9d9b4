use chrono::{DateTime, NaiveDate, Utc};
use rtcm3::{Decoder, Framer, Outcome};
use slog::{o, Drain};
use std::fs::File;
use std::io::{self, Read};
use std::process;
use structopt::StructOpt;

/// Frame an RTCM3 capture and print every message in readable form.
#[derive(Debug, StructOpt)]
#[structopt(name = "displayrtcm3")]
struct Opt {
    /// Input file, or "-" for stdin.
    input: String,
    /// Reference date anchoring epoch timestamps, as YYYY-MM-DD or an
    /// RFC 3339 timestamp.
    start: String,
}

fn parse_start(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn main() {
    let opt = Opt::from_args();
    let start = match parse_start(&opt.start) {
        Some(start) => start,
        None => {
            eprintln!(
                "cannot parse start date {:?}: expected YYYY-MM-DD or an RFC 3339 timestamp",
                opt.start
            );
            process::exit(1);
        }
    };

    let source: Box<dyn Read> = if opt.input == "-" {
        Box::new(io::stdin())
    } else {
        match File::open(&opt.input) {
            Ok(file) => Box::new(file),
            Err(error) => {
                eprintln!("cannot open {}: {}", opt.input, error);
                process::exit(1);
            }
        }
    };

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let logger = slog::Logger::root(drain, o!());

    let mut framer = Framer::new(source, Decoder::new(start, logger));
    loop {
        match framer.next() {
            Ok(Outcome::Message(message)) => println!("{}", message),
            Ok(Outcome::NonRtcm(bytes)) => println!("{} non-RTCM bytes\n", bytes.len()),
            Ok(Outcome::EndOfStream) => break,
            Err(error) => {
                eprintln!("read error: {}", error);
                process::exit(1);
            }
        }
    }
}
