/*
Every constellation stamps its observations with a 30-bit epoch that
rolls over weekly (GPS, Galileo, Beidou) or daily (GLONASS) and is
offset from UTC by constellation-specific corrections:

  GPS/Galileo  week starts gps_leap seconds before UTC midnight Sunday
  Beidou       week starts gps_leap - beidou_leap seconds after it
  GLONASS      days run on Moscow time (UTC+3), day 0 is Sunday, so a
               day begins at 21:00 UTC the previous evening

The resolver anchors each family's current week or day from a seed
wall-clock time and advances it whenever the raw epoch rolls over.
*/
use super::Constellation;
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use slog::warn;

/// Leap seconds between GPS time and UTC.
pub const DEFAULT_GPS_LEAP_SECONDS: i64 = 18;
/// Leap seconds between Beidou time and UTC.
pub const DEFAULT_BEIDOU_LEAP_SECONDS: i64 = 4;

const MILLIS_PER_DAY: u32 = 24 * 3_600_000;
const MILLIS_PER_WEEK: u32 = 7 * MILLIS_PER_DAY;
const MOSCOW_OFFSET_HOURS: i64 = 3;

// Strip the time-of-day component.
fn midnight_before(t: DateTime<Utc>) -> DateTime<Utc> {
    t - Duration::seconds(i64::from(t.num_seconds_from_midnight()))
        - Duration::nanoseconds(i64::from(t.nanosecond()))
}

fn sunday_week_start(t: DateTime<Utc>) -> DateTime<Utc> {
    midnight_before(t) - Duration::days(i64::from(t.weekday().num_days_from_sunday()))
}

struct WeekCounter {
    name: &'static str,
    start_of_week: DateTime<Utc>,
    previous_millis: Option<u32>,
}

impl WeekCounter {
    fn new(name: &'static str, seed: DateTime<Utc>, offset: Duration) -> WeekCounter {
        let mut start_of_week = sunday_week_start(seed) + offset;
        while start_of_week > seed {
            start_of_week = start_of_week - Duration::weeks(1);
        }
        while start_of_week + Duration::weeks(1) <= seed {
            start_of_week = start_of_week + Duration::weeks(1);
        }
        WeekCounter {
            name,
            start_of_week,
            previous_millis: None,
        }
    }

    fn resolve(&mut self, millis: u32, logger: &slog::Logger) -> DateTime<Utc> {
        let millis = if millis >= MILLIS_PER_WEEK {
            warn!(logger, "epoch beyond one week, clamping";
                  "constellation" => self.name, "millis" => millis);
            MILLIS_PER_WEEK - 1
        } else {
            millis
        };
        if let Some(previous) = self.previous_millis {
            if millis < previous {
                self.start_of_week = self.start_of_week + Duration::weeks(1);
            }
        }
        self.previous_millis = Some(millis);
        self.start_of_week + Duration::milliseconds(i64::from(millis))
    }
}

struct DayCounter {
    start_of_day: DateTime<Utc>,
    previous_day: u8,
}

impl DayCounter {
    fn new(seed: DateTime<Utc>) -> DayCounter {
        let moscow = seed + Duration::hours(MOSCOW_OFFSET_HOURS);
        DayCounter {
            start_of_day: midnight_before(moscow) - Duration::hours(MOSCOW_OFFSET_HOURS),
            previous_day: moscow.weekday().num_days_from_sunday() as u8,
        }
    }

    fn resolve(&mut self, epoch: u32, logger: &slog::Logger) -> DateTime<Utc> {
        let mut day = (epoch >> 27) as u8;
        let mut millis = epoch & 0x07FF_FFFF;
        if day > 6 {
            warn!(logger, "GLONASS day out of range, clamping"; "day" => day);
            day = 6;
        }
        if millis >= MILLIS_PER_DAY {
            warn!(logger, "GLONASS epoch beyond one day, clamping"; "millis" => millis);
            millis = MILLIS_PER_DAY - 1;
        }
        if day != self.previous_day {
            self.start_of_day = self.start_of_day + Duration::days(1);
            self.previous_day = day;
        }
        self.start_of_day + Duration::milliseconds(i64::from(millis))
    }
}

/// Converts raw epoch timestamps to UTC, carrying week and day
/// rollover state for the lifetime of the decoder. Not meant to be
/// shared across tasks; a parallel consumer owns one decoder per task.
pub struct TimeResolver {
    gps: WeekCounter,
    galileo: WeekCounter,
    beidou: WeekCounter,
    glonass: DayCounter,
    logger: slog::Logger,
}

impl TimeResolver {
    /// Resolver anchored at `seed` with the historical leap-second
    /// counts.
    pub fn new(seed: DateTime<Utc>, logger: slog::Logger) -> TimeResolver {
        Self::with_leap_seconds(
            seed,
            DEFAULT_GPS_LEAP_SECONDS,
            DEFAULT_BEIDOU_LEAP_SECONDS,
            logger,
        )
    }

    /// Resolver with explicit leap-second counts, for deployments that
    /// track announcements instead of baking constants in.
    pub fn with_leap_seconds(
        seed: DateTime<Utc>,
        gps_leap: i64,
        beidou_leap: i64,
        logger: slog::Logger,
    ) -> TimeResolver {
        TimeResolver {
            gps: WeekCounter::new("GPS", seed, Duration::seconds(-gps_leap)),
            galileo: WeekCounter::new("Galileo", seed, Duration::seconds(-gps_leap)),
            beidou: WeekCounter::new("Beidou", seed, Duration::seconds(gps_leap - beidou_leap)),
            glonass: DayCounter::new(seed),
            logger,
        }
    }

    /// UTC instant of a message's 30-bit epoch, or `None` when the
    /// constellation has no defined epoch mapping.
    pub fn resolve(&mut self, constellation: Constellation, epoch: u32) -> Option<DateTime<Utc>> {
        match constellation {
            Constellation::Gps => Some(self.gps.resolve(epoch, &self.logger)),
            Constellation::Galileo => Some(self.galileo.resolve(epoch, &self.logger)),
            Constellation::Beidou => Some(self.beidou.resolve(epoch, &self.logger)),
            Constellation::Glonass => Some(self.glonass.resolve(epoch, &self.logger)),
            Constellation::Sbas | Constellation::Qzss | Constellation::NavIc => None,
        }
    }
}
