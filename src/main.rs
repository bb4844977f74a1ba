//! `baysched`: command-line access to the bay schedule.
//!
//! Every command prints JSON on stdout; logs go to stderr.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use ulid::Ulid;

use baysched::clock::{self, format_time, next_valid_days};
use baysched::config::Config;
use baysched::engine::Engine;
use baysched::model::*;

/// Bay scheduling for a vehicle service shop.
#[derive(Parser, Debug)]
#[command(name = "baysched", about = "Bay scheduling and allocation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// The next bookable days, Sundays skipped.
    Days {
        #[arg(default_value_t = 7)]
        n: usize,
    },

    /// List every bay in registry order.
    Bays,

    /// Register a bay.
    AddBay {
        name: String,
        /// washBay or generalService.
        #[arg(value_parser = parse_bay_type)]
        bay_type: BayType,
    },

    /// Bays free for a window.
    Free {
        /// yyyy-mm-dd
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
        /// HH:mm
        #[arg(value_parser = parse_hhmm)]
        start: Minutes,
        /// HH:mm
        #[arg(value_parser = parse_hhmm)]
        end: Minutes,
        /// Only bays of this type.
        #[arg(value_parser = parse_bay_type)]
        bay_type: Option<BayType>,
    },

    /// Start times still bookable for a service.
    Slots {
        /// yyyy-mm-dd
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
        minutes: Minutes,
        /// Service label, e.g. "Lavagem completa".
        #[arg(num_args = 1.., required = true)]
        label: Vec<String>,
    },

    /// Book an appointment and allocate a bay.
    Book {
        /// yyyy-mm-dd
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
        /// HH:mm
        #[arg(value_parser = parse_hhmm)]
        time: Minutes,
        minutes: Minutes,
        service: String,
        client: String,
        plate: String,
    },

    /// Delete an appointment and its reservation.
    Cancel { id: Ulid },

    /// Every occupancy on a date, by start time.
    Timeline {
        /// yyyy-mm-dd
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();
    baysched::observability::init(config.metrics_port)?;

    let mut engine = Engine::open(&config)?;
    info!("data_dir: {}, tz: {}", config.data_dir.display(), config.timezone);

    let output = match cli.command {
        Command::Days { n } => serde_json::to_value(next_valid_days(engine.clock(), n))?,
        Command::Bays => serde_json::to_value(engine.list_bays())?,
        Command::AddBay { name, bay_type } => {
            serde_json::to_value(engine.create_bay(NewBay::new(name, bay_type))?)?
        }
        Command::Free {
            date,
            start,
            end,
            bay_type,
        } => {
            if start >= end {
                return Err("end must be after start".into());
            }
            serde_json::to_value(engine.free_bays(date, Span::new(start, end), bay_type, None))?
        }
        Command::Slots {
            date,
            minutes,
            label,
        } => {
            let slots: Vec<serde_json::Value> = engine
                .available_slots(date, minutes, &label.join(" "), None)
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "start": format_time(s.span.start),
                        "end": format_time(s.span.end),
                        "freeBays": s.free_bays,
                    })
                })
                .collect();
            serde_json::Value::Array(slots)
        }
        Command::Book {
            date,
            time,
            minutes,
            service,
            client,
            plate,
        } => {
            let appt = engine.create_appointment(NewAppointment {
                title: String::new(),
                plate,
                responsible_id: None,
                client_name: client,
                phone: String::new(),
                service_type: service,
                origin: OriginTag::Internal,
                date,
                time,
                duration_minutes: minutes,
                client_ref: None,
                payment_terms: None,
                payment_method: None,
            })?;
            if appt.bay_id.is_none() {
                eprintln!(
                    "no bay available at {} on {}",
                    format_time(time),
                    clock::format_long(date)
                );
            }
            serde_json::to_value(appt)?
        }
        Command::Cancel { id } => serde_json::to_value(engine.delete_appointment(id)?)?,
        Command::Timeline { date } => serde_json::to_value(engine.occupancies_on(date))?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    clock::parse_iso(s).ok_or_else(|| format!("'{s}' is not a yyyy-mm-dd date"))
}

fn parse_hhmm(s: &str) -> Result<Minutes, String> {
    clock::parse_time(s).ok_or_else(|| format!("'{s}' is not an HH:mm time"))
}

fn parse_bay_type(s: &str) -> Result<BayType, String> {
    s.parse::<BayType>()
        .map_err(|()| format!("unknown bay type '{s}', expected washBay or generalService"))
}
