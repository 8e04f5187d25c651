use std::process;
use std::sync::Arc;

use clap::Parser;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;
use jiff::{Timestamp, Zoned};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use xcron::{FieldKind, Schedule, SearchState};

#[derive(Parser)]
#[command(name = "xcron", about = "Extended cron expressions", version)]
struct Cli {
    /// Schedule expression (e.g., "0 30 9 ? * MON-FRI *" or "@daily")
    expression: Option<String>,

    /// Number of occurrences to show
    #[arg(short, long, default_value = "1")]
    n: u32,

    /// Compute occurrences after this time instead of now
    /// (e.g., "2022-12-31T23:59:59Z" or "2022-12-31T23:59:59[Europe/Paris]")
    #[arg(long)]
    from: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Validate expression without computing
    #[arg(long)]
    check: bool,

    /// Show parsed fields as JSON
    #[arg(long)]
    parse: bool,

    /// Print the canonical seven-field expression
    #[arg(long)]
    canonical: bool,

    /// Parse the expression as a single field (e.g., "day-of-month") and print its combinations
    #[arg(long, value_name = "NAME")]
    field: Option<String>,

    /// Run a command on the schedule until interrupted
    #[arg(long, value_name = "COMMAND")]
    run: Option<String>,

    /// Print each fire time as it arrives until interrupted
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() {
    // `.` reads the instant the process started, not the instant of the parse.
    xcron::parser::startup();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let expression = match cli.expression {
        Some(ref expr) => expr.as_str(),
        None => {
            eprintln!("error: no expression provided");
            process::exit(2);
        }
    };

    if let Some(ref name) = cli.field {
        let parsed = FieldKind::from_name(name)
            .and_then(|kind| xcron::Parser::new().parse_field(expression, kind));
        match parsed {
            Ok(field) => match serde_json::to_string(field.combinations()) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("error: failed to serialize: {e}");
                    process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("{}", e.display_rich());
                process::exit(1);
            }
        }
        process::exit(0);
    }

    let schedule = match Schedule::parse(expression) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e.display_rich());
            process::exit(1);
        }
    };

    if cli.check {
        println!("\u{2713} valid");
        process::exit(0);
    }

    if cli.parse {
        match serde_json::to_string_pretty(&schedule) {
            Ok(json) => {
                println!("{json}");
                process::exit(0);
            }
            Err(e) => {
                eprintln!("error: failed to serialize: {e}");
                process::exit(1);
            }
        }
    }

    if cli.canonical {
        println!("{schedule}");
        process::exit(0);
    }

    if let Some(ref command) = cli.run {
        let job = match schedule.bind(command) {
            Ok(job) => job,
            Err(e) => {
                eprintln!("{}", e.display_rich());
                process::exit(1);
            }
        };
        job.run(shutdown_on_ctrl_c()).await;
        process::exit(0);
    }

    if cli.watch {
        let mut rx = xcron::watch(Arc::new(schedule), shutdown_on_ctrl_c());
        while let Some(next) = rx.recv().await {
            if cli.json {
                match serde_json::to_string(&next) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("error: failed to serialize: {e}");
                        process::exit(1);
                    }
                }
            } else {
                match next.time {
                    Some(time) => println!("{time}"),
                    None => println!("{}", next.state),
                }
            }
        }
        process::exit(0);
    }

    // Default: compute next N occurrences
    if cli.n == 0 {
        eprintln!("error: -n must be at least 1");
        process::exit(2);
    }
    let mut n = cli.n;
    if n > 1000 {
        eprintln!("warning: capped at 1000 occurrences");
        n = 1000;
    }

    let from = match cli.from {
        Some(ref s) => match parse_from(s) {
            Some(z) => z,
            None => {
                eprintln!("error: invalid --from time '{s}'");
                process::exit(2);
            }
        },
        None => Zoned::now(),
    };

    let results = schedule.next_n(&from, n as usize);

    if results.is_empty() {
        let state = schedule.next(Some(&from)).state;
        if state == SearchState::OnceExec {
            eprintln!("runs once at startup ({state})");
        } else {
            eprintln!("no upcoming occurrences ({state})");
        }
        process::exit(0);
    }

    if cli.json {
        let iso_strings: Vec<String> = results.iter().map(|z| z.to_string()).collect();
        match serde_json::to_string(&iso_strings) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: failed to serialize: {e}");
                process::exit(1);
            }
        }
    } else {
        for z in &results {
            println!("{z}");
        }
    }
}

/// Zoned (`...[Area/City]`), then an RFC 3339 instant in UTC, then a civil
/// datetime in the system time zone.
fn parse_from(s: &str) -> Option<Zoned> {
    if let Ok(zoned) = s.parse::<Zoned>() {
        return Some(zoned);
    }
    if let Ok(ts) = s.parse::<Timestamp>() {
        return Some(ts.to_zoned(TimeZone::UTC));
    }
    s.parse::<DateTime>()
        .ok()?
        .to_zoned(TimeZone::system())
        .ok()
}

fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received SIGINT, shutting down");
            cancel.cancel();
        }
    });
    token
}
