use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seatline_client::config::Config;
use seatline_client::{
    HttpBookingConfirmer, HttpHoldService, HttpInventorySearch, HttpPaymentOrders,
    HttpSeatMapSource, PollingCheckoutGateway, RestClient,
};
use seatline_core::manifest::{Passenger, PassengerCategory, UserContext};
use seatline_core::search::SearchCriteria;
use seatline_workflow::mock;
use seatline_workflow::{
    BookingConfirmationService, BookingWorkflow, Collaborators, PaymentOrchestrator,
    SeatHoldManager, WorkflowError,
};

struct CliArgs {
    mock: bool,
    origin: String,
    destination: String,
    date: NaiveDate,
    trip: Option<String>,
    seats: Vec<String>,
    passengers: Vec<Passenger>,
    user: UserContext,
}

fn usage() -> ! {
    eprintln!(
        "Usage: seatline [--mock] --origin <city> --destination <city> --date <YYYY-MM-DD> \\\n\
         \x20       --seats S1,S2 --passenger '<name>,<age>,<MALE|FEMALE|OTHER>' [...] \\\n\
         \x20       [--trip <trip-id>] [--name <user>] [--phone <phone>] [--email <email>]"
    );
    std::process::exit(2);
}

fn parse_passenger(raw: &str) -> Result<Passenger> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        bail!("passenger must be '<name>,<age>,<MALE|FEMALE|OTHER>', got '{}'", raw);
    }
    let age: u8 = parts[1]
        .parse()
        .with_context(|| format!("invalid passenger age '{}'", parts[1]))?;
    let category = match parts[2].to_ascii_uppercase().as_str() {
        "MALE" => PassengerCategory::Male,
        "FEMALE" => PassengerCategory::Female,
        "OTHER" => PassengerCategory::Other,
        other => bail!("unknown passenger category '{}'", other),
    };
    Ok(Passenger {
        name: parts[0].to_string(),
        age,
        category,
        phone: None,
        email: None,
    })
}

fn parse_args() -> Result<CliArgs> {
    let mut args = std::env::args().skip(1);

    let mut mock = false;
    let mut origin = None;
    let mut destination = None;
    let mut date = None;
    let mut trip = None;
    let mut seats = Vec::new();
    let mut passengers = Vec::new();
    let mut name = "Guest".to_string();
    let mut phone = "0000000000".to_string();
    let mut email = "guest@example.com".to_string();

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .with_context(|| format!("{} requires a value", flag))
        };
        match arg.as_str() {
            "--mock" => mock = true,
            "--origin" => origin = Some(value("--origin")?),
            "--destination" => destination = Some(value("--destination")?),
            "--date" => {
                let raw = value("--date")?;
                date = Some(
                    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                        .with_context(|| format!("invalid date '{}'", raw))?,
                );
            }
            "--trip" => trip = Some(value("--trip")?),
            "--seats" => {
                seats = value("--seats")?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "--passenger" => passengers.push(parse_passenger(&value("--passenger")?)?),
            "--name" => name = value("--name")?,
            "--phone" => phone = value("--phone")?,
            "--email" => email = value("--email")?,
            "--help" | "-h" => usage(),
            other => {
                eprintln!("Unknown argument: {}", other);
                usage();
            }
        }
    }

    // The mock run is self-contained; fill in a demo itinerary where the
    // caller left gaps
    if mock {
        origin.get_or_insert_with(|| "Pune".to_string());
        destination.get_or_insert_with(|| "Mumbai".to_string());
        date.get_or_insert_with(|| Utc::now().date_naive() + ChronoDuration::days(7));
        if seats.is_empty() {
            seats = vec!["S1".to_string(), "S2".to_string()];
        }
        if passengers.is_empty() {
            passengers = mock::demo_manifest(seats.len());
        }
    }

    let (origin, destination, date) = match (origin, destination, date) {
        (Some(o), Some(d), Some(t)) => (o, d, t),
        _ => usage(),
    };
    if seats.is_empty() || passengers.is_empty() {
        usage();
    }

    Ok(CliArgs {
        mock,
        origin,
        destination,
        date,
        trip,
        seats,
        passengers,
        user: UserContext { name, phone, email },
    })
}

fn mock_collaborators(config: &Config) -> Collaborators {
    let seat_maps = Arc::new(mock::MockSeatMapSource::new());
    seat_maps.set_seats("trip-101", mock::demo_seats());
    seat_maps.set_seats("trip-102", mock::demo_seats());

    Collaborators {
        search: Arc::new(mock::MockInventorySearch::new(mock::demo_trips())),
        seat_maps,
        holds: SeatHoldManager::new(
            Arc::new(mock::MockHoldService::new(ChronoDuration::minutes(10))),
            config.rules.max_seats_per_hold,
        ),
        payments: PaymentOrchestrator::new(
            Arc::new(mock::MockPaymentOrders::new()),
            Arc::new(mock::MockCheckoutGateway::new()),
            Duration::from_secs(config.rules.checkout_timeout_secs),
        ),
        confirmations: BookingConfirmationService::new(
            Arc::new(mock::MockBookingConfirmer::new()),
            config.rules.confirm_retry_attempts,
            Duration::from_millis(config.rules.retry_backoff_ms),
        ),
    }
}

fn http_collaborators(config: &Config) -> Result<Collaborators> {
    let rest = RestClient::new(&config.endpoints, config.rules.retry_backoff_ms)?;

    Ok(Collaborators {
        search: Arc::new(HttpInventorySearch::new(rest.clone())),
        seat_maps: Arc::new(HttpSeatMapSource::new(rest.clone())),
        holds: SeatHoldManager::new(
            Arc::new(HttpHoldService::new(rest.clone())),
            config.rules.max_seats_per_hold,
        ),
        payments: PaymentOrchestrator::new(
            Arc::new(HttpPaymentOrders::new(rest.clone())),
            Arc::new(PollingCheckoutGateway::new(
                rest.clone(),
                &config.gateway,
                config.rules.checkout_timeout_secs,
            )),
            Duration::from_secs(config.rules.checkout_timeout_secs),
        ),
        confirmations: BookingConfirmationService::new(
            Arc::new(HttpBookingConfirmer::new(rest)),
            config.rules.confirm_retry_attempts,
            Duration::from_millis(config.rules.retry_backoff_ms),
        ),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seatline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = parse_args()?;
    let config = Config::load().context("Failed to load config")?;
    if args.mock {
        tracing::info!("Running against mock collaborators");
    } else {
        tracing::info!("Booking via {}", config.endpoints.base_url);
    }

    let collab = if args.mock {
        mock_collaborators(&config)
    } else {
        http_collaborators(&config)?
    };
    let workflow = BookingWorkflow::new(collab, args.user, config.rules.max_passengers);

    let view = workflow
        .search(SearchCriteria {
            origin: args.origin.clone(),
            destination: args.destination.clone(),
            travel_date: args.date,
            passengers: args.passengers.len() as u32,
        })
        .await?;

    if view.trips.is_empty() {
        bail!(
            "No trips matched {} -> {} on {}",
            args.origin,
            args.destination,
            args.date
        );
    }
    println!("Found {} trips:", view.trips.len());
    for trip in &view.trips {
        println!(
            "  {}  {}  departs {}  from {} {}",
            trip.trip_id,
            trip.operator,
            trip.departure_time.format("%Y-%m-%d %H:%M"),
            trip.base_fare,
            trip.currency
        );
    }

    let trip_id = args
        .trip
        .clone()
        .unwrap_or_else(|| view.trips[0].trip_id.clone());
    workflow.select_trip(&trip_id).await?;

    let view = workflow
        .select_seats(args.seats.clone(), args.passengers.clone())
        .await?;
    println!(
        "Seats [{}] held until {}; total {} {}",
        view.held_seats.join(", "),
        view.hold_expires_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default(),
        view.total_due.unwrap_or_default(),
        view.currency.clone().unwrap_or_default()
    );

    let view = match workflow.pay().await {
        Ok(view) => view,
        Err(WorkflowError::ConfirmationPending(reason)) => {
            // Funds may be captured; retry the identical pair once before
            // handing the situation to the user
            eprintln!("Payment authorized but booking unconfirmed: {}", reason);
            match workflow.retry_confirm().await {
                Ok(view) => view,
                Err(err) => {
                    bail!(
                        "Booking still unconfirmed ({}). Do not pay again; \
                         retry later or contact support with your payment reference.",
                        err
                    );
                }
            }
        }
        Err(err) => return Err(err.into()),
    };

    let record = view
        .booking
        .context("confirmation stage without a booking record")?;
    println!(
        "Booked! Confirmation {} ({} {} charged)",
        record.confirmation_code, record.amount_charged, record.currency
    );

    Ok(())
}
