use clap::{Parser, Subcommand};
use inquire::Text;
use std::sync::Arc;

use crate::handlers::message::MessageHandler;
use crate::models::booking::{BookingOutcome, BookingRequest, Intent};
use crate::service::booking_flow::BookingFlow;
use crate::service::conflict_service::ConflictDetector;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Book an appointment from structured date/time fields
    Book {
        date: String,
        time: String,
        #[arg(default_value = "Appointment")]
        service: String,
    },
    /// Book from a free-text request via the intent extractor
    BookPrompt {},
    /// List free business-hour slots for a date (YYYY-MM-DD)
    Slots { date: String },
}

pub async fn cli(
    flow: Arc<BookingFlow>,
    handler: Arc<MessageHandler>,
    detector: Arc<ConflictDetector>,
) {
    // Fine to panic here
    let cli = Cli::parse();
    match &cli.command {
        Commands::Book { date, time, service } => {
            let request = BookingRequest {
                intent: Intent::BookAppointment,
                date: Some(date.clone()),
                time: Some(time.clone()),
                service_label: Some(service.clone()),
                raw_text: format!("{service} on {date} at {time}"),
            };
            print_outcome(&flow.handle(&request).await);
        }
        Commands::BookPrompt {} => match Text::new("What would you like to book?").prompt() {
            Ok(text) => print_outcome(&handler.handle(&text, None).await),
            Err(_) => println!("No booking request supplied"),
        },
        Commands::Slots { date } => match detector.available_slots(date).await {
            Ok(slots) if slots.is_empty() => println!("No free slots on {date}"),
            Ok(slots) => {
                for slot in slots {
                    println!("{slot}");
                }
            }
            Err(e) => println!("Failed to list available slots: {e}"),
        },
    }
}

fn print_outcome(outcome: &BookingOutcome) {
    match serde_json::to_string_pretty(outcome) {
        Ok(rendered) => println!("{rendered}"),
        Err(_) => println!("{outcome:?}"),
    }
}
