//! PDF ticket artifact, rendered on a blocking worker thread.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use farebot_core::contract::TicketRenderer;
use farebot_core::{FlightOffer, Passenger};
use printpdf::{BuiltinFont, Mm, PdfDocument};

pub struct PdfTicket {
    output_dir: PathBuf,
}

impl PdfTicket {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

#[async_trait]
impl TicketRenderer for PdfTicket {
    async fn render_ticket(
        &self,
        booking_reference: &str,
        flight: &FlightOffer,
        passengers: &[Passenger],
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let path = self.output_dir.join(format!("{}.pdf", booking_reference));
        let reference = booking_reference.to_string();
        let flight = flight.clone();
        let passengers = passengers.to_vec();
        let output_dir = self.output_dir.clone();
        let render_path = path.clone();

        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&output_dir)?;
            write_pdf(&render_path, &reference, &flight, &passengers)
        })
        .await??;

        Ok(path.display().to_string())
    }
}

fn write_pdf(
    path: &Path,
    booking_reference: &str,
    flight: &FlightOffer,
    passengers: &[Passenger],
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (doc, page, layer) = PdfDocument::new("Flight Ticket", Mm(210.0), Mm(297.0), "ticket");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| e.to_string())?;
    let layer = doc.get_page(page).get_layer(layer);

    let mut y = 280.0;
    let mut line = |text: String| {
        layer.use_text(text, 12.0, Mm(14.0), Mm(y), &font);
        y -= 8.0;
    };

    line("Flight Ticket".to_string());
    line(format!("Booking Reference: {}", booking_reference));
    line(format!("Origin: {}", flight.departure_code));
    line(format!("Destination: {}", flight.arrival_code));
    line(format!("Departure Time: {}", flight.departure_at));
    line(format!("Arrival Time: {}", flight.arrival_at));
    line(format!("Airline: {}", flight.airline_code));
    line(format!("Total Passengers: {}", passengers.len()));
    line("Passenger Details:".to_string());
    for passenger in passengers {
        line(format!(
            "Name: {}, Age: {}, Gender: {}, Seat: {}",
            passenger.name,
            passenger.age,
            passenger.gender.as_str(),
            passenger.seat
        ));
    }

    doc.save(&mut BufWriter::new(File::create(path)?))
        .map_err(|e| e.to_string())?;
    Ok(())
}
