//! Travel-API client: OAuth2 client-credentials token, city-to-IATA
//! resolution, and flight-offer search.

use async_trait::async_trait;
use chrono::NaiveDate;
use farebot_core::contract::{FlightSearch, LocationResolver};
use farebot_core::FlightOffer;
use serde::Deserialize;

pub struct TravelApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct LocationsResponse {
    #[serde(default)]
    data: Vec<WireLocation>,
}

#[derive(Debug, Deserialize)]
struct WireLocation {
    #[serde(rename = "iataCode")]
    iata_code: String,
}

#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    data: Vec<WireOffer>,
}

#[derive(Debug, Deserialize)]
struct WireOffer {
    #[serde(default)]
    itineraries: Vec<WireItinerary>,
    #[serde(rename = "validatingAirlineCodes", default)]
    validating_airline_codes: Vec<String>,
    price: WirePrice,
}

#[derive(Debug, Deserialize)]
struct WireItinerary {
    #[serde(default)]
    segments: Vec<WireSegment>,
}

#[derive(Debug, Deserialize)]
struct WireSegment {
    departure: WireEndpoint,
    arrival: WireEndpoint,
}

#[derive(Debug, Deserialize)]
struct WireEndpoint {
    #[serde(rename = "iataCode")]
    iata_code: String,
    at: String,
}

#[derive(Debug, Deserialize)]
struct WirePrice {
    total: String,
    currency: String,
}

impl TravelApiClient {
    pub fn new(base_url: String, api_key: String, api_secret: String, currency: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            api_secret,
            currency,
        }
    }

    async fn access_token(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let response = self
            .http
            .post(format!("{}/v1/security/oauth2/token", self.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.as_str()),
                ("client_secret", self.api_secret.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;
        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }
}

/// Flatten one wire offer into the first segment of its first itinerary.
/// Offers without segments or an airline code are dropped.
fn into_offer(wire: WireOffer) -> Option<FlightOffer> {
    let segment = wire.itineraries.into_iter().next()?.segments.into_iter().next()?;
    let airline_code = wire.validating_airline_codes.into_iter().next()?;
    let price = wire.price.total.parse::<f64>().ok()?;
    Some(FlightOffer {
        departure_code: segment.departure.iata_code,
        departure_at: segment.departure.at,
        arrival_code: segment.arrival.iata_code,
        arrival_at: segment.arrival.at,
        airline_code,
        price,
        currency: wire.price.currency,
    })
}

#[async_trait]
impl LocationResolver for TravelApiClient {
    async fn resolve_location_code(
        &self,
        city_name: &str,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{}/v1/reference-data/locations", self.base_url))
            .bearer_auth(token)
            .query(&[("keyword", city_name), ("subType", "CITY,AIRPORT")])
            .send()
            .await?
            .error_for_status()?;
        let locations: LocationsResponse = response.json().await?;
        Ok(locations.data.into_iter().next().map(|l| l.iata_code))
    }
}

#[async_trait]
impl FlightSearch for TravelApiClient {
    async fn search_offers(
        &self,
        origin_code: &str,
        destination_code: &str,
        date: NaiveDate,
    ) -> Result<Vec<FlightOffer>, Box<dyn std::error::Error + Send + Sync>> {
        let token = match self.access_token().await {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(error = %err, "travel API token request failed");
                return Ok(Vec::new());
            }
        };

        let departure_date = date.format("%Y-%m-%d").to_string();
        let request = self
            .http
            .get(format!("{}/v2/shopping/flight-offers", self.base_url))
            .bearer_auth(token)
            .query(&[
                ("originLocationCode", origin_code),
                ("destinationLocationCode", destination_code),
                ("departureDate", departure_date.as_str()),
                ("adults", "1"),
                ("nonStop", "false"),
                ("currencyCode", self.currency.as_str()),
            ]);

        // Search failures collapse to an empty result set; the dialogue
        // handles "no offers" and "search failed" the same way.
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "flight offer search request failed");
                return Ok(Vec::new());
            }
        };
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "flight offer search returned an error");
            return Ok(Vec::new());
        }

        let offers: OffersResponse = match response.json().await {
            Ok(offers) => offers,
            Err(err) => {
                tracing::warn!(error = %err, "flight offer response could not be parsed");
                return Ok(Vec::new());
            }
        };
        Ok(offers.data.into_iter().filter_map(into_offer).collect())
    }
}
