//! Typed views over the normalized API payloads.
//!
//! Decoding is lenient where the service has been observed to drift: prices and coordinates arrive
//! as numbers or numeric strings, timestamps as RFC 3339 or `YYYY-MM-DD HH:MM:SS`, and several
//! fields have been renamed or dropped across releases.

// crates.io
use serde::{
	Deserializer,
	de::{DeserializeOwned, Error as _},
};
use time::{
	PrimitiveDateTime, format_description::well_known::Rfc3339, macros::format_description,
};
// self
use crate::_prelude::*;

/// Price reported for one fuel grade at a station.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FuelPrice {
	/// Fuel grade label (e.g. `E10`, `B7`).
	pub fuel_type: String,
	/// Pence per litre; `None` when the station reports no price.
	#[serde(default, deserialize_with = "lenient_number")]
	pub price: Option<f64>,
	/// When the station last changed this price.
	#[serde(default, alias = "updated_at", deserialize_with = "lenient_timestamp")]
	pub price_last_updated: Option<OffsetDateTime>,
}

/// Petrol filling station with its current prices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pfs {
	/// Stable station identifier.
	pub node_id: String,
	/// Operating organisation; absent from newer responses.
	#[serde(default)]
	pub mft_organisation_name: Option<String>,
	/// Name shown on the forecourt.
	pub trading_name: String,
	/// Public phone number, if published.
	#[serde(default)]
	pub public_phone_number: Option<String>,
	/// Prices per fuel grade.
	#[serde(default)]
	pub fuel_prices: Vec<FuelPrice>,
}
impl Pfs {
	/// Returns the price entry for `fuel_type`, if the station sells it.
	pub fn fuel_price(&self, fuel_type: &str) -> Option<&FuelPrice> {
		self.fuel_prices.iter().find(|price| price.fuel_type == fuel_type)
	}
}

/// Postal address block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
	/// First address line.
	#[serde(default, alias = "line1")]
	pub address_line_1: Option<String>,
	/// Second address line.
	#[serde(default, alias = "line2")]
	pub address_line_2: Option<String>,
	/// Town or city.
	#[serde(default)]
	pub city: Option<String>,
	/// Country.
	#[serde(default)]
	pub country: Option<String>,
	/// County.
	#[serde(default)]
	pub county: Option<String>,
	/// Postcode.
	#[serde(default)]
	pub postcode: Option<String>,
}

/// Geographic position plus the address lines the service embeds in it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
	/// Decimal degrees.
	#[serde(default, deserialize_with = "lenient_number")]
	pub latitude: Option<f64>,
	/// Decimal degrees.
	#[serde(default, deserialize_with = "lenient_number")]
	pub longitude: Option<f64>,
	/// First address line.
	#[serde(default, alias = "line1")]
	pub address_line_1: Option<String>,
	/// Second address line.
	#[serde(default, alias = "line2")]
	pub address_line_2: Option<String>,
	/// Town or city.
	#[serde(default)]
	pub city: Option<String>,
	/// Country.
	#[serde(default)]
	pub country: Option<String>,
	/// County.
	#[serde(default)]
	pub county: Option<String>,
	/// Postcode.
	#[serde(default)]
	pub postcode: Option<String>,
}
impl Location {
	/// Returns `(latitude, longitude)` when both are known and non-zero.
	pub fn coordinates(&self) -> Option<(f64, f64)> {
		match (self.latitude, self.longitude) {
			(Some(lat), Some(lon)) if lat != 0.0 && lon != 0.0 => Some((lat, lon)),
			_ => None,
		}
	}
}

/// Station metadata without prices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PfsInfo {
	/// Stable station identifier.
	pub node_id: String,
	/// Operating organisation; absent from newer responses.
	#[serde(default)]
	pub mft_organisation_name: Option<String>,
	/// Name shown on the forecourt.
	pub trading_name: String,
	/// Public phone number, if published.
	#[serde(default)]
	pub public_phone_number: Option<String>,
	/// Whether the trading name doubles as the brand.
	#[serde(default)]
	pub is_same_trading_and_brand_name: Option<bool>,
	/// Fuel brand.
	#[serde(default, alias = "brand")]
	pub brand_name: Option<String>,
	/// Temporarily closed.
	#[serde(default)]
	pub temporary_closure: Option<bool>,
	/// Permanently closed.
	#[serde(default)]
	pub permanent_closure: Option<bool>,
	/// Closure date as reported.
	#[serde(default)]
	pub permanent_closure_date: Option<String>,
	/// Located at a motorway service area.
	#[serde(default)]
	pub is_motorway_service_station: Option<bool>,
	/// Operated at a supermarket.
	#[serde(default)]
	pub is_supermarket_service_station: Option<bool>,
	/// Position and embedded address lines.
	#[serde(default)]
	pub location: Option<Location>,
	/// Standalone address block, when the service sends one.
	#[serde(default)]
	pub address: Option<Address>,
	/// Amenity labels.
	#[serde(default)]
	pub amenities: Option<Vec<String>>,
	/// Opening times, kept as raw JSON since the schema varies by release.
	#[serde(default, alias = "opening_hours")]
	pub opening_times: Option<Value>,
	/// Fuel grades sold.
	#[serde(default)]
	pub fuel_types: Option<Vec<String>>,
}
impl PfsInfo {
	/// Returns the station coordinates, if known.
	pub fn coordinates(&self) -> Option<(f64, f64)> {
		self.location.as_ref().and_then(Location::coordinates)
	}
}

/// Decodes a normalized list payload, reporting the JSON path of the first mismatch.
pub fn decode_list<T>(payload: Value) -> Result<Vec<T>>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(payload).map_err(|e| {
		let path = e.path().to_string();

		Error::response_parse(format!("unexpected payload shape at `{path}`"), e)
	})
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
	Number(f64),
	Text(String),
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<NumberOrText>::deserialize(deserializer)? {
		None => Ok(None),
		Some(NumberOrText::Number(value)) => Ok(Some(value)),
		Some(NumberOrText::Text(text)) => {
			let text = text.trim();

			if text.is_empty() {
				return Ok(None);
			}

			text.parse()
				.map(Some)
				.map_err(|_| D::Error::custom(format!("`{text}` is not a number")))
		},
	}
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = Option::<String>::deserialize(deserializer)?;

	Ok(raw.as_deref().map(str::trim).filter(|raw| !raw.is_empty()).and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc3339) {
		return Some(moment);
	}

	let naive = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

	PrimitiveDateTime::parse(raw, naive).ok().map(PrimitiveDateTime::assume_utc)
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn prices_accept_numbers_and_strings() {
		let prices: Vec<FuelPrice> = decode_list(json!([
			{ "fuel_type": "E10", "price": "0142.9000", "price_last_updated": "2026-02-02 18:00:00" },
			{ "fuel_type": "B7", "price": 148.5, "updated_at": "2026-02-02T18:00:00Z" },
			{ "fuel_type": "E5", "price": "" },
			{ "fuel_type": "SDV", "price": null },
		]))
		.expect("Price payload should decode.");

		assert_eq!(prices[0].price, Some(142.9));
		assert_eq!(prices[0].price_last_updated, Some(datetime!(2026-02-02 18:00:00 UTC)));
		assert_eq!(prices[1].price, Some(148.5));
		assert_eq!(prices[1].price_last_updated, Some(datetime!(2026-02-02 18:00:00 UTC)));
		assert_eq!(prices[2].price, None);
		assert_eq!(prices[3].price, None);
	}

	#[test]
	fn stations_tolerate_missing_organisation() {
		let stations: Vec<Pfs> = decode_list(json!([{
			"node_id": "0028acef5f3afc41c7e7d",
			"public_phone_number": null,
			"trading_name": "FORECOURT 4",
			"fuel_prices": [{ "fuel_type": "unleaded", "price": 142.9 }],
		}]))
		.expect("Station payload should decode.");

		assert!(stations[0].mft_organisation_name.is_none());
		assert_eq!(stations[0].fuel_price("unleaded").and_then(|p| p.price), Some(142.9));
		assert!(stations[0].fuel_price("diesel").is_none());
	}

	#[test]
	fn info_reads_aliases_and_string_coordinates() {
		let info: Vec<PfsInfo> = decode_list(json!([{
			"node_id": "a",
			"trading_name": "Shell Station",
			"address": { "line1": "123 High Street", "line2": null, "city": "London" },
			"location": { "latitude": "51.5074", "longitude": -0.1278 },
			"brand": "Shell",
			"opening_hours": { "monday": "00:00-23:59" },
		}]))
		.expect("Info payload should decode.");

		assert_eq!(info[0].brand_name.as_deref(), Some("Shell"));
		assert_eq!(info[0].coordinates(), Some((51.5074, -0.1278)));
		assert_eq!(
			info[0].address.as_ref().and_then(|a| a.address_line_1.as_deref()),
			Some("123 High Street")
		);
		assert!(info[0].opening_times.is_some());
	}

	#[test]
	fn decode_errors_carry_the_json_path() {
		let err = decode_list::<Pfs>(json!([{ "node_id": "a", "trading_name": "x" }, { "node_id": 7 }]))
			.expect_err("Malformed station should fail.");

		assert!(matches!(err, Error::ResponseParse { ref message, .. } if message.contains("[1]")));
	}
}
