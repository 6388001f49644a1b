use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tracing::debug;

use super::{Fetch, HttpFetch, LookupAdapter};
use crate::declaration::{ParamKind, ParameterSchema, ToolDeclaration};
use crate::error::LookupError;

const DEFAULT_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const DEFAULT_CONDITIONS_URL: &str = "https://weather.googleapis.com/v1/currentConditions:lookup";

/// Declaration for the `search_weather` tool.
pub fn declaration() -> ToolDeclaration {
    ToolDeclaration::new(
        "search_weather",
        "Displays weather information.",
        ParameterSchema::object().required(
            "position",
            ParamKind::String,
            "The position to search for weather information, e.g., 'New York'.",
        ),
    )
}

#[derive(Debug, Deserialize)]
pub struct WeatherArgs {
    pub position: String,
}

/// What a completed weather lookup yields. Numbers are carried through
/// verbatim from the upstream service rather than re-encoded as floats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub temperature: Number,
    pub humidity: Number,
    pub text: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

/// Two dependent external steps: resolve the free-text position to
/// coordinates, then fetch current conditions there. The second step only
/// runs if the first succeeded; failure at either step short-circuits
/// into a single failure. No retries here — that belongs to a layer
/// above.
pub struct WeatherLookup {
    fetch: Box<dyn Fetch>,
    api_key: String,
    geocode_url: String,
    conditions_url: String,
}

impl WeatherLookup {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            fetch: Box::new(HttpFetch::new()),
            api_key: api_key.into(),
            geocode_url: DEFAULT_GEOCODE_URL.into(),
            conditions_url: DEFAULT_CONDITIONS_URL.into(),
        }
    }

    pub fn with_fetch(mut self, fetch: impl Fetch + 'static) -> Self {
        self.fetch = Box::new(fetch);
        self
    }

    pub fn with_endpoints(
        mut self,
        geocode_url: impl Into<String>,
        conditions_url: impl Into<String>,
    ) -> Self {
        self.geocode_url = geocode_url.into();
        self.conditions_url = conditions_url.into();
        self
    }

    async fn geocode(&self, position: &str) -> Result<(f64, f64), LookupError> {
        let url = Url::parse_with_params(
            &self.geocode_url,
            &[("address", position), ("key", self.api_key.as_str())],
        )
        .map_err(|e| LookupError::new(format!("bad geocode url: {e}")))?;
        let body = self.fetch.get_json(url).await?;
        parse_geocode(&body)
    }

    async fn conditions(&self, latitude: f64, longitude: f64) -> Result<Value, LookupError> {
        let url = Url::parse_with_params(
            &self.conditions_url,
            &[
                ("key", self.api_key.as_str()),
                ("location.latitude", &latitude.to_string()),
                ("location.longitude", &longitude.to_string()),
            ],
        )
        .map_err(|e| LookupError::new(format!("bad conditions url: {e}")))?;
        self.fetch.get_json(url).await
    }
}

#[async_trait]
impl LookupAdapter for WeatherLookup {
    type Args = WeatherArgs;
    type Output = WeatherReport;

    async fn lookup(&self, args: WeatherArgs) -> Result<WeatherReport, LookupError> {
        let (latitude, longitude) = match self.geocode(&args.position).await {
            Ok(coords) => coords,
            Err(e) => {
                debug!(position = %args.position, error = %e, "geocode step failed");
                return Err(LookupError::new("Failed to fetch coordinates."));
            }
        };

        let body = match self.conditions(latitude, longitude).await {
            Ok(body) => body,
            Err(e) => {
                debug!(latitude, longitude, error = %e, "conditions step failed");
                return Err(LookupError::new("Failed to fetch weather data."));
            }
        };

        let (temperature, humidity, text) = match parse_conditions(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(latitude, longitude, error = %e, "conditions body unusable");
                return Err(LookupError::new("Failed to fetch weather data."));
            }
        };

        Ok(WeatherReport {
            temperature,
            humidity,
            text,
            position: Position {
                latitude,
                longitude,
                name: args.position,
            },
        })
    }
}

/// Extract coordinates from a geocoding response. Anything other than
/// `status: "OK"` with a first result is a failure.
fn parse_geocode(body: &Value) -> Result<(f64, f64), LookupError> {
    if body["status"].as_str() != Some("OK") {
        return Err(LookupError::new(format!(
            "geocode status: {}",
            body["status"].as_str().unwrap_or("missing")
        )));
    }
    let location = &body["results"][0]["geometry"]["location"];
    match (location["lat"].as_f64(), location["lng"].as_f64()) {
        (Some(lat), Some(lng)) => Ok((lat, lng)),
        _ => Err(LookupError::new("geocode result has no location")),
    }
}

/// Extract the fields the report needs from a current-conditions
/// response. `temperature` may arrive either as a bare number or wrapped
/// as `{degrees: n}` depending on the service version.
fn parse_conditions(body: &Value) -> Result<(Number, Number, String), LookupError> {
    let temperature = number_field(&body["temperature"])
        .or_else(|| number_field(&body["temperature"]["degrees"]))
        .ok_or_else(|| LookupError::new("missing temperature"))?;
    let humidity = number_field(&body["relativeHumidity"])
        .ok_or_else(|| LookupError::new("missing relativeHumidity"))?;
    let text = body["weatherCondition"]["description"]["text"]
        .as_str()
        .ok_or_else(|| LookupError::new("missing weather condition text"))?
        .to_string();
    Ok((temperature, humidity, text))
}

fn number_field(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        _ => None,
    }
}

/// Alternative strategy behind the same declaration: a fixed report, no
/// network. Useful for demos and offline runs.
pub struct StaticWeatherLookup {
    report: WeatherReport,
}

impl StaticWeatherLookup {
    pub fn new(report: WeatherReport) -> Self {
        Self { report }
    }
}

impl Default for StaticWeatherLookup {
    fn default() -> Self {
        Self::new(WeatherReport {
            temperature: Number::from(21),
            humidity: Number::from(50),
            text: "Partly cloudy".into(),
            position: Position {
                latitude: 40.71,
                longitude: -74.0,
                name: "New York".into(),
            },
        })
    }
}

#[async_trait]
impl LookupAdapter for StaticWeatherLookup {
    type Args = WeatherArgs;
    type Output = WeatherReport;

    async fn lookup(&self, args: WeatherArgs) -> Result<WeatherReport, LookupError> {
        let mut report = self.report.clone();
        report.position.name = args.position;
        Ok(report)
    }
}
