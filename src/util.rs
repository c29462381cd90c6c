use crate::location::Coordinate;
use log::debug;
use thiserror::Error;

// Which of the two prompt fields a parse failure came from
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CoordinateField {
    Latitude,
    Longitude,
}

impl std::fmt::Display for CoordinateField {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CoordinateField::Latitude => write!(f, "latitude"),
            CoordinateField::Longitude => write!(f, "longitude"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum InputError {
    #[error("{field} '{text}' is not a decimal number")]
    NotANumber { field: CoordinateField, text: String },
    #[error("{field} '{text}' is not finite")]
    NotFinite { field: CoordinateField, text: String },
}

/// Parses the two text fields of the coordinate prompt.
///
/// Each field must be a plain decimal as typed on a number pad. Surrounding
/// whitespace is not stripped and `NaN`/`inf` are refused, but out-of-range
/// values are accepted as-is.
pub fn parse_coordinate_input(lat_text: &str, lon_text: &str) -> Result<Coordinate, InputError> {
    let latitude = parse_field(CoordinateField::Latitude, lat_text)?;
    let longitude = parse_field(CoordinateField::Longitude, lon_text)?;
    Ok(Coordinate::new(latitude, longitude))
}

fn parse_field(field: CoordinateField, text: &str) -> Result<f64, InputError> {
    let value: f64 = text.parse().map_err(|_| {
        debug!("Rejected {} input '{}'", field, text);
        InputError::NotANumber {
            field,
            text: text.to_string(),
        }
    })?;
    if !value.is_finite() {
        return Err(InputError::NotFinite {
            field,
            text: text.to_string(),
        });
    }
    Ok(value)
}

/// Readout text while the live position is shown.
pub fn live_readout(coordinate: Coordinate) -> String {
    format!("当前位置: {}", coordinate)
}

/// Readout text while a virtual location is shown.
pub fn virtual_readout(coordinate: Coordinate) -> String {
    format!("虚拟位置: {}", coordinate)
}

pub fn marker_subtitle(coordinate: Coordinate) -> String {
    format!("纬度: {:?}, 经度: {:?}", coordinate.latitude, coordinate.longitude)
}
