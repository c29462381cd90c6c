use serde::{Deserialize, Serialize};

/// A latitude/longitude pair. Nothing in the app range-checks these, values
/// outside ±90/±180 are carried through as entered.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

// How a coordinate appears in the readout label. Whole numbers keep their
// trailing ".0" so 10 reads as "10.0".
impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}, {:?}", self.latitude, self.longitude)
    }
}

// One record of the persisted list. Field names are part of the stored format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl SavedLocation {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

// How a saved location is listed in the selection menu
impl std::fmt::Display for SavedLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Whether a virtual location currently replaces the live position.
///
/// `coordinate` is only meaningful while `active` is set. Clearing the
/// override leaves the last coordinate in place until the next one replaces it.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct OverrideState {
    pub active: bool,
    pub coordinate: Option<Coordinate>,
}

impl OverrideState {
    pub fn activate(&mut self, coordinate: Coordinate) {
        self.active = true;
        self.coordinate = Some(coordinate);
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

// Authorization as reported by the location collaborator
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AuthorizationStatus {
    Authorized,
    Denied, // Also covers "restricted"
    NotDetermined,
}

impl std::fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AuthorizationStatus::Authorized => write!(f, "authorized"),
            AuthorizationStatus::Denied => write!(f, "denied"),
            AuthorizationStatus::NotDetermined => write!(f, "not determined"),
        }
    }
}

/// Messages pushed by the location collaborator onto the update channel.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    /// A batch of readings, oldest first. Only the last one matters.
    Updated(Vec<Coordinate>),
    Failed(String),
    AuthorizationChanged(AuthorizationStatus),
}
