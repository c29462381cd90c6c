use crate::location::SavedLocation;

// Represents the current high-level state of the application UI
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum State {
    Initialising, // App is starting, asking for location permission
    Running,      // Map, readout and buttons are shown
    About,        // Showing the about screen
}

// The modal currently shown on top of the map, if any
#[derive(Clone, PartialEq, Debug, Default)]
pub enum Dialog {
    #[default]
    None,
    CoordinatePrompt {
        latitude: String,
        longitude: String,
    },
    SavedLocations(Vec<SavedLocation>),
    Message {
        title: &'static str,
        body: &'static str,
    },
}

impl Dialog {
    pub fn coordinate_prompt() -> Self {
        Dialog::CoordinatePrompt {
            latitude: String::new(),
            longitude: String::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, Dialog::None)
    }
}
