use crate::location::{AuthorizationStatus, Coordinate, LocationEvent, OverrideState, SavedLocation};
use crate::store::{KeyValueSlots, LocationStore};
use crate::util::{self, InputError};
use log::{debug, error, info, trace, warn};

/// Name given to every location saved through the override.
pub const DEFAULT_LOCATION_NAME: &str = "虚拟位置";
/// Side length of the visible map region, in meters.
pub const DEFAULT_SPAN_METERS: f64 = 1000.0;
/// Readout shown before any position is known.
pub const UNSET_READOUT: &str = "当前坐标: 未设置";

/// The map widget as the controller sees it.
pub trait MapDisplay {
    fn set_visible_region(&mut self, center: Coordinate, span_meters: f64);
    /// Replaces whatever marker is currently shown.
    fn set_single_marker(&mut self, coordinate: Coordinate, title: String, subtitle: String);
    fn set_readout_text(&mut self, text: String);
}

/// The device's location service.
///
/// Every call is fire-and-forget. Results come back later as
/// [`LocationEvent`]s handed to [`OverrideController::handle_event`].
pub trait LocationProvider {
    fn request_authorization(&self);
    fn start_continuous_updates(&self);
    fn request_one_shot_location(&self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub span_meters: f64,
    pub default_name: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            span_meters: DEFAULT_SPAN_METERS,
            default_name: DEFAULT_LOCATION_NAME.to_string(),
        }
    }
}

/// Outcome of setting a virtual location, for the caller to present.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VirtualLocationSet {
    pub coordinate: Coordinate,
    /// Whether a new record reached the store. False when the name was
    /// already taken or the write failed.
    pub saved: bool,
}

/// Decides what the map shows: the live device position, or a virtual
/// location that suppresses it.
pub struct OverrideController<D: MapDisplay, P: LocationProvider, S: KeyValueSlots> {
    display: D,
    provider: P,
    store: LocationStore<S>,
    settings: ControllerSettings,
    state: OverrideState,
    displayed: Option<Coordinate>,
    live_updates_disabled: bool, // Set once authorization is denied
}

impl<D: MapDisplay, P: LocationProvider, S: KeyValueSlots> OverrideController<D, P, S> {
    pub fn new(display: D, provider: P, store: LocationStore<S>, settings: ControllerSettings) -> Self {
        Self {
            display,
            provider,
            store,
            settings,
            state: OverrideState::default(),
            displayed: None,
            live_updates_disabled: false,
        }
    }

    /// Puts the initial readout up and asks for location permission. The
    /// answer arrives as an authorization event.
    pub fn start(&mut self) {
        self.display.set_readout_text(UNSET_READOUT.to_string());
        self.provider.request_authorization();
        info!("Location override controller started.");
    }

    /// Shows `latitude`/`longitude` in place of the live position and
    /// records it in the store under the default name.
    pub fn set_virtual_location(&mut self, latitude: f64, longitude: f64) -> VirtualLocationSet {
        let coordinate = Coordinate::new(latitude, longitude);
        self.state.activate(coordinate);

        self.display
            .set_visible_region(coordinate, self.settings.span_meters);
        self.display.set_single_marker(
            coordinate,
            self.settings.default_name.clone(),
            util::marker_subtitle(coordinate),
        );
        self.display.set_readout_text(util::virtual_readout(coordinate));
        self.displayed = Some(coordinate);
        info!("Virtual location set to {}", coordinate);

        let saved = match self
            .store
            .append(&self.settings.default_name, latitude, longitude)
        {
            Ok(saved) => saved,
            Err(e) => {
                error!("Failed to save virtual location: {}", e);
                false
            }
        };

        VirtualLocationSet { coordinate, saved }
    }

    /// Parses the prompt fields, then behaves like
    /// [`set_virtual_location`](Self::set_virtual_location). Nothing changes
    /// when either field is malformed.
    pub fn set_virtual_location_from_input(
        &mut self,
        lat_text: &str,
        lon_text: &str,
    ) -> Result<VirtualLocationSet, InputError> {
        let coordinate = util::parse_coordinate_input(lat_text, lon_text)?;
        Ok(self.set_virtual_location(coordinate.latitude, coordinate.longitude))
    }

    /// Re-applies a record picked from the saved-location menu.
    pub fn select_saved_location(&mut self, location: &SavedLocation) -> VirtualLocationSet {
        debug!("Selected saved location '{}'", location.name);
        self.set_virtual_location(location.latitude, location.longitude)
    }

    /// Drops the override and asks for one fresh reading. The display only
    /// changes once that reading arrives. After a denial no reading is
    /// requested, since live updates stay off until relaunch.
    pub fn show_current_location(&mut self) {
        self.state.deactivate();
        if self.live_updates_disabled {
            warn!("Location access was denied, live position unavailable.");
            return;
        }
        self.provider.request_one_shot_location();
        info!("Switched back to the live location.");
    }

    /// Applies a live reading unless a virtual location is active. Returns
    /// whether the display changed.
    pub fn on_location_update(&mut self, coordinate: Coordinate) -> bool {
        trace!("Live location: {}", coordinate);
        if self.state.active {
            trace!("Virtual location active, ignoring live reading.");
            return false;
        }
        if self.live_updates_disabled {
            return false;
        }

        self.display
            .set_visible_region(coordinate, self.settings.span_meters);
        self.display.set_readout_text(util::live_readout(coordinate));
        self.displayed = Some(coordinate);
        true
    }

    pub fn on_location_error(&mut self, message: &str) {
        warn!("Failed to get location: {}", message);
    }

    pub fn on_authorization_changed(&mut self, status: AuthorizationStatus) {
        debug!("Location authorization is now {}", status);
        match status {
            AuthorizationStatus::Authorized => {
                if self.live_updates_disabled {
                    info!("Ignoring authorization granted after a denial until relaunch.");
                    return;
                }
                self.provider.start_continuous_updates();
            }
            AuthorizationStatus::Denied => {
                warn!("Location permission denied.");
                self.live_updates_disabled = true;
            }
            AuthorizationStatus::NotDetermined => {
                self.provider.request_authorization();
            }
        }
    }

    /// Dispatches one message from the location update channel.
    pub fn handle_event(&mut self, event: LocationEvent) {
        match event {
            LocationEvent::Updated(readings) => {
                if let Some(last) = readings.last() {
                    self.on_location_update(*last);
                }
            }
            LocationEvent::Failed(message) => self.on_location_error(&message),
            LocationEvent::AuthorizationChanged(status) => self.on_authorization_changed(status),
        }
    }

    pub fn saved_locations(&self) -> Vec<SavedLocation> {
        self.store.list()
    }

    pub fn state(&self) -> OverrideState {
        self.state
    }

    /// The coordinate the map was last centered on.
    pub fn displayed_coordinate(&self) -> Option<Coordinate> {
        self.displayed
    }

    pub fn live_updates_disabled(&self) -> bool {
        self.live_updates_disabled
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn store(&self) -> &LocationStore<S> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySlots;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    struct RecordingDisplay {
        region: Option<(Coordinate, f64)>,
        marker: Option<(Coordinate, String, String)>,
        readout: String,
        region_updates: usize,
    }

    impl MapDisplay for RecordingDisplay {
        fn set_visible_region(&mut self, center: Coordinate, span_meters: f64) {
            self.region = Some((center, span_meters));
            self.region_updates += 1;
        }

        fn set_single_marker(&mut self, coordinate: Coordinate, title: String, subtitle: String) {
            self.marker = Some((coordinate, title, subtitle));
        }

        fn set_readout_text(&mut self, text: String) {
            self.readout = text;
        }
    }

    #[derive(Debug, Default)]
    struct RecordingProvider {
        calls: RefCell<Vec<&'static str>>,
    }

    impl LocationProvider for RecordingProvider {
        fn request_authorization(&self) {
            self.calls.borrow_mut().push("authorize");
        }

        fn start_continuous_updates(&self) {
            self.calls.borrow_mut().push("start");
        }

        fn request_one_shot_location(&self) {
            self.calls.borrow_mut().push("one_shot");
        }
    }

    type TestController = OverrideController<RecordingDisplay, RecordingProvider, MemorySlots>;

    fn controller() -> TestController {
        OverrideController::new(
            RecordingDisplay::default(),
            RecordingProvider::default(),
            LocationStore::new(MemorySlots::new()),
            ControllerSettings::default(),
        )
    }

    #[test]
    fn start_shows_unset_readout_and_asks_for_permission() {
        let mut c = controller();
        c.start();
        assert_eq!(c.display().readout, UNSET_READOUT);
        assert_eq!(*c.provider().calls.borrow(), vec!["authorize"]);
    }

    #[test]
    fn virtual_location_updates_display_and_store() {
        let mut c = controller();
        let result = c.set_virtual_location(39.9042, 116.4074);
        let expected = Coordinate::new(39.9042, 116.4074);

        assert_eq!(result, VirtualLocationSet { coordinate: expected, saved: true });
        assert_eq!(c.display().region, Some((expected, 1000.0)));
        assert_eq!(
            c.display().marker,
            Some((
                expected,
                "虚拟位置".to_string(),
                "纬度: 39.9042, 经度: 116.4074".to_string()
            ))
        );
        assert_eq!(c.display().readout, "虚拟位置: 39.9042, 116.4074");
        assert_eq!(c.saved_locations(), vec![SavedLocation::new("虚拟位置", 39.9042, 116.4074)]);
        assert_eq!(c.state(), OverrideState { active: true, coordinate: Some(expected) });
    }

    #[test]
    fn live_updates_are_suppressed_while_override_active() {
        let mut c = controller();
        c.set_virtual_location(10.0, 20.0);
        let updates_before = c.display().region_updates;

        for i in 0..5 {
            assert!(!c.on_location_update(Coordinate::new(i as f64, i as f64)));
        }

        assert_eq!(c.displayed_coordinate(), Some(Coordinate::new(10.0, 20.0)));
        assert_eq!(c.display().region_updates, updates_before);
        assert_eq!(c.display().readout, "虚拟位置: 10.0, 20.0");
    }

    #[test]
    fn show_current_location_resumes_live_updates() {
        let mut c = controller();
        c.set_virtual_location(10.0, 20.0);
        c.show_current_location();

        assert_eq!(*c.provider().calls.borrow(), vec!["one_shot"]);
        // Nothing moves until a reading arrives
        assert_eq!(c.displayed_coordinate(), Some(Coordinate::new(10.0, 20.0)));
        // The stale override coordinate stays behind
        assert_eq!(c.state().coordinate, Some(Coordinate::new(10.0, 20.0)));
        assert!(!c.state().active);

        assert!(c.on_location_update(Coordinate::new(1.0, 2.0)));
        assert!(c.on_location_update(Coordinate::new(3.0, 4.0)));
        assert_eq!(c.displayed_coordinate(), Some(Coordinate::new(3.0, 4.0)));
        assert_eq!(c.display().readout, "当前位置: 3.0, 4.0");
    }

    #[test]
    fn each_live_update_refreshes_display_once() {
        let mut c = controller();
        c.on_location_update(Coordinate::new(1.0, 1.0));
        c.on_location_update(Coordinate::new(2.0, 2.0));
        assert_eq!(c.display().region_updates, 2);
    }

    #[test]
    fn second_default_name_save_is_not_persisted() {
        let mut c = controller();
        let first = c.set_virtual_location(1.0, 2.0);
        let second = c.set_virtual_location(3.0, 4.0);

        assert!(first.saved);
        assert!(!second.saved);
        assert_eq!(c.saved_locations(), vec![SavedLocation::new("虚拟位置", 1.0, 2.0)]);
        assert_eq!(c.displayed_coordinate(), Some(Coordinate::new(3.0, 4.0)));
    }

    #[test]
    fn malformed_input_changes_nothing() {
        let mut c = controller();
        assert!(c.set_virtual_location_from_input("abc", "116.4074").is_err());

        assert_eq!(c.state(), OverrideState::default());
        assert_eq!(c.displayed_coordinate(), None);
        assert!(c.saved_locations().is_empty());
        assert_eq!(c.display().region_updates, 0);
    }

    #[test]
    fn selecting_saved_location_reapplies_it() {
        let mut c = controller();
        c.set_virtual_location(1.0, 2.0);
        c.set_virtual_location(5.0, 6.0);

        let first = c.saved_locations()[0].clone();
        let result = c.select_saved_location(&first);
        assert_eq!(result, VirtualLocationSet { coordinate: Coordinate::new(1.0, 2.0), saved: false });
        assert_eq!(c.displayed_coordinate(), Some(Coordinate::new(1.0, 2.0)));
    }

    #[test]
    fn authorization_flow() {
        let mut c = controller();
        c.on_authorization_changed(AuthorizationStatus::NotDetermined);
        c.on_authorization_changed(AuthorizationStatus::Authorized);
        assert_eq!(*c.provider().calls.borrow(), vec!["authorize", "start"]);
    }

    #[test]
    fn denial_disables_live_updates_for_good() {
        let mut c = controller();
        c.on_authorization_changed(AuthorizationStatus::Denied);
        c.on_authorization_changed(AuthorizationStatus::Authorized);
        c.show_current_location();

        assert!(c.live_updates_disabled());
        assert!(c.provider().calls.borrow().is_empty());
        assert!(!c.on_location_update(Coordinate::new(1.0, 1.0)));
        assert_eq!(c.displayed_coordinate(), None);

        // Virtual locations still work
        c.set_virtual_location(7.0, 8.0);
        assert_eq!(c.displayed_coordinate(), Some(Coordinate::new(7.0, 8.0)));
    }

    #[test]
    fn handle_event_uses_last_reading_of_a_batch() {
        let mut c = controller();
        c.handle_event(LocationEvent::Updated(vec![
            Coordinate::new(1.0, 1.0),
            Coordinate::new(2.0, 2.0),
        ]));
        c.handle_event(LocationEvent::Updated(vec![]));
        c.handle_event(LocationEvent::Failed("timeout".to_string()));

        assert_eq!(c.displayed_coordinate(), Some(Coordinate::new(2.0, 2.0)));
        assert_eq!(c.display().region_updates, 1);
    }

    #[test]
    fn custom_settings_are_used() {
        let mut c = OverrideController::new(
            RecordingDisplay::default(),
            RecordingProvider::default(),
            LocationStore::new(MemorySlots::new()),
            ControllerSettings {
                span_meters: 250.0,
                default_name: "pin".to_string(),
            },
        );
        c.set_virtual_location(1.0, 2.0);
        assert_eq!(c.display().region, Some((Coordinate::new(1.0, 2.0), 250.0)));
        assert_eq!(c.saved_locations()[0].name, "pin");
    }
}
