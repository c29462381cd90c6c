use crate::config::PermissionSetting;
use crate::controller::LocationProvider;
use crate::location::{AuthorizationStatus, Coordinate, LocationEvent};
use crate::SharedStateFlag;
use std::cell::{Cell, RefCell};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Stand-in for a device location service on hosts without one.
///
/// Readings come from a fixed position (changeable at runtime) and are pushed
/// onto the update channel, continuously by a worker thread once updates are
/// started, or once per one-shot request.
pub struct SimulatedLocation {
    tx: Sender<LocationEvent>,
    run_state: SharedStateFlag, // Is the worker thread running?
    position: Arc<Mutex<Coordinate>>,
    permission: PermissionSetting,
    interval: Duration,
    asked: Cell<bool>,
    worker: RefCell<Option<JoinHandle<()>>>,
}

impl SimulatedLocation {
    /// Returns the provider and the receiving end of its update channel.
    pub fn new(
        position: Coordinate,
        permission: PermissionSetting,
        interval: Duration,
    ) -> (Self, Receiver<LocationEvent>) {
        let (tx, rx) = mpsc::channel();
        let provider = Self {
            tx,
            run_state: Arc::new((Mutex::new(false), Condvar::new())),
            position: Arc::new(Mutex::new(position)),
            permission,
            interval,
            asked: Cell::new(false),
            worker: RefCell::new(None),
        };
        (provider, rx)
    }

    pub fn position(&self) -> Coordinate {
        match self.position.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                log::error!("Position mutex poisoned!");
                **poisoned.get_ref()
            }
        }
    }

    /// Moves the simulated device. The next reading reports the new position.
    pub fn set_position(&self, coordinate: Coordinate) {
        if let Ok(mut guard) = self.position.lock() {
            *guard = coordinate;
        }
        log::debug!("Simulated position moved to {}", coordinate);
    }

    pub fn is_running(&self) -> bool {
        let (lock, _) = &*self.run_state;
        match lock.lock() {
            Ok(guard) => *guard,
            Err(_) => false, // Return false if the mutex is poisoned
        }
    }

    /// Signals the worker thread to stop and waits for it to exit.
    pub fn stop(&self) {
        {
            let (lock, cvar) = &*self.run_state;
            match lock.lock() {
                Ok(mut running) => *running = false,
                Err(_) => log::error!("Run state mutex poisoned during stop!"),
            }
            cvar.notify_all(); // Wake the worker if it is waiting
        }

        if let Some(handle) = self.worker.borrow_mut().take() {
            if handle.join().is_err() {
                log::error!("Location worker thread panicked.");
            } else {
                log::info!("Location worker stopped.");
            }
        }
    }

    fn send(&self, event: LocationEvent) {
        if self.tx.send(event).is_err() {
            log::warn!("Location update channel closed, dropping event.");
        }
    }

    fn reading(&self) -> LocationEvent {
        if self.permission == PermissionSetting::Denied {
            LocationEvent::Failed("location access denied".to_string())
        } else {
            LocationEvent::Updated(vec![self.position()])
        }
    }
}

impl LocationProvider for SimulatedLocation {
    fn request_authorization(&self) {
        let status = match self.permission {
            PermissionSetting::Granted => AuthorizationStatus::Authorized,
            PermissionSetting::Denied => AuthorizationStatus::Denied,
            PermissionSetting::Ask if !self.asked.get() => {
                self.asked.set(true);
                AuthorizationStatus::NotDetermined
            }
            PermissionSetting::Ask => AuthorizationStatus::Authorized,
        };
        log::debug!("Simulated authorization answers {}", status);
        self.send(LocationEvent::AuthorizationChanged(status));
    }

    fn start_continuous_updates(&self) {
        if self.permission == PermissionSetting::Denied {
            self.send(self.reading());
            return;
        }
        {
            let (lock, _) = &*self.run_state;
            let Ok(mut running) = lock.lock() else {
                log::error!("Run state mutex poisoned, not starting updates.");
                return;
            };
            if *running {
                log::debug!("Continuous updates already running.");
                return;
            }
            *running = true;
        }

        let worker = LocationWorker {
            run_state: self.run_state.clone(),
            position: self.position.clone(),
            tx: self.tx.clone(),
            interval: self.interval,
        };
        *self.worker.borrow_mut() = Some(thread::spawn(move || worker.run()));
        log::info!("Location worker started, interval {:?}.", self.interval);
    }

    fn request_one_shot_location(&self) {
        self.send(self.reading());
    }
}

impl Drop for SimulatedLocation {
    fn drop(&mut self) {
        self.stop();
    }
}

// Data moved into the worker thread
struct LocationWorker {
    run_state: SharedStateFlag,
    position: Arc<Mutex<Coordinate>>,
    tx: Sender<LocationEvent>,
    interval: Duration,
}

impl LocationWorker {
    fn run(self) {
        let (run_lock, run_cvar) = &*self.run_state;
        let Ok(mut running) = run_lock.lock() else {
            log::error!("Run state mutex poisoned in location worker!");
            return;
        };

        while *running {
            let reading = match self.position.lock() {
                Ok(guard) => *guard,
                Err(poisoned) => **poisoned.get_ref(),
            };
            if self.tx.send(LocationEvent::Updated(vec![reading])).is_err() {
                log::info!("Update channel closed, exiting location worker.");
                break;
            }

            running = match run_cvar.wait_timeout(running, self.interval) {
                Ok((guard, _)) => guard,
                Err(_) => {
                    log::error!("Run state mutex poisoned in location worker!");
                    return;
                }
            };
        }
        log::debug!("Location worker loop finished.");
    }
}
