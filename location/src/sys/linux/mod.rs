//! Linux location implementation using GeoClue2 D-Bus service.
//!
//! A single GeoClue client is started on first use and kept running. Its
//! `LocationUpdated` signals feed both one-shot requests and continuous
//! updates; the client is recreated only after its session ends.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use log::{debug, info, warn};
use trackkit_permission::SystemAuthorization;
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};
use zbus::{Connection, MatchRule, MessageStream};

use crate::{
    AuthorizationLevel, AuthorizationProvider, AuthorizationStatus, Fix, LocationBackend,
    LocationDelegate, LocationError, LocationEvent, LocationResult,
};

const GEOCLUE: &str = "org.freedesktop.GeoClue2";
const MANAGER_PATH: &str = "/org/freedesktop/GeoClue2/Manager";
const MANAGER: &str = "org.freedesktop.GeoClue2.Manager";
const CLIENT: &str = "org.freedesktop.GeoClue2.Client";
const LOCATION: &str = "org.freedesktop.GeoClue2.Location";
const PROPERTIES: &str = "org.freedesktop.DBus.Properties";
const DESKTOP_ID: &str = "trackkit";
// GCLUE_ACCURACY_LEVEL_EXACT
const ACCURACY_LEVEL_EXACT: u32 = 8;
const MIN_RETRY_DELAY: Duration = Duration::from_secs(1);

/// State shared between the backend and its session thread.
#[derive(Default)]
struct Session {
    delegate: Mutex<Option<Arc<dyn LocationDelegate>>>,
    latest: Mutex<Option<Fix>>,
    running: AtomicBool,
    continuous: AtomicBool,
    pending: AtomicBool,
}

impl Session {
    fn delegate(&self) -> LocationResult<Arc<dyn LocationDelegate>> {
        self.delegate
            .lock()
            .expect("delegate mutex poisoned")
            .clone()
            .ok_or(LocationError::DelegateMissing)
    }

    fn latest(&self) -> Option<Fix> {
        self.latest.lock().expect("latest fix mutex poisoned").clone()
    }

    fn dispatch(&self, event: LocationEvent) {
        match self.delegate() {
            Ok(delegate) => delegate.on_event(event),
            Err(_) => debug!("no delegate registered; dropping {event:?}"),
        }
    }

    /// Records a fix and delivers it to a pending request or to continuous
    /// listeners.
    fn publish(&self, fix: Fix) {
        *self.latest.lock().expect("latest fix mutex poisoned") = Some(fix.clone());
        let requested = self.pending.swap(false, Ordering::SeqCst);
        if requested || self.continuous.load(Ordering::SeqCst) {
            self.dispatch(LocationEvent::Update { fix });
        }
    }

    fn fail(&self, error: LocationError) {
        let requested = self.pending.swap(false, Ordering::SeqCst);
        if requested || self.continuous.load(Ordering::SeqCst) {
            self.dispatch(LocationEvent::Failure { error });
        } else {
            debug!("GeoClue error with no listener: {error}");
        }
    }

    /// Marks the session as gone. Later requests start a new one.
    fn close(&self, error: LocationError) {
        *self.latest.lock().expect("latest fix mutex poisoned") = None;
        self.running.store(false, Ordering::SeqCst);
        self.fail(error);
    }
}

/// Backend reading positions from GeoClue2.
///
/// Fixes arrive through GeoClue's `LocationUpdated` signal on a dedicated
/// thread. `update_interval` is passed to GeoClue as the minimum time between
/// updates.
pub struct GeoClueBackend {
    session: Arc<Session>,
    update_interval: Duration,
}

impl fmt::Debug for GeoClueBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoClueBackend")
            .field("update_interval", &self.update_interval)
            .field("running", &self.session.running.load(Ordering::Relaxed))
            .field("continuous", &self.session.continuous.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl GeoClueBackend {
    /// Creates a backend. Nothing talks to D-Bus until the first request.
    #[must_use]
    pub fn new(update_interval: Duration) -> Self {
        Self {
            session: Arc::new(Session::default()),
            update_interval,
        }
    }

    fn ensure_session(&self) -> LocationResult<()> {
        if self.session.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let session = self.session.clone();
        let interval = self.update_interval;
        thread::Builder::new()
            .name("geoclue-session".to_string())
            .spawn(move || {
                loop {
                    let error = match futures::executor::block_on(watch(&session, interval)) {
                        Ok(()) => {
                            LocationError::Backend("GeoClue stopped sending updates".to_string())
                        }
                        Err(error) => error,
                    };
                    warn!("GeoClue session ended: {error}");
                    session.close(error);

                    // Continuous updates reconnect; one-shot sessions start on demand
                    if !session.continuous.load(Ordering::SeqCst) {
                        break;
                    }
                    thread::sleep(interval.max(MIN_RETRY_DELAY));
                    if session.running.swap(true, Ordering::SeqCst) {
                        break;
                    }
                }
            })
            .map(|_| ())
            .map_err(|e| {
                self.session.running.store(false, Ordering::SeqCst);
                LocationError::Backend(format!("failed to spawn GeoClue thread: {e}"))
            })
    }
}

impl AuthorizationProvider for GeoClueBackend {
    fn authorization_status(&self) -> AuthorizationStatus {
        SystemAuthorization.authorization_status()
    }

    fn request_authorization(&self, level: AuthorizationLevel) {
        SystemAuthorization.request_authorization(level);
    }
}

impl LocationBackend for GeoClueBackend {
    fn set_delegate(&self, delegate: Arc<dyn LocationDelegate>) {
        *self.session.delegate.lock().expect("delegate mutex poisoned") = Some(delegate);
    }

    fn request_location(&self) -> LocationResult<()> {
        let delegate = self.session.delegate()?;

        // A running client already holds GeoClue's current position
        if let Some(fix) = self.session.latest() {
            delegate.on_event(LocationEvent::Update { fix });
            return Ok(());
        }

        self.session.pending.store(true, Ordering::SeqCst);
        self.ensure_session().inspect_err(|_| {
            self.session.pending.store(false, Ordering::SeqCst);
        })
    }

    fn start_updates(&self) -> LocationResult<()> {
        self.session.delegate()?;
        self.session.continuous.store(true, Ordering::SeqCst);
        self.ensure_session()
    }
}

fn classify(context: &str, err: &zbus::Error) -> LocationError {
    if let zbus::Error::MethodError(name, _, _) = err {
        if name.as_str().ends_with("AccessDenied") {
            return LocationError::Denied;
        }
    }
    LocationError::Backend(format!("{context}: {err}"))
}

async fn get_property(
    connection: &Connection,
    path: &str,
    interface: &str,
    property: &str,
) -> zbus::Result<OwnedValue> {
    connection
        .call_method(Some(GEOCLUE), path, Some(PROPERTIES), "Get", &(interface, property))
        .await?
        .body()
        .deserialize()
}

async fn set_property(
    connection: &Connection,
    path: &str,
    property: &str,
    value: Value<'_>,
) -> zbus::Result<()> {
    connection
        .call_method(
            Some(GEOCLUE),
            path,
            Some(PROPERTIES),
            "Set",
            &(CLIENT, property, value),
        )
        .await?;
    Ok(())
}

async fn call_client(connection: &Connection, path: &str, method: &str) -> zbus::Result<()> {
    connection
        .call_method(Some(GEOCLUE), path, Some(CLIENT), method, &())
        .await?;
    Ok(())
}

async fn read_f64(connection: &Connection, path: &str, property: &str) -> zbus::Result<f64> {
    let value = get_property(connection, path, LOCATION, property).await?;
    Ok(f64::try_from(value)?)
}

async fn subscribe(connection: &Connection, client_path: &str) -> zbus::Result<MessageStream> {
    let rule = MatchRule::builder()
        .msg_type(zbus::message::Type::Signal)
        .interface(CLIENT)?
        .member("LocationUpdated")?
        .path(client_path)?
        .build();
    MessageStream::for_match_rule(rule, connection, None).await
}

/// Runs one GeoClue client until its signal stream ends or fails.
async fn watch(session: &Session, update_interval: Duration) -> LocationResult<()> {
    let connection = Connection::system()
        .await
        .map_err(|e| LocationError::Backend(format!("D-Bus connection failed: {e}")))?;

    let reply: (OwnedObjectPath,) = connection
        .call_method(Some(GEOCLUE), MANAGER_PATH, Some(MANAGER), "GetClient", &())
        .await
        .map_err(|e| match e {
            zbus::Error::MethodError(..) => classify("GeoClue2 refused a client", &e),
            _ => LocationError::NotAvailable,
        })?
        .body()
        .deserialize()
        .map_err(|e| classify("failed to parse GetClient reply", &e))?;
    let client = reply.0;
    let client_path = client.as_str();

    // DesktopId is required by GeoClue2 before Start
    set_property(&connection, client_path, "DesktopId", Value::from(DESKTOP_ID))
        .await
        .map_err(|e| classify("failed to set desktop ID", &e))?;
    set_property(
        &connection,
        client_path,
        "RequestedAccuracyLevel",
        Value::from(ACCURACY_LEVEL_EXACT),
    )
    .await
    .map_err(|e| classify("failed to set accuracy level", &e))?;
    let threshold = u32::try_from(update_interval.as_secs()).unwrap_or(u32::MAX);
    set_property(&connection, client_path, "TimeThreshold", Value::from(threshold))
        .await
        .map_err(|e| classify("failed to set time threshold", &e))?;

    // Subscribe before Start so the first update cannot be missed
    let mut updates = subscribe(&connection, client_path)
        .await
        .map_err(|e| classify("failed to subscribe to GeoClue updates", &e))?;

    call_client(&connection, client_path, "Start")
        .await
        .map_err(|e| classify("failed to start GeoClue client", &e))?;
    info!("GeoClue client started at {client_path}");

    // Only set once the locator has settled
    let current = get_property(&connection, client_path, CLIENT, "Location")
        .await
        .map_err(|e| classify("failed to get location", &e))?;
    let current = OwnedObjectPath::try_from(current)
        .map_err(|e| LocationError::Backend(format!("failed to parse location path: {e}")))?;
    if current.as_str() != "/" {
        deliver(session, &connection, current.as_str()).await;
    }

    while let Some(message) = updates.next().await {
        let message = message.map_err(|e| classify("GeoClue signal stream failed", &e))?;
        let (_, new): (OwnedObjectPath, OwnedObjectPath) = match message.body().deserialize() {
            Ok(paths) => paths,
            Err(err) => {
                warn!("ignoring malformed LocationUpdated signal: {err}");
                continue;
            }
        };
        deliver(session, &connection, new.as_str()).await;
    }

    if let Err(err) = call_client(&connection, client_path, "Stop").await {
        debug!("failed to stop GeoClue client: {err}");
    }
    Ok(())
}

async fn deliver(session: &Session, connection: &Connection, location_path: &str) {
    match read_fix(connection, location_path).await {
        Ok(fix) => session.publish(fix),
        Err(error) => session.fail(error),
    }
}

async fn read_fix(connection: &Connection, path: &str) -> LocationResult<Fix> {
    if path == "/" {
        return Err(LocationError::LocationUnknown);
    }

    let latitude = read_f64(connection, path, "Latitude")
        .await
        .map_err(|e| classify("failed to get latitude", &e))?;
    let longitude = read_f64(connection, path, "Longitude")
        .await
        .map_err(|e| classify("failed to get longitude", &e))?;
    let altitude = read_f64(connection, path, "Altitude").await.unwrap_or_else(|err| {
        warn!("GeoClue altitude unavailable: {err}");
        0.0
    });
    let horizontal_accuracy = read_f64(connection, path, "Accuracy").await.unwrap_or(-1.0);

    Ok(Fix {
        latitude,
        longitude,
        horizontal_accuracy,
        altitude,
        sampled_at: Utc::now(),
    })
}
