//! # Cellular Network Service
//!
//! One [`NetworkServiceProvider`] per radio slot. It owns a worker thread
//! that serializes everything the slot handles:
//!
//! - registration requests from the state model,
//! - asynchronous completions from the [`RadioChannel`],
//! - unsolicited "network state changed" events,
//! - carrier config change events.
//!
//! Each request gets a fresh token. The completion carrying that token is
//! normalized and handed to the request's callback exactly once; completions
//! for tokens the worker does not know are dropped. Callbacks run on the
//! worker thread and must not block on the provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use tracing::{debug, info, warn};

use crate::config::CarrierConfigStore;
use crate::error::{NetRegError, RadioError, ResultCode};
use crate::family::RatFamilies;
use crate::normalize::normalize;
use crate::raw::RawRegistrationResult;
use crate::record::RegistrationRecord;
use crate::tech::Domain;

pub type RequestToken = u64;

// ─── Collaborator Interfaces ────────────────────────────────────────────────

/// Receives the outcome of registration requests and change notifications.
pub trait NetworkServiceCallback: Send + Sync {
    fn on_registration_info_complete(&self, result: Result<RegistrationRecord, ResultCode>);

    /// Registration changed without a request; query again to learn how.
    fn on_registration_info_changed(&self) {}
}

/// Asynchronous radio command channel for one slot.
pub trait RadioChannel: Send + Sync {
    fn get_voice_registration_state(&self, reply: Reply);
    fn get_data_registration_state(&self, reply: Reply);
    fn register_for_network_state_changed(&self, notifier: StateChangeNotifier);
    fn unregister_for_network_state_changed(&self, slot: usize);
}

/// Route back to the session for one outstanding radio request.
#[derive(Clone)]
pub struct Reply {
    slot: usize,
    token: RequestToken,
    tx: Sender<Command>,
}

impl Reply {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// Delivers the radio's answer. Returns `false` if the session is gone.
    pub fn send(&self, result: Result<RawRegistrationResult, RadioError>) -> bool {
        self.tx
            .send(Command::Completed {
                token: self.token,
                result,
            })
            .is_ok()
    }
}

/// Handle the radio channel uses to signal unsolicited registration changes.
#[derive(Clone)]
pub struct StateChangeNotifier {
    slot: usize,
    tx: Sender<Command>,
}

impl StateChangeNotifier {
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Returns `false` if the session is gone.
    pub fn notify(&self) -> bool {
        self.tx.send(Command::NetworkStateChanged).is_ok()
    }
}

// ─── Provider ───────────────────────────────────────────────────────────────

/// Control messages handled by the slot worker, in arrival order.
enum Command {
    Request {
        domain: Domain,
        callback: Arc<dyn NetworkServiceCallback>,
    },
    Completed {
        token: RequestToken,
        result: Result<RawRegistrationResult, RadioError>,
    },
    NetworkStateChanged,
    AddObserver(Arc<dyn NetworkServiceCallback>),
    RemoveObserver(Arc<dyn NetworkServiceCallback>),
    CarrierConfigChanged,
    Flush(Sender<()>),
    Shutdown,
}

/// Network registration service for one radio slot.
///
/// Dropping the provider closes it.
pub struct NetworkServiceProvider {
    slot: usize,
    tx: Sender<Command>,
    radio: Arc<dyn RadioChannel>,
    closed: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl NetworkServiceProvider {
    /// Starts the slot worker, loads the RAT families for `sub_id` and
    /// subscribes to network state changes.
    pub fn spawn(
        slot: usize,
        sub_id: i32,
        radio: Arc<dyn RadioChannel>,
        families: Arc<RatFamilies>,
        config_store: Arc<dyn CarrierConfigStore>,
    ) -> std::io::Result<Self> {
        let (tx, rx) = unbounded();
        let closed = Arc::new(AtomicBool::new(false));

        if let Err(e) = families.reload(config_store.as_ref(), sub_id) {
            warn!(slot, error = %e, "starting without RAT families");
        }

        let worker = SlotWorker {
            slot,
            sub_id,
            radio: radio.clone(),
            families,
            config_store,
            tx: tx.clone(),
            closed: closed.clone(),
            pending: HashMap::new(),
            observers: Vec::new(),
            next_token: 1,
        };
        let handle = thread::Builder::new()
            .name(format!("netreg-slot{slot}"))
            .spawn(move || worker.run(rx))?;

        radio.register_for_network_state_changed(StateChangeNotifier {
            slot,
            tx: tx.clone(),
        });
        info!(slot, sub_id, "cellular network service started");

        Ok(Self {
            slot,
            tx,
            radio,
            closed,
            handle: Some(handle),
        })
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Asks the radio for `domain`'s registration; `callback` receives the
    /// normalized record or [`ResultCode::Failed`].
    pub fn request_registration_info(
        &self,
        domain: Domain,
        callback: Arc<dyn NetworkServiceCallback>,
    ) -> Result<(), NetRegError> {
        self.send(Command::Request { domain, callback })
    }

    /// Like [`request_registration_info`](Self::request_registration_info)
    /// for a raw domain code. An unknown code is answered synchronously with
    /// [`ResultCode::InvalidArgument`] and no radio request is made.
    pub fn request_registration_info_code(
        &self,
        code: i32,
        callback: Arc<dyn NetworkServiceCallback>,
    ) -> Result<(), NetRegError> {
        match Domain::try_from(code) {
            Ok(domain) => self.request_registration_info(domain, callback),
            Err(e) => {
                warn!(slot = self.slot, code, "invalid registration domain");
                callback.on_registration_info_complete(Err(ResultCode::InvalidArgument));
                Err(e)
            }
        }
    }

    pub fn add_observer(
        &self,
        observer: Arc<dyn NetworkServiceCallback>,
    ) -> Result<(), NetRegError> {
        self.send(Command::AddObserver(observer))
    }

    pub fn remove_observer(
        &self,
        observer: Arc<dyn NetworkServiceCallback>,
    ) -> Result<(), NetRegError> {
        self.send(Command::RemoveObserver(observer))
    }

    /// Queues a RAT family reload from carrier config.
    pub fn notify_carrier_config_changed(&self) -> Result<(), NetRegError> {
        self.send(Command::CarrierConfigChanged)
    }

    /// Blocks until every message queued before this call has been handled.
    /// Must not be called from a callback.
    pub fn flush(&self) -> Result<(), NetRegError> {
        let (done_tx, done_rx) = bounded(1);
        self.send(Command::Flush(done_tx))?;
        done_rx
            .recv()
            .map_err(|_| NetRegError::SessionClosed(self.slot))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Unsubscribes from the radio, drops pending callbacks and stops the
    /// worker. Idempotent.
    pub fn close(&mut self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.radio.unregister_for_network_state_changed(self.slot);
        let _ = self.tx.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        info!(slot = self.slot, "cellular network service closed");
    }

    fn send(&self, command: Command) -> Result<(), NetRegError> {
        if self.is_closed() {
            return Err(NetRegError::SessionClosed(self.slot));
        }
        self.tx
            .send(command)
            .map_err(|_| NetRegError::SessionClosed(self.slot))
    }
}

impl Drop for NetworkServiceProvider {
    fn drop(&mut self) {
        self.close();
    }
}

// ─── Worker ─────────────────────────────────────────────────────────────────

struct PendingRequest {
    domain: Domain,
    callback: Arc<dyn NetworkServiceCallback>,
}

struct SlotWorker {
    slot: usize,
    sub_id: i32,
    radio: Arc<dyn RadioChannel>,
    families: Arc<RatFamilies>,
    config_store: Arc<dyn CarrierConfigStore>,
    tx: Sender<Command>,
    closed: Arc<AtomicBool>,
    pending: HashMap<RequestToken, PendingRequest>,
    observers: Vec<Arc<dyn NetworkServiceCallback>>,
    next_token: RequestToken,
}

impl SlotWorker {
    fn run(mut self, rx: Receiver<Command>) {
        while let Ok(command) = rx.recv() {
            // Anything still queued when close() ran is discarded.
            if self.closed.load(Ordering::Acquire) {
                break;
            }
            match command {
                Command::Request { domain, callback } => self.issue(domain, callback),
                Command::Completed { token, result } => self.complete(token, result),
                Command::NetworkStateChanged => {
                    debug!(
                        slot = self.slot,
                        observers = self.observers.len(),
                        "registration changed"
                    );
                    for observer in &self.observers {
                        observer.on_registration_info_changed();
                    }
                }
                Command::AddObserver(observer) => {
                    if !self.observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
                        self.observers.push(observer);
                    }
                }
                Command::RemoveObserver(observer) => {
                    self.observers.retain(|o| !Arc::ptr_eq(o, &observer));
                }
                Command::CarrierConfigChanged => {
                    match self.families.reload(self.config_store.as_ref(), self.sub_id) {
                        Ok(faults) if !faults.is_empty() => {
                            warn!(
                                slot = self.slot,
                                faults = faults.len(),
                                "RAT families partially loaded"
                            );
                        }
                        Ok(_) => debug!(slot = self.slot, "RAT families reloaded"),
                        Err(e) => warn!(slot = self.slot, error = %e, "RAT families cleared"),
                    }
                }
                Command::Flush(done) => {
                    let _ = done.send(());
                }
                Command::Shutdown => break,
            }
        }

        if !self.pending.is_empty() {
            debug!(slot = self.slot, dropped = self.pending.len(), "discarding pending requests");
        }
        self.pending.clear();
        self.observers.clear();
    }

    fn issue(&mut self, domain: Domain, callback: Arc<dyn NetworkServiceCallback>) {
        let token = self.next_token;
        self.next_token += 1;
        self.pending.insert(token, PendingRequest { domain, callback });

        let reply = Reply {
            slot: self.slot,
            token,
            tx: self.tx.clone(),
        };
        debug!(slot = self.slot, token, %domain, "requesting registration state");
        match domain {
            Domain::Cs => self.radio.get_voice_registration_state(reply),
            Domain::Ps => self.radio.get_data_registration_state(reply),
        }
    }

    fn complete(&mut self, token: RequestToken, result: Result<RawRegistrationResult, RadioError>) {
        let Some(PendingRequest { domain, callback }) = self.pending.remove(&token) else {
            debug!(slot = self.slot, token, "completion for unknown request ignored");
            return;
        };

        let outcome = match result {
            Ok(raw) => normalize(&raw, domain).map_err(|e| {
                warn!(slot = self.slot, token, error = %e, "registration normalization failed");
                ResultCode::Failed
            }),
            Err(e) => {
                warn!(slot = self.slot, token, %domain, error = %e, "registration request failed");
                Err(ResultCode::Failed)
            }
        };
        callback.on_registration_info_complete(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CarrierConfig, InMemoryConfigStore};
    use crate::raw::{DataRegStateV1_0, VoiceRegStateV1_0};
    use crate::tech::RadioTechnology;
    use std::sync::Mutex;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(2);

    /// Radio that parks replies until the test answers them.
    #[derive(Default)]
    struct ParkedRadio {
        replies: Mutex<Vec<(Domain, Reply)>>,
        notifier: Mutex<Option<StateChangeNotifier>>,
        unregistered: AtomicBool,
    }

    impl ParkedRadio {
        fn take(&self) -> Vec<(Domain, Reply)> {
            std::mem::take(&mut *self.replies.lock().unwrap())
        }
    }

    impl RadioChannel for ParkedRadio {
        fn get_voice_registration_state(&self, reply: Reply) {
            self.replies.lock().unwrap().push((Domain::Cs, reply));
        }
        fn get_data_registration_state(&self, reply: Reply) {
            self.replies.lock().unwrap().push((Domain::Ps, reply));
        }
        fn register_for_network_state_changed(&self, notifier: StateChangeNotifier) {
            *self.notifier.lock().unwrap() = Some(notifier);
        }
        fn unregister_for_network_state_changed(&self, _slot: usize) {
            self.unregistered.store(true, Ordering::SeqCst);
        }
    }

    struct Recorder {
        tx: Sender<Result<RegistrationRecord, ResultCode>>,
        changes: Sender<()>,
    }

    impl NetworkServiceCallback for Recorder {
        fn on_registration_info_complete(&self, result: Result<RegistrationRecord, ResultCode>) {
            let _ = self.tx.send(result);
        }
        fn on_registration_info_changed(&self) {
            let _ = self.changes.send(());
        }
    }

    fn recorder() -> (
        Arc<Recorder>,
        Receiver<Result<RegistrationRecord, ResultCode>>,
        Receiver<()>,
    ) {
        let (tx, rx) = unbounded();
        let (changes, changes_rx) = unbounded();
        (Arc::new(Recorder { tx, changes }), rx, changes_rx)
    }

    fn provider(radio: Arc<ParkedRadio>) -> NetworkServiceProvider {
        NetworkServiceProvider::spawn(
            0,
            1,
            radio,
            Arc::new(RatFamilies::new()),
            Arc::new(InMemoryConfigStore::new()),
        )
        .unwrap()
    }

    fn data_payload() -> RawRegistrationResult {
        RawRegistrationResult::DataV1_0(DataRegStateV1_0 {
            reg_state: 1,
            rat: RadioTechnology::Hspa.code() as i32,
            reason_data_denied: 0,
            max_data_calls: 4,
            cell_identity: None,
        })
    }

    #[test]
    fn completion_reaches_requesting_callback() {
        let radio = Arc::new(ParkedRadio::default());
        let service = provider(radio.clone());
        let (callback, results, _) = recorder();

        service.request_registration_info(Domain::Ps, callback).unwrap();
        service.flush().unwrap();

        let replies = radio.take();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].0, Domain::Ps);
        assert!(replies[0].1.send(Ok(data_payload())));

        let record = results.recv_timeout(WAIT).unwrap().unwrap();
        assert_eq!(record.domain(), Domain::Ps);
        assert_eq!(record.technology(), RadioTechnology::Hspa);
    }

    #[test]
    fn each_request_gets_its_own_token() {
        let radio = Arc::new(ParkedRadio::default());
        let service = provider(radio.clone());
        let (callback, _, _) = recorder();

        service.request_registration_info(Domain::Cs, callback.clone()).unwrap();
        service.request_registration_info(Domain::Ps, callback).unwrap();
        service.flush().unwrap();

        let replies = radio.take();
        assert_eq!(replies.len(), 2);
        assert_ne!(replies[0].1.token(), replies[1].1.token());
        assert_eq!(replies[0].0, Domain::Cs);
    }

    #[test]
    fn duplicate_completion_is_ignored() {
        let radio = Arc::new(ParkedRadio::default());
        let service = provider(radio.clone());
        let (callback, results, _) = recorder();

        service.request_registration_info(Domain::Ps, callback).unwrap();
        service.flush().unwrap();
        let (_, reply) = radio.take().remove(0);

        reply.send(Ok(data_payload()));
        reply.send(Err(RadioError("late".into())));
        service.flush().unwrap();

        assert!(results.recv_timeout(WAIT).unwrap().is_ok());
        assert!(results.try_recv().is_err(), "callback fires exactly once");
    }

    #[test]
    fn radio_error_and_wrong_shape_fail() {
        let radio = Arc::new(ParkedRadio::default());
        let service = provider(radio.clone());
        let (callback, results, _) = recorder();

        service.request_registration_info(Domain::Ps, callback.clone()).unwrap();
        service.request_registration_info(Domain::Ps, callback).unwrap();
        service.flush().unwrap();
        let replies = radio.take();

        replies[0].1.send(Err(RadioError("modem busy".into())));
        assert_eq!(results.recv_timeout(WAIT).unwrap(), Err(ResultCode::Failed));

        let voice = RawRegistrationResult::VoiceV1_0(VoiceRegStateV1_0 {
            reg_state: 1,
            rat: 3,
            css_supported: false,
            roaming_indicator: 0,
            system_is_in_prl: 0,
            default_roaming_indicator: 0,
            reason_for_denial: 0,
            cell_identity: None,
        });
        replies[1].1.send(Ok(voice));
        assert_eq!(results.recv_timeout(WAIT).unwrap(), Err(ResultCode::Failed));
    }

    #[test]
    fn invalid_domain_fails_synchronously() {
        let radio = Arc::new(ParkedRadio::default());
        let service = provider(radio.clone());
        let (callback, results, _) = recorder();

        let err = service.request_registration_info_code(7, callback).unwrap_err();
        assert!(matches!(err, NetRegError::InvalidArgument(7)));
        assert_eq!(results.try_recv().unwrap(), Err(ResultCode::InvalidArgument));

        service.flush().unwrap();
        assert!(radio.take().is_empty(), "no radio request issued");
    }

    #[test]
    fn state_change_reaches_every_observer() {
        let radio = Arc::new(ParkedRadio::default());
        let service = provider(radio.clone());
        let (first, _, first_changes) = recorder();
        let (second, _, second_changes) = recorder();

        service.add_observer(first.clone()).unwrap();
        service.add_observer(second.clone()).unwrap();
        service.add_observer(first.clone()).unwrap();

        let notifier = radio.notifier.lock().unwrap().clone().unwrap();
        assert!(notifier.notify());
        service.flush().unwrap();

        assert!(first_changes.try_recv().is_ok());
        assert!(first_changes.try_recv().is_err(), "observer registered once");
        assert!(second_changes.try_recv().is_ok());

        service.remove_observer(second).unwrap();
        notifier.notify();
        service.flush().unwrap();
        assert!(first_changes.try_recv().is_ok());
        assert!(second_changes.try_recv().is_err());
    }

    #[test]
    fn close_discards_pending_and_unsubscribes() {
        let radio = Arc::new(ParkedRadio::default());
        let mut service = provider(radio.clone());
        let (callback, results, _) = recorder();

        service.request_registration_info(Domain::Cs, callback.clone()).unwrap();
        service.flush().unwrap();
        let (_, reply) = radio.take().remove(0);

        service.close();
        assert!(service.is_closed());
        assert!(radio.unregistered.load(Ordering::SeqCst));

        assert!(!reply.send(Ok(data_payload())), "session no longer accepts replies");
        assert!(results.recv_timeout(Duration::from_millis(100)).is_err());
        assert!(matches!(
            service.request_registration_info(Domain::Cs, callback),
            Err(NetRegError::SessionClosed(0))
        ));

        service.close();
    }

    /// Callback that parks the worker until the test releases it.
    struct Gate {
        entered: Sender<()>,
        release: Receiver<()>,
    }

    impl NetworkServiceCallback for Gate {
        fn on_registration_info_complete(&self, _result: Result<RegistrationRecord, ResultCode>) {
            let _ = self.entered.send(());
            let _ = self.release.recv_timeout(WAIT);
        }
    }

    #[test]
    fn close_drops_completions_already_queued() {
        let radio = Arc::new(ParkedRadio::default());
        let mut service = provider(radio.clone());
        let (entered, entered_rx) = unbounded();
        let (release, release_rx) = unbounded();
        let gate = Arc::new(Gate {
            entered,
            release: release_rx,
        });
        let (callback, results, _) = recorder();

        service.request_registration_info(Domain::Ps, gate).unwrap();
        service.request_registration_info(Domain::Ps, callback).unwrap();
        service.flush().unwrap();
        let replies = radio.take();

        // First completion blocks the worker; the second queues behind it.
        assert!(replies[0].1.send(Ok(data_payload())));
        entered_rx.recv_timeout(WAIT).unwrap();
        assert!(replies[1].1.send(Ok(data_payload())));

        thread::scope(|scope| {
            let closer = scope.spawn(|| service.close());
            while !radio.unregistered.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
            release.send(()).unwrap();
            closer.join().unwrap();
        });

        assert!(results.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn config_change_rebuilds_families() {
        let radio = Arc::new(ParkedRadio::default());
        let families = Arc::new(RatFamilies::new());
        let store = Arc::new(InMemoryConfigStore::new());
        store.insert(1, CarrierConfig::with_rat_families(&["1,2"]));

        let service =
            NetworkServiceProvider::spawn(0, 1, radio, families.clone(), store.clone()).unwrap();
        assert!(families.load().same_family(RadioTechnology::Gprs, RadioTechnology::Edge));

        store.insert(1, CarrierConfig::with_rat_families(&["14,19"]));
        service.notify_carrier_config_changed().unwrap();
        service.flush().unwrap();

        let table = families.load();
        assert!(table.family_of(RadioTechnology::Gprs).is_none());
        assert!(table.same_family(RadioTechnology::Lte, RadioTechnology::LteCa));
    }
}
