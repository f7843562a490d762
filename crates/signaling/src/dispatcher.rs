//! Message-Dispatcher – Fuehrt Peer-Befehle atomar aus
//!
//! Jede eingehende Nachricht wird in einen typisierten `PeerBefehl`
//! uebersetzt und unter dem Registry-Lock ausgefuehrt. Mutation und die
//! daraus folgenden Benachrichtigungen bilden so einen einzigen Schritt;
//! kein anderes Event sieht einen halb angewendeten Zustand.
//!
//! ## Reihenfolge beim Verbinden
//! Anmeldung beim Transport, Registry-Eintrag und Roster-Snapshot passieren
//! im selben kritischen Abschnitt. Damit gilt pro Peer: ein `new-buddy`,
//! der nach dem Snapshot erzeugt wurde, ist nicht schon im Roster enthalten,
//! und eine Ankuendigung vor dem Snapshot steht im Roster statt als
//! `new-buddy` zu kommen.

use barrio_core::types::{PeerId, SignalPayload};
use barrio_protocol::{BuddyRef, ClientEvent, PeerRecord, ServerEvent};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::broadcast::{EventBroadcaster, PeerTransport};
use crate::error::{SignalingError, SignalingResult};
use crate::presence;
use crate::router::{CallRouter, RelayErgebnis};
use crate::server_state::SignalingState;

// ---------------------------------------------------------------------------
// Befehle und Ergebnisse
// ---------------------------------------------------------------------------

/// Typisierter Befehl eines verbundenen Peers
#[derive(Debug, Clone, PartialEq)]
pub enum PeerBefehl {
    /// Nickname und eigenes Signal veroeffentlichen
    Ankuendigen {
        nickname: Option<String>,
        signal: Option<SignalPayload>,
    },
    /// Anruf an `ziel` anfragen
    AnrufAnfragen {
        anrufer: BuddyRef,
        anrufer_signal: Option<SignalPayload>,
        ziel: PeerId,
    },
    /// Anruf von `anrufer` annehmen
    AnrufAnnehmen {
        angerufener: BuddyRef,
        angerufener_signal: Option<SignalPayload>,
        anrufer: PeerId,
    },
}

impl From<ClientEvent> for PeerBefehl {
    fn from(event: ClientEvent) -> Self {
        match event {
            ClientEvent::Ready(req) => Self::Ankuendigen {
                nickname: req.nickname,
                signal: req.signal,
            },
            ClientEvent::CallBuddy(req) => Self::AnrufAnfragen {
                anrufer: req.caller,
                anrufer_signal: req.caller_signal,
                ziel: req.buddy_id,
            },
            ClientEvent::AcceptCall(req) => Self::AnrufAnnehmen {
                anrufer: req.buddy.id(),
                angerufener: req.callee,
                angerufener_signal: req.callee_signal,
            },
        }
    }
}

/// Ergebnis eines ausgefuehrten Befehls
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchErgebnis {
    /// Ankuendigung uebernommen und an `empfaenger` andere verteilt
    Angekuendigt { record: PeerRecord, empfaenger: usize },
    /// Anruf-Nachricht weitergeleitet (oder verworfen)
    Weitergeleitet(RelayErgebnis),
    /// Absender ist nicht mehr verbunden, nichts passiert
    Veraltet(PeerId),
}

// ---------------------------------------------------------------------------
// MessageDispatcher
// ---------------------------------------------------------------------------

/// Zentraler Dispatcher (einziger Schreiber der Registry)
///
/// Clone teilt den Zustand; jede Verbindung haelt ihre eigene Kopie.
pub struct MessageDispatcher<T: PeerTransport = EventBroadcaster> {
    state: Arc<SignalingState<T>>,
}

impl<T: PeerTransport> Clone for MessageDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: PeerTransport> MessageDispatcher<T> {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState<T>>) -> Self {
        Self { state }
    }

    /// Gibt den geteilten Zustand zurueck
    pub fn state(&self) -> &Arc<SignalingState<T>> {
        &self.state
    }

    /// Registriert eine neue Verbindung
    ///
    /// Legt den anonymen Eintrag an, meldet die Send-Queue beim Transport an
    /// und schickt dem neuen Peer Identitaet und Roster. Bei doppelter
    /// Identitaet bleibt der bestehende Zustand unveraendert.
    pub fn verbinden(
        &self,
        peer_id: PeerId,
        tx: mpsc::Sender<ServerEvent>,
    ) -> SignalingResult<PeerRecord> {
        let mut registry = self.state.registry.lock();

        if registry.anzahl() >= self.state.config.max_peers {
            tracing::warn!(
                peer = %peer_id,
                max = self.state.config.max_peers,
                "Server voll – Verbindung abgelehnt",
            );
            return Err(SignalingError::ServerVoll);
        }

        let record = match registry.verbinden(peer_id) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(
                    peer = %peer_id,
                    fehler = %e,
                    "Invariante verletzt – Verbindung abgelehnt",
                );
                return Err(e);
            }
        };

        self.state.transport.peer_anmelden(peer_id, tx);
        let roster = registry.andere_auflisten(&peer_id);
        presence::bei_verbindung(&self.state.transport, peer_id, roster);

        tracing::info!(peer = %peer_id, online = registry.anzahl(), "Peer verbunden");
        Ok(record)
    }

    /// Verarbeitet eine eingehende Nachricht eines Peers
    pub fn dispatch(&self, absender: PeerId, event: ClientEvent) -> DispatchErgebnis {
        tracing::trace!(peer = %absender, event = event.name(), "Nachricht empfangen");
        self.ausfuehren(absender, PeerBefehl::from(event))
    }

    /// Fuehrt einen typisierten Befehl atomar aus
    pub fn ausfuehren(&self, absender: PeerId, befehl: PeerBefehl) -> DispatchErgebnis {
        let mut registry = self.state.registry.lock();
        let transport = &self.state.transport;

        match befehl {
            PeerBefehl::Ankuendigen { nickname, signal } => {
                match registry.ankuendigen(&absender, nickname, signal) {
                    Ok(record) => {
                        tracing::info!(
                            peer = %absender,
                            nickname = record.nickname.as_deref().unwrap_or(""),
                            "Peer angekuendigt"
                        );
                        let empfaenger = presence::bei_ankuendigung(transport, record.clone());
                        DispatchErgebnis::Angekuendigt { record, empfaenger }
                    }
                    Err(e) if e.ist_veraltet() => {
                        tracing::debug!(
                            peer = %absender,
                            fehler = %e,
                            "Ankuendigung fuer getrennten Peer ignoriert",
                        );
                        DispatchErgebnis::Veraltet(absender)
                    }
                    Err(e) => {
                        tracing::warn!(
                            peer = %absender,
                            fehler = %e,
                            "Ankuendigung fehlgeschlagen",
                        );
                        DispatchErgebnis::Veraltet(absender)
                    }
                }
            }

            PeerBefehl::AnrufAnfragen {
                anrufer,
                anrufer_signal,
                ziel,
            } => {
                if !registry.ist_online(&absender) {
                    tracing::debug!(
                        peer = %absender,
                        "Anruf-Anfrage von getrenntem Peer ignoriert",
                    );
                    return DispatchErgebnis::Veraltet(absender);
                }
                DispatchErgebnis::Weitergeleitet(CallRouter::anruf_weiterleiten(
                    &registry,
                    transport,
                    anrufer,
                    anrufer_signal,
                    &ziel,
                ))
            }

            PeerBefehl::AnrufAnnehmen {
                angerufener,
                angerufener_signal,
                anrufer,
            } => {
                if !registry.ist_online(&absender) {
                    tracing::debug!(
                        peer = %absender,
                        "Anruf-Annahme von getrenntem Peer ignoriert",
                    );
                    return DispatchErgebnis::Veraltet(absender);
                }
                DispatchErgebnis::Weitergeleitet(CallRouter::annahme_weiterleiten(
                    &registry,
                    transport,
                    angerufener,
                    angerufener_signal,
                    &anrufer,
                ))
            }
        }
    }

    /// Bereinigt einen getrennten Peer
    ///
    /// Meldet die Send-Queue ab, entfernt den Eintrag und verteilt den
    /// letzten Stand an alle verbleibenden Peers. Ein zweiter Aufruf fuer
    /// dieselbe Identitaet ist ein No-Op ohne erneuten Broadcast.
    pub fn trennen(&self, peer_id: PeerId) -> Option<PeerRecord> {
        let mut registry = self.state.registry.lock();
        self.state.transport.peer_abmelden(&peer_id);

        match registry.trennen(&peer_id) {
            Some(letzter_stand) => {
                presence::bei_trennung(&self.state.transport, letzter_stand.clone());
                tracing::info!(peer = %peer_id, online = registry.anzahl(), "Peer getrennt");
                Some(letzter_stand)
            }
            None => {
                tracing::debug!(peer = %peer_id, "Trennung fuer unbekannten Peer ignoriert");
                None
            }
        }
    }

    /// Snapshot aller Peers ausser dem angegebenen
    pub fn andere_auflisten(&self, peer_id: &PeerId) -> Vec<PeerRecord> {
        self.state.registry.lock().andere_auflisten(peer_id)
    }

    /// Aktueller Stand eines Peers
    pub fn peer(&self, peer_id: &PeerId) -> Option<PeerRecord> {
        self.state.registry.lock().peer(peer_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::SEND_QUEUE_GROESSE;
    use crate::server_state::SignalingConfig;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::HashMap;

    // -----------------------------------------------------------------------
    // Aufzeichnender Transport (ohne Sockets)
    // -----------------------------------------------------------------------

    #[derive(Debug, Clone, PartialEq)]
    enum Ziel {
        Peer(PeerId),
        Alle,
        AlleAusser(PeerId),
    }

    #[derive(Default)]
    struct AufzeichnenderTransport {
        angemeldet: Mutex<Vec<PeerId>>,
        gesendet: Mutex<Vec<(Ziel, ServerEvent)>>,
    }

    impl AufzeichnenderTransport {
        fn gesendet(&self) -> Vec<(Ziel, ServerEvent)> {
            self.gesendet.lock().clone()
        }
    }

    impl PeerTransport for AufzeichnenderTransport {
        fn peer_anmelden(&self, peer_id: PeerId, _tx: mpsc::Sender<ServerEvent>) {
            self.angemeldet.lock().push(peer_id);
        }

        fn peer_abmelden(&self, peer_id: &PeerId) {
            self.angemeldet.lock().retain(|id| id != peer_id);
        }

        fn an_peer_senden(&self, peer_id: &PeerId, event: ServerEvent) -> bool {
            let bekannt = self.angemeldet.lock().contains(peer_id);
            if bekannt {
                self.gesendet.lock().push((Ziel::Peer(*peer_id), event));
            }
            bekannt
        }

        fn an_alle_senden(&self, event: ServerEvent) -> usize {
            self.gesendet.lock().push((Ziel::Alle, event));
            self.angemeldet.lock().len()
        }

        fn an_alle_ausser_senden(&self, ausgeschlossen: &PeerId, event: ServerEvent) -> usize {
            self.gesendet
                .lock()
                .push((Ziel::AlleAusser(*ausgeschlossen), event));
            self.angemeldet
                .lock()
                .iter()
                .filter(|id| *id != ausgeschlossen)
                .count()
        }
    }

    fn aufzeichnender_dispatcher() -> MessageDispatcher<AufzeichnenderTransport> {
        MessageDispatcher::neu(SignalingState::neu(
            SignalingConfig::default(),
            AufzeichnenderTransport::default(),
        ))
    }

    fn leere_queue() -> mpsc::Sender<ServerEvent> {
        mpsc::channel(1).0
    }

    fn signal(wert: &str) -> SignalPayload {
        SignalPayload::new(json!(wert))
    }

    // -----------------------------------------------------------------------
    // Echter Broadcaster mit Queues
    // -----------------------------------------------------------------------

    struct Peer {
        id: PeerId,
        rx: mpsc::Receiver<ServerEvent>,
    }

    impl Peer {
        fn alle_empfangen(&mut self) -> Vec<ServerEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                events.push(event);
            }
            events
        }
    }

    fn dispatcher() -> MessageDispatcher {
        MessageDispatcher::neu(SignalingState::neu(
            SignalingConfig::default(),
            EventBroadcaster::neu(),
        ))
    }

    fn verbinden(dispatcher: &MessageDispatcher) -> Peer {
        let id = PeerId::new();
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        dispatcher.verbinden(id, tx).unwrap();
        Peer { id, rx }
    }

    fn ankuendigen(dispatcher: &MessageDispatcher, peer: &Peer, nickname: &str, sig: &str) {
        dispatcher.ausfuehren(
            peer.id,
            PeerBefehl::Ankuendigen {
                nickname: Some(nickname.into()),
                signal: Some(signal(sig)),
            },
        );
    }

    // -----------------------------------------------------------------------
    // Szenarien
    // -----------------------------------------------------------------------

    #[test]
    fn erster_peer_bekommt_identitaet_und_leere_liste() {
        let dispatcher = dispatcher();
        let mut a = verbinden(&dispatcher);

        assert_eq!(
            a.alle_empfangen(),
            vec![
                ServerEvent::ClientIdGenerated { id: a.id },
                ServerEvent::BuddiesList { buddies: vec![] },
            ]
        );
    }

    #[test]
    fn zweiter_peer_sieht_anonymen_ersten() {
        let dispatcher = dispatcher();
        let mut a = verbinden(&dispatcher);
        let mut b = verbinden(&dispatcher);

        assert_eq!(
            b.alle_empfangen(),
            vec![
                ServerEvent::ClientIdGenerated { id: b.id },
                ServerEvent::BuddiesList {
                    buddies: vec![PeerRecord::neu(a.id)]
                },
            ]
        );
        // A erfaehrt erst durch Bs Ankuendigung von B
        assert_eq!(a.alle_empfangen().len(), 2);
    }

    #[test]
    fn ankuendigung_erreicht_andere() {
        let dispatcher = dispatcher();
        let mut a = verbinden(&dispatcher);
        let mut b = verbinden(&dispatcher);
        a.alle_empfangen();
        b.alle_empfangen();

        ankuendigen(&dispatcher, &a, "alice", "S");

        let erwartet = PeerRecord {
            id: a.id,
            nickname: Some("alice".into()),
            signal: Some(signal("S")),
        };
        assert_eq!(b.alle_empfangen(), vec![ServerEvent::NewBuddy { buddy: erwartet }]);
        assert!(a.alle_empfangen().is_empty(), "Keine Ankuendigung an sich selbst");
    }

    #[test]
    fn spaeter_peer_sieht_angekuendigten_im_roster() {
        let dispatcher = dispatcher();
        let a = verbinden(&dispatcher);
        ankuendigen(&dispatcher, &a, "alice", "S");

        let mut c = verbinden(&dispatcher);
        let events = c.alle_empfangen();
        assert_eq!(events.len(), 2, "Kein zusaetzliches new-buddy nach dem Roster");
        match &events[1] {
            ServerEvent::BuddiesList { buddies } => {
                assert_eq!(buddies.len(), 1);
                assert_eq!(buddies[0].nickname.as_deref(), Some("alice"));
            }
            anderes => panic!("BuddiesList erwartet, bekommen: {anderes:?}"),
        }
    }

    #[test]
    fn anruf_und_annahme_end_to_end() {
        let dispatcher = dispatcher();
        let mut a = verbinden(&dispatcher);
        let mut b = verbinden(&dispatcher);
        a.alle_empfangen();
        b.alle_empfangen();

        let anfrage: ClientEvent = serde_json::from_value(json!({
            "event": "client::call-buddy",
            "data": { "caller": a.id, "callerSignal": "P", "buddyId": b.id }
        }))
        .unwrap();
        assert_eq!(
            dispatcher.dispatch(a.id, anfrage),
            DispatchErgebnis::Weitergeleitet(RelayErgebnis::Zugestellt)
        );
        assert_eq!(
            b.alle_empfangen(),
            vec![ServerEvent::BuddyCalling {
                buddy: BuddyRef::Id(a.id),
                buddy_signal: Some(signal("P")),
            }]
        );

        let annahme: ClientEvent = serde_json::from_value(json!({
            "event": "client::accept-call",
            "data": { "callee": b.id, "buddy": { "id": a.id }, "calleeSignal": "Q" }
        }))
        .unwrap();
        assert_eq!(
            dispatcher.dispatch(b.id, annahme),
            DispatchErgebnis::Weitergeleitet(RelayErgebnis::Zugestellt)
        );
        assert_eq!(
            a.alle_empfangen(),
            vec![ServerEvent::CallAccepted {
                buddy: BuddyRef::Id(b.id),
                buddy_signal: Some(signal("Q")),
            }]
        );
    }

    #[test]
    fn anruf_an_getrennten_peer_still_verworfen() {
        let dispatcher = dispatcher();
        let mut a = verbinden(&dispatcher);
        let b = verbinden(&dispatcher);
        dispatcher.trennen(b.id);
        a.alle_empfangen();

        let ergebnis = dispatcher.ausfuehren(
            a.id,
            PeerBefehl::AnrufAnfragen {
                anrufer: BuddyRef::Id(a.id),
                anrufer_signal: Some(signal("P")),
                ziel: b.id,
            },
        );
        assert_eq!(ergebnis, DispatchErgebnis::Weitergeleitet(RelayErgebnis::ZielOffline));
        assert!(a.alle_empfangen().is_empty(), "Anrufer bekommt keine Fehlermeldung");
    }

    #[test]
    fn trennung_an_alle_verbleibenden() {
        let dispatcher = dispatcher();
        let mut a = verbinden(&dispatcher);
        let mut b = verbinden(&dispatcher);
        let mut c = verbinden(&dispatcher);
        ankuendigen(&dispatcher, &a, "alice", "S");
        for peer in [&mut a, &mut b, &mut c] {
            peer.alle_empfangen();
        }

        let letzter_stand = dispatcher.trennen(a.id).expect("A war verbunden");
        assert_eq!(letzter_stand.nickname.as_deref(), Some("alice"));

        for peer in [&mut b, &mut c] {
            assert_eq!(
                peer.alle_empfangen(),
                vec![ServerEvent::BuddyDisconnected {
                    buddy: letzter_stand.clone()
                }]
            );
        }
        assert!(a.alle_empfangen().is_empty(), "Gehender bekommt nichts mehr");
        assert!(dispatcher.andere_auflisten(&b.id).iter().all(|r| r.id != a.id));
        assert!(dispatcher.peer(&a.id).is_none());
    }

    // -----------------------------------------------------------------------
    // Absicht statt Schleife: welche Primitive wird benutzt?
    // -----------------------------------------------------------------------

    #[test]
    fn primitive_pro_uebergang() {
        let dispatcher = aufzeichnender_dispatcher();
        let a = PeerId::new();
        let b = PeerId::new();
        dispatcher.verbinden(a, leere_queue()).unwrap();
        dispatcher.verbinden(b, leere_queue()).unwrap();
        dispatcher.ausfuehren(
            a,
            PeerBefehl::Ankuendigen {
                nickname: Some("alice".into()),
                signal: None,
            },
        );
        dispatcher.trennen(a);

        let ziele: Vec<Ziel> = dispatcher
            .state()
            .transport
            .gesendet()
            .into_iter()
            .map(|(ziel, _)| ziel)
            .collect();
        assert_eq!(
            ziele,
            vec![
                Ziel::Peer(a),
                Ziel::Peer(a),
                Ziel::Peer(b),
                Ziel::Peer(b),
                Ziel::AlleAusser(a),
                Ziel::Alle,
            ]
        );
    }

    #[test]
    fn doppelte_trennung_ohne_zweiten_broadcast() {
        let dispatcher = aufzeichnender_dispatcher();
        let a = PeerId::new();
        dispatcher.verbinden(a, leere_queue()).unwrap();

        assert!(dispatcher.trennen(a).is_some());
        assert!(dispatcher.trennen(a).is_none());

        let abmeldungen = dispatcher
            .state()
            .transport
            .gesendet()
            .into_iter()
            .filter(|(_, event)| matches!(event, ServerEvent::BuddyDisconnected { .. }))
            .count();
        assert_eq!(abmeldungen, 1);
        assert_eq!(dispatcher.state().online_anzahl(), 0);
    }

    #[test]
    fn doppelte_identitaet_wird_abgelehnt() {
        let dispatcher = aufzeichnender_dispatcher();
        let a = PeerId::new();
        dispatcher.verbinden(a, leere_queue()).unwrap();
        let vorher = dispatcher.state().transport.gesendet().len();

        let err = dispatcher.verbinden(a, leere_queue()).unwrap_err();
        assert!(matches!(err, SignalingError::DoppelteIdentitaet(id) if id == a));
        assert_eq!(dispatcher.state().transport.gesendet().len(), vorher);
        assert_eq!(dispatcher.state().online_anzahl(), 1);
    }

    #[test]
    fn volles_relay_lehnt_ab() {
        let config = SignalingConfig {
            max_peers: 1,
            ..SignalingConfig::default()
        };
        let dispatcher =
            MessageDispatcher::neu(SignalingState::neu(config, AufzeichnenderTransport::default()));
        let a = PeerId::new();
        dispatcher.verbinden(a, leere_queue()).unwrap();

        let b = PeerId::new();
        let err = dispatcher.verbinden(b, leere_queue()).unwrap_err();
        assert!(matches!(err, SignalingError::ServerVoll));
        assert!(dispatcher.peer(&b).is_none());

        // Nach einer Trennung ist wieder Platz
        dispatcher.trennen(a);
        assert!(dispatcher.verbinden(b, leere_queue()).is_ok());
    }

    #[test]
    fn spaete_nachrichten_nach_trennung_sind_veraltet() {
        let dispatcher = aufzeichnender_dispatcher();
        let a = PeerId::new();
        let b = PeerId::new();
        dispatcher.verbinden(a, leere_queue()).unwrap();
        dispatcher.verbinden(b, leere_queue()).unwrap();
        dispatcher.trennen(a);
        let vorher = dispatcher.state().transport.gesendet().len();

        let ankuendigung = dispatcher.ausfuehren(
            a,
            PeerBefehl::Ankuendigen {
                nickname: Some("spaet".into()),
                signal: None,
            },
        );
        let anruf = dispatcher.ausfuehren(
            a,
            PeerBefehl::AnrufAnfragen {
                anrufer: BuddyRef::Id(a),
                anrufer_signal: None,
                ziel: b,
            },
        );
        let annahme = dispatcher.ausfuehren(
            a,
            PeerBefehl::AnrufAnnehmen {
                angerufener: BuddyRef::Id(a),
                angerufener_signal: None,
                anrufer: b,
            },
        );

        assert_eq!(ankuendigung, DispatchErgebnis::Veraltet(a));
        assert_eq!(anruf, DispatchErgebnis::Veraltet(a));
        assert_eq!(annahme, DispatchErgebnis::Veraltet(a));
        assert_eq!(dispatcher.state().transport.gesendet().len(), vorher);
        assert!(dispatcher.peer(&a).is_none());
    }

    #[test]
    fn client_event_wird_zu_befehl() {
        let a = PeerId::new();
        let b = PeerId::new();
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "client::accept-call",
            "data": { "callee": b, "buddy": { "id": a, "nickname": "alice" }, "calleeSignal": "Q" }
        }))
        .unwrap();

        assert_eq!(
            PeerBefehl::from(event),
            PeerBefehl::AnrufAnnehmen {
                angerufener: BuddyRef::Id(b),
                angerufener_signal: Some(signal("Q")),
                anrufer: a,
            }
        );
    }

    // -----------------------------------------------------------------------
    // Nebenlaeufigkeit
    // -----------------------------------------------------------------------

    /// Jeder Peer erfaehrt von jeder Ankuendigung genau einmal: entweder im
    /// Roster oder als `new-buddy`, nie beides und nie keins.
    #[test]
    fn roster_und_ankuendigung_schliessen_sich_aus() {
        let dispatcher = dispatcher();
        let anzahl = 16;

        let handles: Vec<_> = (0..anzahl)
            .map(|i| {
                let dispatcher = dispatcher.clone();
                std::thread::spawn(move || {
                    let id = PeerId::new();
                    let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE * 4);
                    dispatcher.verbinden(id, tx).unwrap();
                    dispatcher.ausfuehren(
                        id,
                        PeerBefehl::Ankuendigen {
                            nickname: Some(format!("peer{i}")),
                            signal: None,
                        },
                    );
                    Peer { id, rx }
                })
            })
            .collect();

        let mut peers: Vec<Peer> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ids: Vec<PeerId> = peers.iter().map(|p| p.id).collect();

        for peer in &mut peers {
            let mut gesehen: HashMap<PeerId, usize> = HashMap::new();
            for event in peer.alle_empfangen() {
                match event {
                    ServerEvent::BuddiesList { buddies } => {
                        for record in buddies.into_iter().filter(|r| r.ist_angekuendigt()) {
                            *gesehen.entry(record.id).or_default() += 1;
                        }
                    }
                    ServerEvent::NewBuddy { buddy } => {
                        *gesehen.entry(buddy.id).or_default() += 1;
                    }
                    _ => {}
                }
            }

            for andere in ids.iter().filter(|id| **id != peer.id) {
                assert_eq!(
                    gesehen.get(andere).copied().unwrap_or(0),
                    1,
                    "{} muss {} genau einmal angekuendigt sehen",
                    peer.id,
                    andere
                );
            }
            assert!(!gesehen.contains_key(&peer.id));
        }
    }

    #[test]
    fn gleichzeitige_trennungen_verlieren_nichts() {
        let dispatcher = dispatcher();
        let peers: Vec<Peer> = (0..32).map(|_| verbinden(&dispatcher)).collect();
        let ids: Vec<PeerId> = peers.iter().map(|p| p.id).collect();

        let handles: Vec<_> = ids
            .iter()
            .flat_map(|id| [*id, *id])
            .map(|id| {
                let dispatcher = dispatcher.clone();
                std::thread::spawn(move || dispatcher.trennen(id).is_some())
            })
            .collect();

        let erfolgreich = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(erfolgreich, ids.len(), "Jede Identitaet genau einmal entfernt");
        assert_eq!(dispatcher.state().online_anzahl(), 0);
    }
}
