use std::{
    collections::{HashMap, hash_map::Entry},
    sync::{Arc, Mutex, MutexGuard},
};

use {
    freshet_common::FeedEvent,
    tracing::{debug, info, trace, warn},
};

use crate::{
    error::{Error, Result},
    listener::ListenerHandle,
    transport::ChannelCommands,
};

/// Registry of channel subscriptions.
///
/// A channel key exists exactly while at least one listener is registered for
/// it. The transport is told to join on the 0→1 transition and to leave on
/// the 1→0 transition, never per listener.
pub struct SubscriptionRegistry {
    commands: Arc<dyn ChannelCommands>,
    state: Mutex<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    channels: HashMap<String, Vec<ListenerHandle>>,
    closed: bool,
}

impl SubscriptionRegistry {
    pub fn new(commands: Arc<dyn ChannelCommands>) -> Self {
        Self {
            commands,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Register `listener` for `channel`, joining the channel if it had no
    /// listeners yet.
    pub fn listen(&self, channel: &str, listener: ListenerHandle) -> Result<()> {
        validate_channel(channel)?;
        let mut state = self.lock();
        if state.closed {
            return Err(Error::Closed);
        }

        match state.channels.entry(channel.to_owned()) {
            Entry::Occupied(mut entry) => {
                if entry.get().iter().any(|l| Arc::ptr_eq(l, &listener)) {
                    return Err(Error::already_subscribed(channel));
                }
                entry.get_mut().push(listener);
                debug!(
                    channel,
                    listeners = entry.get().len(),
                    "added listener to channel"
                );
            },
            Entry::Vacant(entry) => {
                info!(channel, "joining channel");
                self.commands.send_join(channel);
                entry.insert(vec![listener]);
            },
        }
        Ok(())
    }

    /// Remove `listener` from `channel`, leaving the channel when it was the
    /// last one.
    pub fn unlisten(&self, channel: &str, listener: &ListenerHandle) -> Result<()> {
        let mut state = self.lock();
        let Some(listeners) = state.channels.get_mut(channel) else {
            return Err(Error::not_subscribed(channel));
        };
        let Some(position) = listeners.iter().position(|l| Arc::ptr_eq(l, listener)) else {
            return Err(Error::listener_not_found(channel));
        };
        listeners.swap_remove(position);

        if listeners.is_empty() {
            state.channels.remove(channel);
            info!(channel, "leaving channel");
            self.commands.send_leave(channel);
        } else {
            debug!(
                channel,
                listeners = listeners.len(),
                "removed listener from channel"
            );
        }
        Ok(())
    }

    /// Deliver `event` to every listener of its channel.
    ///
    /// The listener set is snapshotted under the lock and invoked outside it.
    /// Events for channels without listeners, or arriving after
    /// [`close`](Self::close), are dropped. Returns the number of listeners
    /// the event was handed to.
    pub fn dispatch(&self, event: &FeedEvent) -> usize {
        let listeners = {
            let state = self.lock();
            if state.closed {
                return 0;
            }
            match state.channels.get(event.channel()) {
                Some(listeners) => listeners.clone(),
                None => {
                    trace!(channel = event.channel(), "no listeners, dropping event");
                    return 0;
                },
            }
        };

        for listener in &listeners {
            if let Err(e) = listener.on_event(event) {
                warn!(
                    channel = event.channel(),
                    listener = listener.name(),
                    error = %e,
                    "listener failed to handle event"
                );
            }
        }
        listeners.len()
    }

    /// Transport callback for one inbound channel line. Stamps the receipt
    /// time and dispatches. Lines without a channel or source are dropped.
    pub fn on_channel_message(&self, channel: &str, source: &str, text: &str) -> usize {
        if channel.is_empty() || source.is_empty() {
            debug!(channel, source, "dropping line without channel or source");
            return 0;
        }
        self.dispatch(&FeedEvent::now(channel, source, text))
    }

    /// Drop every subscription, leaving each channel, and refuse new ones.
    ///
    /// Returns the channels that were left.
    pub fn close(&self) -> Vec<String> {
        let mut state = self.lock();
        state.closed = true;
        let mut left: Vec<String> = state.channels.drain().map(|(channel, _)| channel).collect();
        left.sort_unstable();
        for channel in &left {
            info!(channel = %channel, "leaving channel on close");
            self.commands.send_leave(channel);
        }
        left
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Channels with at least one listener, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.lock().channels.keys().cloned().collect();
        channels.sort_unstable();
        channels
    }

    pub fn listener_count(&self, channel: &str) -> usize {
        self.lock().channels.get(channel).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Channel names must be non-empty and free of whitespace, commas and
/// control characters, which would corrupt the JOIN/PART command line.
fn validate_channel(channel: &str) -> Result<()> {
    let invalid = channel.is_empty()
        || channel
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == ',');
    if invalid {
        return Err(Error::invalid_channel(channel));
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread,
    };

    use rstest::rstest;

    use {super::*, crate::listener::FeedListener};

    #[derive(Default)]
    struct RecordingCommands {
        sent: Mutex<Vec<String>>,
    }

    impl RecordingCommands {
        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        fn count(&self, command: &str) -> usize {
            self.sent().iter().filter(|c| *c == command).count()
        }
    }

    impl ChannelCommands for RecordingCommands {
        fn send_join(&self, channel: &str) {
            self.sent.lock().unwrap().push(format!("JOIN {channel}"));
        }

        fn send_leave(&self, channel: &str) {
            self.sent.lock().unwrap().push(format!("PART {channel}"));
        }
    }

    #[derive(Default)]
    struct Collector {
        events: Mutex<Vec<FeedEvent>>,
    }

    impl Collector {
        fn events(&self) -> Vec<FeedEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl FeedListener for Collector {
        fn on_event(&self, event: &FeedEvent) -> Result<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Failing;

    impl FeedListener for Failing {
        fn on_event(&self, _event: &FeedEvent) -> Result<()> {
            Err(Error::external(
                "write row",
                std::io::Error::other("disk full"),
            ))
        }
    }

    fn setup() -> (Arc<RecordingCommands>, SubscriptionRegistry) {
        let commands = Arc::new(RecordingCommands::default());
        let registry = SubscriptionRegistry::new(Arc::clone(&commands) as Arc<dyn ChannelCommands>);
        (commands, registry)
    }

    fn event(channel: &str) -> FeedEvent {
        FeedEvent::new(42, channel, "rc-bot", "[[P]] [] https://x * u * (+1) s")
    }

    #[test]
    fn first_listener_joins_once() {
        let (commands, registry) = setup();
        let a: ListenerHandle = Arc::new(Collector::default());
        let b: ListenerHandle = Arc::new(Collector::default());

        registry.listen("#en.wikipedia", Arc::clone(&a)).unwrap();
        registry.listen("#en.wikipedia", Arc::clone(&b)).unwrap();

        assert_eq!(commands.sent(), vec!["JOIN #en.wikipedia"]);
        assert_eq!(registry.channels(), vec!["#en.wikipedia"]);
        assert_eq!(registry.listener_count("#en.wikipedia"), 2);
    }

    #[test]
    fn last_listener_leaves_once_and_drops_the_key() {
        let (commands, registry) = setup();
        let a: ListenerHandle = Arc::new(Collector::default());
        let b: ListenerHandle = Arc::new(Collector::default());
        registry.listen("#c", Arc::clone(&a)).unwrap();
        registry.listen("#c", Arc::clone(&b)).unwrap();

        registry.unlisten("#c", &a).unwrap();
        assert_eq!(commands.count("PART #c"), 0);
        assert_eq!(registry.channels(), vec!["#c"]);

        registry.unlisten("#c", &b).unwrap();
        assert_eq!(commands.sent(), vec!["JOIN #c", "PART #c"]);
        assert!(registry.channels().is_empty());
        assert_eq!(registry.listener_count("#c"), 0);
    }

    #[test]
    fn rejoin_after_leave_joins_again() {
        let (commands, registry) = setup();
        let a: ListenerHandle = Arc::new(Collector::default());
        registry.listen("#c", Arc::clone(&a)).unwrap();
        registry.unlisten("#c", &a).unwrap();
        registry.listen("#c", Arc::clone(&a)).unwrap();
        assert_eq!(commands.sent(), vec!["JOIN #c", "PART #c", "JOIN #c"]);
    }

    #[test]
    fn unlisten_unknown_channel_is_not_subscribed() {
        let (commands, registry) = setup();
        let a: ListenerHandle = Arc::new(Collector::default());
        let err = registry.unlisten("#nowhere", &a).unwrap_err();
        assert!(matches!(err, Error::NotSubscribed { ref channel } if channel == "#nowhere"));
        assert!(commands.sent().is_empty());
    }

    #[test]
    fn unlisten_foreign_listener_is_listener_not_found() {
        let (commands, registry) = setup();
        let a: ListenerHandle = Arc::new(Collector::default());
        let stranger: ListenerHandle = Arc::new(Collector::default());
        registry.listen("#c", Arc::clone(&a)).unwrap();

        let err = registry.unlisten("#c", &stranger).unwrap_err();
        assert!(matches!(err, Error::ListenerNotFound { .. }));
        assert_eq!(registry.listener_count("#c"), 1);
        assert_eq!(commands.sent(), vec!["JOIN #c"]);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let (commands, registry) = setup();
        let a: ListenerHandle = Arc::new(Collector::default());
        registry.listen("#c", Arc::clone(&a)).unwrap();
        let err = registry.listen("#c", Arc::clone(&a)).unwrap_err();
        assert!(matches!(err, Error::AlreadySubscribed { .. }));
        assert_eq!(registry.listener_count("#c"), 1);
        assert_eq!(commands.count("JOIN #c"), 1);
    }

    #[test]
    fn equal_values_are_distinct_listeners() {
        let (_, registry) = setup();
        registry.listen("#c", Arc::new(Collector::default())).unwrap();
        registry.listen("#c", Arc::new(Collector::default())).unwrap();
        assert_eq!(registry.listener_count("#c"), 2);
    }

    #[rstest]
    #[case("")]
    #[case("#two words")]
    #[case("#a,#b")]
    #[case("#bell\u{7}")]
    fn invalid_channel_names_are_rejected(#[case] channel: &str) {
        let (commands, registry) = setup();
        let err = registry.listen(channel, Arc::new(Collector::default())).unwrap_err();
        assert!(matches!(err, Error::InvalidChannel { .. }));
        assert!(commands.sent().is_empty());
    }

    #[test]
    fn dispatch_without_listeners_is_a_silent_drop() {
        let (_, registry) = setup();
        assert_eq!(registry.dispatch(&event("#quiet")), 0);
        assert_eq!(registry.on_channel_message("#quiet", "nick", "hello"), 0);
    }

    #[test]
    fn dispatch_reaches_every_listener_with_the_same_event() {
        let (_, registry) = setup();
        let collectors: Vec<Arc<Collector>> = (0..3).map(|_| Arc::new(Collector::default())).collect();
        for collector in &collectors {
            registry.listen("#c", Arc::clone(collector) as ListenerHandle).unwrap();
        }
        let other = Arc::new(Collector::default());
        registry.listen("#other", Arc::clone(&other) as ListenerHandle).unwrap();

        let sent = event("#c");
        assert_eq!(registry.dispatch(&sent), 3);
        for collector in &collectors {
            assert_eq!(collector.events(), vec![sent.clone()]);
        }
        assert!(other.events().is_empty());
    }

    #[test]
    fn failing_listener_does_not_block_others() {
        let (_, registry) = setup();
        let collector = Arc::new(Collector::default());
        registry.listen("#c", Arc::new(Failing)).unwrap();
        registry.listen("#c", Arc::clone(&collector) as ListenerHandle).unwrap();

        assert_eq!(registry.dispatch(&event("#c")), 2);
        assert_eq!(collector.events().len(), 1);
    }

    #[test]
    fn on_channel_message_builds_the_event() {
        let (_, registry) = setup();
        let collector = Arc::new(Collector::default());
        registry.listen("#c", Arc::clone(&collector) as ListenerHandle).unwrap();

        registry.on_channel_message("#c", "rc-bot", "text");
        let events = collector.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].channel(), "#c");
        assert_eq!(events[0].source(), "rc-bot");
        assert_eq!(events[0].raw_text(), "text");
        assert!(events[0].time() > 0);
    }

    #[test]
    fn lines_without_a_source_are_dropped() {
        let (_, registry) = setup();
        let collector = Arc::new(Collector::default());
        registry.listen("#c", Arc::clone(&collector) as ListenerHandle).unwrap();

        assert_eq!(registry.on_channel_message("#c", "", "text"), 0);
        assert!(collector.events().is_empty());
    }

    #[test]
    fn closure_listeners_are_supported() {
        let (_, registry) = setup();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        registry
            .listen(
                "#c",
                Arc::new(move |_: &FeedEvent| -> Result<()> {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .unwrap();
        registry.dispatch(&event("#c"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_may_change_subscriptions_during_delivery() {
        struct Subscriber {
            registry: Arc<SubscriptionRegistry>,
        }

        impl FeedListener for Subscriber {
            fn on_event(&self, _event: &FeedEvent) -> Result<()> {
                self.registry.listen("#spawned", Arc::new(Collector::default()))
            }
        }

        let commands = Arc::new(RecordingCommands::default());
        let registry = Arc::new(SubscriptionRegistry::new(
            Arc::clone(&commands) as Arc<dyn ChannelCommands>
        ));
        registry
            .listen(
                "#c",
                Arc::new(Subscriber {
                    registry: Arc::clone(&registry),
                }),
            )
            .unwrap();

        assert_eq!(registry.dispatch(&event("#c")), 1);
        assert_eq!(registry.channels(), vec!["#c", "#spawned"]);
    }

    #[test]
    fn close_leaves_everything_and_stops_delivery() {
        let (commands, registry) = setup();
        let collector = Arc::new(Collector::default());
        registry.listen("#b", Arc::clone(&collector) as ListenerHandle).unwrap();
        registry.listen("#a", Arc::new(Collector::default())).unwrap();

        assert_eq!(registry.close(), vec!["#a", "#b"]);
        assert!(registry.is_closed());
        assert!(registry.channels().is_empty());
        assert_eq!(commands.count("PART #a"), 1);
        assert_eq!(commands.count("PART #b"), 1);

        assert_eq!(registry.dispatch(&event("#b")), 0);
        assert!(collector.events().is_empty());
        assert!(matches!(
            registry.listen("#b", Arc::new(Collector::default())),
            Err(Error::Closed)
        ));
    }

    #[test]
    fn concurrent_churn_keeps_join_and_leave_balanced() {
        let (commands, registry) = setup();
        let registry = Arc::new(registry);

        thread::scope(|scope| {
            for _ in 0..4 {
                let registry = Arc::clone(&registry);
                scope.spawn(move || {
                    for _ in 0..200 {
                        let listener: ListenerHandle = Arc::new(Collector::default());
                        registry.listen("#churn", Arc::clone(&listener)).unwrap();
                        registry.dispatch(&event("#churn"));
                        registry.unlisten("#churn", &listener).unwrap();
                    }
                });
            }
        });

        let sent = commands.sent();
        assert!(registry.channels().is_empty());
        assert_eq!(commands.count("JOIN #churn"), commands.count("PART #churn"));
        // Commands alternate strictly: a second JOIN never precedes the PART.
        for pair in sent.chunks(2) {
            assert_eq!(pair, ["JOIN #churn", "PART #churn"]);
        }
    }
}
