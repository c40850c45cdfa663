//! Pub/sub broker: channel and pattern registries with fan-out.
//!
//! A side table next to the transactional keyspace — publishing never
//! takes the instance lock. `DashMap` keeps subscribe/publish
//! lock-free across connection tasks; each registry entry owns a
//! `broadcast` channel that subscriber connections listen on.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use cinder_core::glob_match;
use dashmap::DashMap;
use tokio::sync::broadcast;

/// Buffered messages per subscription before a slow consumer starts
/// missing messages. Per channel, so one busy channel can't starve a
/// subscriber's other subscriptions.
const CHANNEL_CAPACITY: usize = 256;

/// A message delivered to a subscriber.
///
/// `channel` and `pattern` are `Arc<str>` so every receiver of one
/// publish shares a single allocation.
#[derive(Debug, Clone)]
pub struct PubMessage {
    /// The channel the message was published to.
    pub channel: Arc<str>,
    /// Raw payload.
    pub data: Bytes,
    /// For pattern subscriptions, the pattern that matched.
    pub pattern: Option<Arc<str>>,
}

/// Channel and pattern registries, shared by every connection.
#[derive(Debug, Default)]
pub struct PubSubBroker {
    channels: DashMap<String, broadcast::Sender<PubMessage>>,
    patterns: DashMap<String, broadcast::Sender<PubMessage>>,
    subscription_count: AtomicUsize,
}

impl PubSubBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to an exact channel.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<PubMessage> {
        self.register(&self.channels, channel)
    }

    /// Drops one subscription to an exact channel.
    pub fn unsubscribe(&self, channel: &str) {
        self.unregister(&self.channels, channel);
    }

    /// Subscribes to a glob pattern.
    pub fn psubscribe(&self, pattern: &str) -> broadcast::Receiver<PubMessage> {
        self.register(&self.patterns, pattern)
    }

    /// Drops one subscription to a pattern.
    pub fn punsubscribe(&self, pattern: &str) {
        self.unregister(&self.patterns, pattern);
    }

    fn register(
        &self,
        map: &DashMap<String, broadcast::Sender<PubMessage>>,
        key: &str,
    ) -> broadcast::Receiver<PubMessage> {
        let entry = map.entry(key.to_owned()).or_insert_with(|| {
            let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
            tx
        });
        self.subscription_count.fetch_add(1, Ordering::Relaxed);
        entry.subscribe()
    }

    fn unregister(&self, map: &DashMap<String, broadcast::Sender<PubMessage>>, key: &str) {
        if let Some(entry) = map.get(key) {
            self.subscription_count.fetch_sub(1, Ordering::Relaxed);
            // the caller drops its receiver; reap the channel once no
            // other receivers remain
            if entry.value().receiver_count() <= 1 {
                drop(entry);
                map.remove(key);
            }
        }
    }

    /// Publishes to a channel. Returns how many subscribers (exact +
    /// pattern) received the message.
    pub fn publish(&self, channel: &str, data: Bytes) -> usize {
        let mut delivered = 0;
        let channel_arc: Arc<str> = Arc::from(channel);

        if let Some(tx) = self.channels.get(channel) {
            let msg = PubMessage {
                channel: Arc::clone(&channel_arc),
                data: data.clone(),
                pattern: None,
            };
            delivered += tx.send(msg).unwrap_or(0);
        }

        for entry in self.patterns.iter() {
            if glob_match(entry.key(), channel) {
                let msg = PubMessage {
                    channel: Arc::clone(&channel_arc),
                    data: data.clone(),
                    pattern: Some(Arc::from(entry.key().as_str())),
                };
                delivered += entry.value().send(msg).unwrap_or(0);
            }
        }
        delivered
    }

    /// Active channel names, optionally filtered (PUBSUB CHANNELS).
    pub fn channel_names(&self, pattern: Option<&str>) -> Vec<String> {
        self.channels
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|name| pattern.map_or(true, |p| glob_match(p, name)))
            .collect()
    }

    /// (channel, subscriber count) pairs (PUBSUB NUMSUB).
    pub fn numsub(&self, channels: &[String]) -> Vec<(String, usize)> {
        channels
            .iter()
            .map(|ch| {
                let count = self
                    .channels
                    .get(ch)
                    .map(|tx| tx.receiver_count())
                    .unwrap_or(0);
                (ch.clone(), count)
            })
            .collect()
    }

    /// Number of distinct active patterns (PUBSUB NUMPAT).
    pub fn active_patterns(&self) -> usize {
        self.patterns.len()
    }

    /// Total active subscriptions across all connections.
    pub fn total_subscriptions(&self) -> usize {
        self.subscription_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_and_publish() {
        let broker = PubSubBroker::new();
        let mut rx = broker.subscribe("news");
        assert_eq!(broker.publish("news", Bytes::from("hi")), 1);

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.channel.as_ref(), "news");
        assert_eq!(msg.data, Bytes::from("hi"));
        assert!(msg.pattern.is_none());
    }

    #[test]
    fn publish_without_subscribers() {
        let broker = PubSubBroker::new();
        assert_eq!(broker.publish("void", Bytes::from("x")), 0);
    }

    #[test]
    fn pattern_delivery_carries_pattern() {
        let broker = PubSubBroker::new();
        let mut rx = broker.psubscribe("news.*");
        assert_eq!(broker.publish("news.sports", Bytes::from("goal")), 1);
        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.pattern.as_deref(), Some("news.*"));
        assert_eq!(msg.channel.as_ref(), "news.sports");

        assert_eq!(broker.publish("weather", Bytes::from("rain")), 0);
    }

    #[test]
    fn exact_and_pattern_both_count() {
        let broker = PubSubBroker::new();
        let _rx1 = broker.subscribe("news.sports");
        let _rx2 = broker.psubscribe("news.*");
        assert_eq!(broker.publish("news.sports", Bytes::from("x")), 2);
    }

    #[test]
    fn unsubscribe_reaps_channel() {
        let broker = PubSubBroker::new();
        let rx = broker.subscribe("ch");
        broker.unsubscribe("ch");
        drop(rx);
        assert_eq!(broker.publish("ch", Bytes::from("x")), 0);
        assert!(broker.channel_names(None).is_empty());
    }

    #[test]
    fn introspection_counts() {
        let broker = PubSubBroker::new();
        let _a = broker.subscribe("a");
        let _b = broker.subscribe("b");
        let _p = broker.psubscribe("c.*");
        assert_eq!(broker.total_subscriptions(), 3);
        assert_eq!(broker.channel_names(None).len(), 2);
        assert_eq!(broker.channel_names(Some("a")).len(), 1);
        assert_eq!(broker.active_patterns(), 1);
        assert_eq!(broker.numsub(&["a".into(), "ghost".into()]), vec![
            ("a".into(), 1),
            ("ghost".into(), 0)
        ]);
    }
}
