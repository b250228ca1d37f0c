//! Live parameter plumbing across the real-time boundary
//!
//! Two complementary channels carry updates into a running transform: a
//! fire-and-forget message channel drained by the worker once per block
//! (for transforms that poll an inbound queue) and a directly writable
//! atomic parameter read once per block (for transforms that expose one).
//! Only one channel is observed by a given transform at any time; both are
//! idempotent to the final value. Because delivery is asynchronous relative
//! to the real-time context there is a bounded staleness window of at most
//! one block between a control call returning and the transform observing
//! the new value.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryIter};

/// A named effect parameter with a valid range.
///
/// Writes clamp to the range; out-of-range values are not errors.
#[derive(Debug, Clone)]
pub struct EffectParameter {
    name: &'static str,
    value: f32,
    range: RangeInclusive<f32>,
}

impl EffectParameter {
    pub fn new(name: &'static str, value: f32, range: RangeInclusive<f32>) -> Self {
        let mut param = Self {
            name,
            value: *range.start(),
            range,
        };
        param.set(value);
        param
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn set(&mut self, value: f32) {
        self.value = value.clamp(*self.range.start(), *self.range.end());
    }
}

/// Message shape delivered to a running transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParamMessage {
    #[serde(rename_all = "camelCase")]
    UpdateSuppressionLevel { level: f32 },
}

/// Control-side handle of the message channel.
///
/// Sends are fire-and-forget: the caller neither blocks on nor learns of
/// application, and a torn-down worker is not an error.
#[derive(Debug, Clone)]
pub struct ParameterSender {
    tx: Sender<ParamMessage>,
}

impl ParameterSender {
    pub fn send(&self, message: ParamMessage) {
        let _ = self.tx.send(message);
    }
}

/// Worker-side handle of the message channel, drained once per processed
/// block. The last message wins.
#[derive(Debug)]
pub struct ParameterReceiver {
    rx: Receiver<ParamMessage>,
}

impl ParameterReceiver {
    pub fn drain(&self) -> TryIter<'_, ParamMessage> {
        self.rx.try_iter()
    }
}

/// Open the message channel between control code and a running transform
pub fn parameter_channel() -> (ParameterSender, ParameterReceiver) {
    let (tx, rx) = mpsc::channel();
    (ParameterSender { tx }, ParameterReceiver { rx })
}

/// Directly writable live parameter, shared with the real-time worker as an
/// atomic f32
#[derive(Debug, Clone)]
pub struct LiveParam {
    bits: Arc<AtomicU32>,
}

impl LiveParam {
    pub fn new(value: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(value.to_bits())),
        }
    }

    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_clamps_on_write() {
        let mut param = EffectParameter::new("suppressionLevel", 0.5, 0.0..=1.0);
        param.set(1.5);
        assert_eq!(param.value(), 1.0);
        param.set(-0.3);
        assert_eq!(param.value(), 0.0);
    }

    #[test]
    fn parameter_clamps_at_construction() {
        let param = EffectParameter::new("suppressionLevel", 7.0, 0.0..=1.0);
        assert_eq!(param.value(), 1.0);
    }

    #[test]
    fn message_wire_shape() {
        let json = serde_json::to_string(&ParamMessage::UpdateSuppressionLevel { level: 0.5 }).unwrap();
        assert_eq!(json, "{\"kind\":\"updateSuppressionLevel\",\"level\":0.5}");

        let parsed: ParamMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ParamMessage::UpdateSuppressionLevel { level: 0.5 });
    }

    #[test]
    fn drain_yields_messages_in_order() {
        let (tx, rx) = parameter_channel();
        tx.send(ParamMessage::UpdateSuppressionLevel { level: 0.2 });
        tx.send(ParamMessage::UpdateSuppressionLevel { level: 0.9 });

        let drained: Vec<_> = rx.drain().collect();
        assert_eq!(
            drained,
            vec![
                ParamMessage::UpdateSuppressionLevel { level: 0.2 },
                ParamMessage::UpdateSuppressionLevel { level: 0.9 },
            ]
        );
        assert_eq!(rx.drain().count(), 0);
    }

    #[test]
    fn send_without_receiver_is_silent() {
        let (tx, rx) = parameter_channel();
        drop(rx);
        tx.send(ParamMessage::UpdateSuppressionLevel { level: 0.5 });
    }

    #[test]
    fn live_param_round_trip() {
        let param = LiveParam::new(0.5);
        let shared = param.clone();
        shared.set(0.75);
        assert_eq!(param.get(), 0.75);
    }
}
