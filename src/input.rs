//! Input façade. Key events come from a `KeyedInputSource`; the façade
//! keeps the set of held keys that scripts sample through `Input::*`.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::model::Vector2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    Down(String),
    Up(String),
}

/// External key source, polled once per frame.
pub trait KeyedInputSource {
    /// Events since the last poll, oldest first.
    fn poll(&mut self) -> Vec<KeyEvent>;
}

/// Thread-safe queue a window or terminal thread can push key events into.
#[derive(Debug, Clone, Default)]
pub struct SharedKeyQueue(Arc<Mutex<Vec<KeyEvent>>>);

impl SharedKeyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: KeyEvent) {
        self.0.lock().push(event);
    }

    pub fn key_down(&self, key: &str) {
        self.push(KeyEvent::Down(key.to_string()));
    }

    pub fn key_up(&self, key: &str) {
        self.push(KeyEvent::Up(key.to_string()));
    }
}

impl KeyedInputSource for SharedKeyQueue {
    fn poll(&mut self) -> Vec<KeyEvent> {
        std::mem::take(&mut *self.0.lock())
    }
}

#[derive(Default)]
pub struct Input {
    held: HashSet<String>,
    source: Option<Box<dyn KeyedInputSource>>,
}

impl Input {
    pub fn new(source: Option<Box<dyn KeyedInputSource>>) -> Self {
        Self {
            held: HashSet::new(),
            source,
        }
    }

    /// Drain the source and update the held set. Call once per frame.
    pub fn poll(&mut self) {
        let Some(source) = self.source.as_mut() else {
            return;
        };
        for event in source.poll() {
            self.apply(event);
        }
    }

    pub fn apply(&mut self, event: KeyEvent) {
        match event {
            KeyEvent::Down(key) => {
                self.held.insert(key);
            }
            KeyEvent::Up(key) => {
                self.held.remove(&key);
            }
        }
    }

    pub fn is_down(&self, key: &str) -> bool {
        self.held.contains(key)
    }

    /// Direction from four keys, normalized. Up is negative y (screen space).
    pub fn get_vector(&self, left: &str, right: &str, up: &str, down: &str) -> Vector2 {
        let axis = |neg: &str, pos: &str| {
            f64::from(u8::from(self.is_down(pos))) - f64::from(u8::from(self.is_down(neg)))
        };
        Vector2::new(axis(left, right), axis(up, down)).normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(keys: &[&str]) -> Input {
        let mut input = Input::default();
        for k in keys {
            input.apply(KeyEvent::Down((*k).to_string()));
        }
        input
    }

    #[test]
    fn opposite_keys_cancel() {
        let v = held(&["a", "d"]).get_vector("a", "d", "w", "s");
        assert_eq!(v, Vector2::ZERO);
    }

    #[test]
    fn up_alone_is_unit_up() {
        let v = held(&["w"]).get_vector("a", "d", "w", "s");
        assert_eq!(v, Vector2::new(0.0, -1.0));
    }

    #[test]
    fn diagonal_is_normalized() {
        let v = held(&["d", "s"]).get_vector("a", "d", "w", "s");
        assert!((v.length() - 1.0).abs() < 1e-12);
        assert!((v.x - v.y).abs() < 1e-12);
    }

    #[test]
    fn queue_feeds_held_set() {
        let queue = SharedKeyQueue::new();
        let mut input = Input::new(Some(Box::new(queue.clone())));
        queue.key_down("ArrowLeft");
        input.poll();
        assert!(input.is_down("ArrowLeft"));
        queue.key_up("ArrowLeft");
        input.poll();
        assert!(!input.is_down("ArrowLeft"));
    }

    #[test]
    fn queue_accepts_events_from_another_thread() {
        let queue = SharedKeyQueue::new();
        let remote = queue.clone();
        std::thread::spawn(move || remote.key_down("x")).join().ok();
        let mut input = Input::new(Some(Box::new(queue)));
        input.poll();
        assert!(input.is_down("x"));
    }
}
