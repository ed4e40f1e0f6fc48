/// Messaging module
///
/// In-process fan-out of pipeline output to any number of consumers.
///
/// ## Architecture
///
/// ```text
/// ┌────────────────┐    Event     ┌─────────────┐
/// │ SentinelRunner │ ───────────> │  Event Bus  │
/// └────────────────┘              └─────────────┘
///                                        │
///                                        │ Publishes
///                                        ▼
///                                  ┌───────────┐
///                                  │ Consumers │
///                                  │  (stdout, │
///                                  │   etc.)   │
///                                  └───────────┘
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let event_bus = EventBus::new();
/// let rx = event_bus.subscribe();
///
/// while let Ok(event) = rx.recv() {
///     match event {
///         Event::Sentinel(e) => { /* alert */ }
///         Event::StreamFinished { .. } => break,
///         _ => {}
///     }
/// }
/// ```
pub mod bus;
pub mod events;

// Re-export commonly used types
pub use bus::EventBus;
pub use events::Event;
