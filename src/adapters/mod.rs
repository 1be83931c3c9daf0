//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter     | Implements     | Connects to                    |
//! |-------------|----------------|--------------------------------|
//! | `carrier`   | CarrierOutput  | LEDC IR carrier, busy-wait     |
//! | `event_log` | EventSink      | in-RAM ring, postcard export   |
//! | `hub`       | CommandSource  | hub / external controller link |
//! | `log_sink`  | EventSink      | serial log output              |
//! | `time`      | (none)         | ESP32 system timer             |
//!
//! The IR receiver side (`FrameSource`) lives next to the capture buffer
//! in `ir::capture::IrReceiver`.

pub mod carrier;
pub mod event_log;
pub mod hub;
pub mod log_sink;
pub mod time;
