//! ESP32 time adapter.
//!
//! Monotonic uptime for the delivery loop and the capture ISR, truncated
//! to `u32` (ms wraps after ~49 days, µs after ~71 minutes; every
//! consumer compares with wrapping arithmetic).
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()`.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` for host runs.

/// Time adapter for the ESP32 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot, full width.
    #[cfg(target_os = "espidf")]
    pub fn uptime_us_u64(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot, full width.
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us_u64(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Wrapping microsecond counter.
    pub fn now_us(&self) -> u32 {
        self.uptime_us_u64() as u32
    }

    /// Wrapping millisecond counter.
    pub fn now_ms(&self) -> u32 {
        (self.uptime_us_u64() / 1000) as u32
    }
}
