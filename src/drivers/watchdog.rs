//! Task watchdog for the delivery loop.
//!
//! One loop pass blocks for at most one IR frame (~70 ms of carrier
//! timing) plus the loop interval, so a few seconds of TWDT timeout
//! leaves plenty of margin. Besides resetting the TWDT, [`LoopWatchdog`]
//! tracks the longest gap between feeds so the status log can show how
//! close the loop came to tripping it.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{ESP_OK, esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure, esp_task_wdt_reset};
use log::{info, warn};

pub const DEFAULT_TIMEOUT_MS: u32 = 5_000;

/// Feed gaps above this share of the timeout are logged.
const LATE_FEED_PERCENT: u32 = 50;

pub struct LoopWatchdog {
    timeout_ms: u32,
    subscribed: bool,
    last_feed_ms: Option<u32>,
    max_gap_ms: u32,
}

impl Default for LoopWatchdog {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS)
    }
}

impl LoopWatchdog {
    /// Reconfigure the TWDT and subscribe the calling task.
    pub fn new(timeout_ms: u32) -> Self {
        let subscribed = subscribe(timeout_ms);
        if subscribed {
            info!("Watchdog: delivery loop subscribed, {} ms timeout", timeout_ms);
        }
        Self {
            timeout_ms,
            subscribed,
            last_feed_ms: None,
            max_gap_ms: 0,
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Longest interval seen between two feeds.
    pub fn max_gap_ms(&self) -> u32 {
        self.max_gap_ms
    }

    /// Reset the TWDT and record the gap since the previous feed.
    pub fn feed(&mut self, now_ms: u32) {
        if let Some(last) = self.last_feed_ms {
            let gap = now_ms.wrapping_sub(last);
            if gap > self.max_gap_ms {
                self.max_gap_ms = gap;
                if gap > self.timeout_ms / 100 * LATE_FEED_PERCENT {
                    warn!("Watchdog: loop stalled {} ms of {} ms budget", gap, self.timeout_ms);
                }
            }
        }
        self.last_feed_ms = Some(now_ms);

        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                // SAFETY: resets the TWDT entry of the subscribed task.
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }
}

#[cfg(target_os = "espidf")]
fn subscribe(timeout_ms: u32) -> bool {
    // SAFETY: TWDT API calls from the main task during boot.
    unsafe {
        let cfg = esp_task_wdt_config_t {
            timeout_ms,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        let ret = esp_task_wdt_reconfigure(&cfg);
        if ret != ESP_OK {
            warn!("TWDT reconfigure returned {} (may already be configured)", ret);
        }
        let ret = esp_task_wdt_add(core::ptr::null_mut());
        if ret != ESP_OK {
            warn!("Watchdog: failed to subscribe ({})", ret);
        }
        ret == ESP_OK
    }
}

#[cfg(not(target_os = "espidf"))]
fn subscribe(timeout_ms: u32) -> bool {
    info!("Watchdog(sim): no-op ({} ms)", timeout_ms);
    false
}
