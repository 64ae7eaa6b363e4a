//! ESP32 RMT receiver adapter.
//!
//! Implements [`CapturePeripheral`] and [`RingBuffer`] on top of the
//! ESP-IDF legacy RMT driver.  The driver's ISR copies finished pulse
//! trains into a FreeRTOS no-split ring buffer; this adapter hands the raw
//! item blocks to the capture core and returns them with
//! `vRingbufferReturnItem` when the core drops its claim.
//!
//! Only compiled for `target_os = "espidf"`; host tests drive the core
//! through synthetic ring buffers instead.

use core::ffi::c_void;
use core::ptr::{self, NonNull};
use core::time::Duration;

use esp_idf_svc::sys::*;
use log::{info, warn};

use crate::app::ports::{CapturePeripheral, RingBuffer};
use crate::config::{ChannelConfig, ChannelId, MAX_CHANNELS};
use crate::error::{ConfigError, ConfigFault, HardwareError, HardwareFault};

#[derive(Default, Clone, Copy)]
struct Slot {
    ring_buffer_bytes: Option<u32>,
    installed: bool,
    receiving: bool,
}

/// Owns the driver lifecycle of every RMT channel this firmware uses.
pub struct RmtPeripheral {
    slots: [Slot; MAX_CHANNELS],
}

impl Default for RmtPeripheral {
    fn default() -> Self {
        Self::new()
    }
}

impl RmtPeripheral {
    pub fn new() -> Self {
        Self {
            slots: [Slot::default(); MAX_CHANNELS],
        }
    }

    fn slot(&mut self, channel: ChannelId) -> Option<&mut Slot> {
        self.slots.get_mut(channel.0 as usize)
    }
}

impl CapturePeripheral for RmtPeripheral {
    type Buffer = RmtRingBuffer;

    fn configure(&mut self, config: &ChannelConfig) -> Result<(), ConfigError> {
        let id = config.channel;
        let Some(slot) = self.slot(id) else {
            return Err(ConfigError::new(id, ConfigFault::ChannelOutOfRange));
        };

        let cfg = rmt_config_t {
            rmt_mode: rmt_mode_t_RMT_MODE_RX,
            channel: id.0 as rmt_channel_t,
            gpio_num: config.gpio as gpio_num_t,
            clk_div: config.clock_divisor,
            mem_block_num: config.memory_blocks,
            flags: 0,
            __bindgen_anon_1: rmt_config_t__bindgen_ty_1 {
                rx_config: rmt_rx_config_t {
                    idle_threshold: config.idle_threshold_ticks,
                    filter_ticks_thresh: config.filter_threshold_ticks,
                    filter_en: config.filter_enabled,
                    ..Default::default()
                },
            },
        };
        // SAFETY: `cfg` is a fully initialised RX config that outlives the
        // call; rmt_config only reads it.
        let rc = unsafe { rmt_config(&cfg) };
        if rc != ESP_OK as esp_err_t {
            return Err(ConfigError::new(id, ConfigFault::Driver(rc)));
        }

        slot.ring_buffer_bytes = Some(config.ring_buffer_bytes);
        info!(
            "rmt: ch{} rx on GPIO {} (div={}, idle={} ticks, filter={})",
            id, config.gpio, config.clock_divisor, config.idle_threshold_ticks, config.filter_enabled
        );
        Ok(())
    }

    fn start(&mut self, channel: ChannelId) -> Result<(), HardwareError> {
        let fail = |fault| Err(HardwareError::new(channel, fault));
        let Some(slot) = self.slot(channel) else {
            return fail(HardwareFault::NotConfigured);
        };
        let Some(ring_bytes) = slot.ring_buffer_bytes else {
            return fail(HardwareFault::NotConfigured);
        };
        let ch = channel.0 as rmt_channel_t;

        if !slot.installed {
            // SAFETY: channel was configured above; no ISR flags requested.
            let rc = unsafe { rmt_driver_install(ch, ring_bytes as usize, 0) };
            if rc == ESP_ERR_INVALID_STATE as esp_err_t {
                return fail(HardwareFault::AlreadyInUse);
            }
            if rc != ESP_OK as esp_err_t {
                return fail(HardwareFault::InstallFailed(rc));
            }
            slot.installed = true;
        }

        // SAFETY: driver installed for `ch`; resetting the RX index is the
        // documented way to begin a fresh capture.
        let rc = unsafe { rmt_rx_start(ch, true) };
        if rc != ESP_OK as esp_err_t {
            return fail(HardwareFault::StartFailed(rc));
        }
        slot.receiving = true;
        Ok(())
    }

    fn stop(&mut self, channel: ChannelId) {
        let Some(slot) = self.slot(channel) else {
            return;
        };
        let ch = channel.0 as rmt_channel_t;

        if slot.receiving {
            // SAFETY: receiver was started on an installed driver.
            let rc = unsafe { rmt_rx_stop(ch) };
            if rc != ESP_OK as esp_err_t {
                warn!("rmt: ch{} rx_stop returned {}", channel, rc);
            }
            slot.receiving = false;
        }
        if slot.installed {
            // SAFETY: installed by `start`; every claim on its ring buffer
            // has been dropped before the orchestrator calls stop.
            let rc = unsafe { rmt_driver_uninstall(ch) };
            if rc != ESP_OK as esp_err_t {
                warn!("rmt: ch{} driver_uninstall returned {}", channel, rc);
            }
            slot.installed = false;
        }
    }

    fn ring_buffer(&mut self, channel: ChannelId) -> Result<RmtRingBuffer, HardwareError> {
        let mut handle: RingbufHandle_t = ptr::null_mut();
        // SAFETY: writes one handle through a valid out-pointer.
        let rc = unsafe { rmt_get_ringbuf_handle(channel.0 as rmt_channel_t, &mut handle) };
        if rc != ESP_OK as esp_err_t || handle.is_null() {
            return Err(HardwareError::new(channel, HardwareFault::NoRingBuffer));
        }
        Ok(RmtRingBuffer { channel, handle })
    }
}

// ───────────────────────────────────────────────────────────────
// Ring buffer
// ───────────────────────────────────────────────────────────────

/// Borrowed handle to one channel's driver ring buffer.
pub struct RmtRingBuffer {
    channel: ChannelId,
    handle: RingbufHandle_t,
}

/// A block of `rmt_item32_t` still owned by the ring buffer.
pub struct RmtRegion {
    ptr: NonNull<u8>,
    len: usize,
}

impl AsRef<[u8]> for RmtRegion {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: xRingbufferReceive returned `len` contiguous bytes at
        // `ptr`; they stay valid until vRingbufferReturnItem, which only
        // happens after the region is moved back into `release`.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl RingBuffer for RmtRingBuffer {
    type Region = RmtRegion;

    fn receive(&mut self, timeout: Duration) -> Result<Option<RmtRegion>, HardwareError> {
        if self.handle.is_null() {
            return Err(HardwareError::new(self.channel, HardwareFault::ReceiveFailed));
        }
        let mut len: usize = 0;
        // SAFETY: handle comes from rmt_get_ringbuf_handle for a running
        // channel; `len` is a valid out-pointer.
        let item = unsafe { xRingbufferReceive(self.handle, &mut len, ticks(timeout)) };
        Ok(NonNull::new(item.cast::<u8>()).map(|ptr| RmtRegion { ptr, len }))
    }

    fn release(&mut self, region: RmtRegion) {
        // SAFETY: `region` was produced by xRingbufferReceive on this
        // handle and is consumed here, so it cannot be returned twice.
        unsafe { vRingbufferReturnItem(self.handle, region.ptr.as_ptr().cast::<c_void>()) };
    }
}

/// FreeRTOS ticks for a timeout, rounded up so short waits never become 0.
fn ticks(timeout: Duration) -> TickType_t {
    let ms = timeout.as_millis() as u64;
    (ms * u64::from(configTICK_RATE_HZ)).div_ceil(1000) as TickType_t
}
