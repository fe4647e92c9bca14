//! Process-wide test mode
//!
//! Test mode only changes defaults: towers created with
//! [`TowerConfig::default`](crate::TowerConfig::default) tick every
//! millisecond instead of every half second. Explicit configuration always
//! wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static TEST_MODE: AtomicBool = AtomicBool::new(false);

/// Forwarding tick used outside test mode
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Forwarding tick used in test mode
pub const TEST_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Enable or disable test mode
pub fn set_test_mode(enabled: bool) {
    TEST_MODE.store(enabled, Ordering::SeqCst);
}

/// Whether test mode is on
pub fn is_test_mode() -> bool {
    TEST_MODE.load(Ordering::SeqCst)
}

/// Tick interval for new default configurations
pub fn default_tick_interval() -> Duration {
    if is_test_mode() {
        TEST_TICK_INTERVAL
    } else {
        DEFAULT_TICK_INTERVAL
    }
}
