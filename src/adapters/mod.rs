//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements                          | Connects to                  |
//! |-------------|-------------------------------------|------------------------------|
//! | `cdev`      | LinePort                            | Linux GPIO character device  |
//! | `sim`       | LinePort                            | In-memory line levels        |
//! | `http`      | ReachabilityProbe, DeviceRegistry   | Blocking HTTP client         |
//! | `log_sink`  | TelemetrySink                       | Log output                   |
//! | `time`      | Clock                               | Monotonic clock + timers     |
//! | `thread`    | —                                   | Named OS worker threads      |

#[cfg(feature = "cdev")]
pub mod cdev;
pub mod http;
pub mod log_sink;
pub mod sim;
pub mod thread;
pub mod time;
