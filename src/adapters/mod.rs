//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter      | Implements      | Connects to                    |
//! |--------------|-----------------|--------------------------------|
//! | `log_sink`   | EventSink       | `log` facade                   |
//! | `loopback`   | Transport       | In-memory byte queues          |
//! | `sim_device` | (peer)          | Device side of any Transport   |
//! | `time`       | Clock           | `std::time::Instant` / manual  |

pub mod log_sink;
pub mod loopback;
pub mod sim_device;
pub mod time;
