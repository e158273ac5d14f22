//! Synchronization pipeline: ports, journal poller and event router.

pub mod poller;
pub mod ports;
pub mod router;
