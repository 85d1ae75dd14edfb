//! # Architecture Port Layer
//!
//! Hardware abstraction boundary for the kernel. The Cortex-M4 port is
//! the real one; the host port is a set of signature-compatible no-ops
//! so the scheduler, queues, and primitives can be exercised by unit
//! tests on the build machine.

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m4;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use cortex_m4::{become_idle, configure_systick, pend_context_switch, set_exception_priorities};

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
mod host;
#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub use host::{become_idle, configure_systick, pend_context_switch, set_exception_priorities};
