//! End-to-end scenarios over the in-process bus.

#[cfg(test)]
pub mod support;

mod dispatch_flows;
mod lifecycle;
mod registration;
