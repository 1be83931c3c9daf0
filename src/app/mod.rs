//! Application core: delivery logic with no direct I/O.
//!
//! The [`controller::DeliveryController`] arbitrates command sources and
//! drives acknowledged IR delivery; [`responder::AckResponder`] is the
//! heater end of the same link. Both talk to hardware only through the
//! port traits in [`ports`], so they run unchanged in host tests.

pub mod commands;
pub mod controller;
pub mod events;
pub mod ports;
pub mod responder;
