//! IR link: command constants, NEC-style framing, pulse capture and the
//! carrier-driven transmitter.

pub mod capture;
pub mod codec;
pub mod command;
pub mod learning;
pub mod timing;
pub mod transmitter;
