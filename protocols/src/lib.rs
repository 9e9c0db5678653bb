//! Wire formats spoken by the probing core.
//!
//! Only ICMPv4 is implemented: Echo Request/Reply and the error messages
//! that quote an echo request back (Time Exceeded, Destination Unreachable).

pub mod icmp;
