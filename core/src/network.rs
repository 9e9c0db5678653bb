pub mod session;
pub mod transport;
