mod client;
mod rpc;

pub use client::{TransmissionClient, SESSION_ID_HEADER};
