//! Bellwether node: leader election with an HTTP control surface.
//!
//! The protocol core lives in `bellwether-election`; this crate wires it to
//! a coordination backend, loads configuration, and exposes the thin
//! control surface (`GET /leader`, `POST /leader/watch`,
//! `POST /leader/lead`).

pub mod config;
pub mod handlers;
pub mod server;
