//! End-to-end flows across services sharing one database and ephemeral store.

mod audit;
mod pairing;
mod payment;
mod registration;
mod subscription;
