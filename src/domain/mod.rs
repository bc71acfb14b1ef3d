// Domain layer: records, users and the ports the workflow talks through.

pub mod model;
pub mod ports;
pub mod user;
