// Domain layer: request/response models, tables and ports. No I/O here.

pub mod model;
pub mod ports;
pub mod request;
pub mod table;
