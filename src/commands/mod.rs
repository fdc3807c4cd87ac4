pub mod sample;
pub mod schema;
pub mod serialize;
pub mod validate;
