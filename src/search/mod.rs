pub mod bitmap;
pub mod results;
pub mod executor;
