pub mod staging;
pub mod storage;
pub mod transcoder;
