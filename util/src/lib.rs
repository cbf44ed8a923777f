pub mod config;
pub mod fingerprint;
pub mod paths;
pub mod storage;
pub mod test_helpers;
