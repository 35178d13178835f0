pub mod provisioning;
pub mod storage;
