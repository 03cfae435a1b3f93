pub mod catalog;
pub mod entities;
pub mod orders;
pub mod provisioning;
