pub mod authcode;
pub mod maintenance;
pub mod profile;
pub mod token;
