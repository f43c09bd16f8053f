pub mod access;
pub mod catalog;
pub mod embed;
pub mod gateway;
pub mod session;
pub mod watch;
