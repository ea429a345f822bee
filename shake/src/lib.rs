pub mod cfg;
pub mod cipher;
pub mod cmd;
pub mod engine;
pub mod histogram;
pub mod logging;
pub mod report;
pub mod stat;
