// Library for tests to access modules

pub mod chart;
pub mod collector;
pub mod config;
pub mod models;
pub mod monitor_repo;
pub mod rollup_levels;
pub mod rollup_worker;
pub mod routes;
pub mod services;
pub mod version;
