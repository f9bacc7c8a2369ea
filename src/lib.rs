pub mod cli;
pub mod config;
pub mod consts;
pub mod faas_client;
pub mod function;
pub mod main_actions;
pub mod provider;
pub mod types;
