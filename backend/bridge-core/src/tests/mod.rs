mod config;
mod handler;
mod protocol;
mod validation;
