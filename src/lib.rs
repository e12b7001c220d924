pub mod appsettings;
pub mod calendar;
pub mod credentials;
pub mod delivery;
pub mod models;
pub mod render;
pub mod service;
pub mod source;

#[cfg(test)]
mod test_utils;
