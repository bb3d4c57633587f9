pub mod alerts;
pub mod climate;
pub mod forecast;
pub mod kma;
pub mod poller;
pub mod scoring;
pub mod stations;
pub mod surface;
