pub mod aircraft_subsystem;
pub mod cascade;
pub mod clock;
pub mod collaborators;
pub mod command;
pub mod company;
pub mod config;
pub mod context;
pub mod economy;
pub mod engine;
pub mod error;
pub mod event;
pub mod fleet;
pub mod mission;
pub mod mission_subsystem;
pub mod network;
pub mod rival_subsystem;
pub mod rng;
pub mod scheduler;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod world_events;
