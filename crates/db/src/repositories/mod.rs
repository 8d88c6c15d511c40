pub mod confirmation;
pub mod delivery;
pub mod game;
pub mod integration;
pub mod notification;
pub mod player;
pub mod session;
