pub mod confirmation;
pub mod game;
pub mod messaging;
pub mod notification;
pub mod player;
pub mod session;
