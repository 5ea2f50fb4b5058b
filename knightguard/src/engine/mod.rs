pub mod bus;
pub mod channel;
pub mod commands;
pub mod correlator;
pub mod knight_engine;
pub mod member_list;
pub mod poller;
pub mod presence;
pub mod saved;
pub mod view_model;
