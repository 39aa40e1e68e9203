// Contracts Module - settlement contract bindings

pub mod betting_pool;

pub use betting_pool::{
    game_status_name, result_name, BettingPool, BettingPoolEvents, GameCreatedFilter,
    GameResultSetFilter,
};
