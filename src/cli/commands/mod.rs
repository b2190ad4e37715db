pub mod create;
pub mod inspect;
pub mod open;
pub mod passwd;
pub mod seal;
