pub mod admin;
pub mod check;
pub mod history;
pub mod keys;
pub mod utils;
