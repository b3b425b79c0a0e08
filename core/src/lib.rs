pub mod backup;
pub mod categories;
pub mod db;
pub mod models;
pub mod parse;
pub mod service;
pub mod share;
