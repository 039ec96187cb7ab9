pub mod db;
pub mod tokens;
