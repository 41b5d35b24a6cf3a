pub mod auth;
pub mod db;
pub mod password;
pub mod random_user;
pub mod user_repository;
