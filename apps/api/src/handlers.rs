pub mod access;
pub mod health;
pub mod hierarchy;
pub mod security;
