pub mod backup;
pub mod health;
