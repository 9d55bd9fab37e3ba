pub mod disk;
pub mod inventory;
pub mod raid;
