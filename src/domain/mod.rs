// Domain layer - pure data and logic, no I/O
pub mod reading;
pub mod rotation;
pub mod view;
