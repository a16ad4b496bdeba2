pub mod points;
pub mod rank;
pub mod register;
