pub mod display;
pub mod surface;
