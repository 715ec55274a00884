pub mod calendar;
pub mod sun;
