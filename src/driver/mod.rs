pub mod form_driver;
pub mod page;
pub mod recording;
pub mod selectors;
pub mod uploads;
