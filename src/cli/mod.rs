pub mod allocate;
pub mod setup;
pub mod ui;
pub mod weights;
