pub mod crosshair;
pub mod logging;
