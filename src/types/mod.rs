pub mod series;
pub mod threshold;
pub mod unit;
