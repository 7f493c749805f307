pub mod catalog;
pub mod ranking;
pub mod recommendations;
pub mod similarity;
