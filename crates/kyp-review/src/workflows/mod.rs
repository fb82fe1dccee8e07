pub mod catalog;
pub mod kyp;
