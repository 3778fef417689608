pub mod cookies;
pub mod logs;
pub mod run;
pub mod selectors;
