pub mod columns;
pub mod controller;
pub mod dataset;
pub mod domain;
pub mod filter;
pub mod format;
pub mod inputter;
pub mod loader;
pub mod model;
pub mod ui;
pub mod value;
