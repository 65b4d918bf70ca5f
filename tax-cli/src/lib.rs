pub mod app;
pub mod bulk_loader;
pub mod logging;
pub mod render;
