mod canvas;
mod config;
mod fonts;
mod rendering;
mod text;

pub use config::PDF;
