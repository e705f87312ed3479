pub mod chroma;
pub mod handler;

pub use handler::create_matting_router;
