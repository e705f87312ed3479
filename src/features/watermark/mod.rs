pub mod compositor;
pub mod handler;

pub use handler::create_watermark_router;
