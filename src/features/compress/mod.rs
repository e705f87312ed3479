pub mod handler;

pub use handler::create_compress_router;
