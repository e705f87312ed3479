pub mod builder;
pub mod handler;

pub use handler::create_pdf_router;
