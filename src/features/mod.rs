//! 按功能域组织的端点模块，每个子模块提供自己的 Router。

pub mod compress;
pub mod health;
pub mod matting;
pub mod pdf;
pub mod session;
pub mod transform;
pub mod watermark;
