//! # Reporting Module / 报告模块
//!
//! Console summaries, HTML reports and JSON dumps of suite runs, with
//! internationalization support.
//!
//! 套件运行的控制台摘要、HTML 报告和 JSON 导出，支持国际化。

pub mod console;
pub mod html;
pub mod json;

// Re-export common reporting functions
pub use console::{print_failure_details, print_summary};
pub use html::generate_html_report;
pub use json::write_json_report;
