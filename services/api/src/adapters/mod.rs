pub mod db;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod report_llm;

pub use db::DbAdapter;
#[cfg(feature = "pdf")]
pub use pdf::PdfReportRenderer;
pub use report_llm::OpenAiReportAdapter;
